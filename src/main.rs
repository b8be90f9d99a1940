use std::process::ExitCode;

fn main() -> ExitCode {
    // `.env` may carry RUST_LOG and SPIRO_* table overrides.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match spiro_ref::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
