use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spiro_ref::app::pipeline::{self, Selection};
use spiro_ref::domain::{KnudsonObservations, Reference, TableSources};
use spiro_ref::io::ingest::load_subjects;
use spiro_ref::{Knudson, KnudsonMeasure, MeasureSpec, Observed, Wang, WangMeasure};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * b.abs().max(1.0)
}

#[test]
fn knudson_fev_matches_each_stratum_closed_form() {
    let k = Knudson::builtin().unwrap();
    // (sex code, age, height cm, expected FEV1)
    let cases: [(i64, f64, f64, f64); 6] = [
        (1, 9.0, 135.0, -2.8142 + 0.0348 * 135.0),
        (1, 17.5, 172.0, -6.1181 + 0.0519 * 172.0 + 0.0636 * 17.5),
        (1, 48.0, 180.0, -6.5147 + 0.0665 * 180.0 - 0.0292 * 48.0),
        (2, 8.0, 128.0, -2.7578 + 0.0336 * 128.0),
        (2, 15.0, 160.0, -3.7622 + 0.0351 * 160.0 + 0.0694 * 15.0),
        (2, 35.0, 165.0, -1.8210 + 0.0332 * 165.0 - 0.0190 * 35.0),
    ];

    for (sex, age, height, expected) in cases {
        let got = k
            .predicted(&[Some(sex)], &[Some(age)], &[Some(height)], &MeasureSpec::Scalar(KnudsonMeasure::Fev))
            .unwrap();
        assert!(close(got[0].unwrap(), expected), "sex {sex} age {age}: {got:?} vs {expected}");
    }
}

#[test]
fn knudson_band_edges_switch_rows() {
    let k = Knudson::builtin().unwrap();
    let fev = MeasureSpec::Scalar(KnudsonMeasure::Fev);
    let got = k
        .predicted(
            &[Some(1), Some(1), Some(2), Some(2)],
            &[Some(11.99), Some(12.0), Some(10.99), Some(11.0)],
            &[Some(150.0); 4],
            &fev,
        )
        .unwrap();
    assert!(close(got[0].unwrap(), -2.8142 + 0.0348 * 150.0));
    assert!(close(got[1].unwrap(), -6.1181 + 0.0519 * 150.0 + 0.0636 * 12.0));
    assert!(close(got[2].unwrap(), -2.7578 + 0.0336 * 150.0));
    assert!(close(got[3].unwrap(), -3.7622 + 0.0351 * 150.0 + 0.0694 * 11.0));
}

#[test]
fn knudson_male_child_fev_literal() {
    let k = Knudson::builtin().unwrap();
    let got = k
        .predicted(&[Some(1)], &[Some(10.0)], &[Some(140.0)], &MeasureSpec::Scalar(KnudsonMeasure::Fev))
        .unwrap();
    assert!(close(got[0].unwrap(), -2.8142 + 0.0348 * 140.0));
}

#[test]
fn pct_is_observed_over_predicted_for_random_subjects() {
    let mut rng = StdRng::seed_from_u64(1983);
    let n = 500;

    let sex: Vec<Option<i64>> = (0..n).map(|_| Some(rng.gen_range(1..=2))).collect();
    let age: Vec<Option<f64>> = (0..n).map(|_| Some(rng.gen_range(6.0..80.0))).collect();
    let height: Vec<Option<f64>> = (0..n).map(|_| Some(rng.gen_range(110.0..200.0))).collect();
    let fvc: Vec<Option<f64>> = (0..n).map(|_| Some(rng.gen_range(1.0..6.0))).collect();

    let k = Knudson::builtin().unwrap();
    let out = k
        .pct_predicted(&sex, &age, &height, &Observed::new(KnudsonMeasure::Fvc, fvc.clone()))
        .unwrap();
    let predicted = k
        .predicted(&sex, &age, &height, &MeasureSpec::Scalar(KnudsonMeasure::Fvc))
        .unwrap();

    assert_eq!(out.predicted, predicted);
    assert!(out.warnings.is_empty());
    for i in 0..n {
        match (fvc[i], predicted[i], out.pct[i]) {
            (Some(obs), Some(pred), Some(pct)) => assert!(close(pct, obs / pred * 100.0)),
            (_, None, pct) => assert_eq!(pct, None),
            other => panic!("unexpected slot {i}: {other:?}"),
        }
    }
}

#[test]
fn output_order_matches_input_order() {
    let k = Knudson::builtin().unwrap();
    let heights: Vec<Option<f64>> = (0..1000).map(|i| Some(120.0 + (i % 70) as f64)).collect();
    let n = heights.len();
    let got = k
        .predicted(&vec![Some(1); n], &vec![Some(9.0); n], &heights, &MeasureSpec::Scalar(KnudsonMeasure::Fev))
        .unwrap();
    for (h, p) in heights.iter().zip(&got) {
        assert!(close(p.unwrap(), -2.8142 + 0.0348 * h.unwrap()));
    }
}

#[test]
fn named_observations_choose_the_measure() {
    let k = Knudson::builtin().unwrap();
    let out = k
        .pct_predicted_named(
            &[Some(2)],
            &[Some(30.0)],
            &[Some(165.0)],
            KnudsonObservations {
                fef2575: Some(vec![Some(3.0)]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(out.measure, KnudsonMeasure::Fef2575);
    assert!(out.pct[0].is_some());
}

#[test]
fn wang_white_male_fev_age_six_literal() {
    let w = Wang::builtin().unwrap();
    let got = w
        .predicted(&[Some("m")], &[Some(6.5)], &[Some("white")], &[Some(1.20)], &MeasureSpec::Scalar(WangMeasure::Fev))
        .unwrap();
    assert!(close(got[0].unwrap(), (-0.109f64).exp() * 1.20f64.powf(2.252)));
}

#[test]
fn wang_matches_log_linear_form_and_adult_clamp() {
    // White female FVC, age 18: alpha = 0.192, beta = 1.851.
    let expected = 0.192f64.exp() * 1.65f64.powf(1.851);

    let w = Wang::builtin().unwrap();
    let spec = MeasureSpec::Scalar(WangMeasure::Fvc);
    let ages = [Some(18.4), Some(30.0)];
    let args = (&[Some("f"), Some("f")], &[Some("white"), Some("White")], &[Some(1.65), Some(1.65)]);

    let plain = w.predicted(args.0, &ages, args.1, args.2, &spec).unwrap();
    assert!(close(plain[0].unwrap(), expected));
    assert_eq!(plain[1], None);

    let adult = w.with_adult_mode(true).predicted(args.0, &ages, args.1, args.2, &spec).unwrap();
    assert!(close(adult[1].unwrap(), expected));
}

#[test]
fn batch_csv_end_to_end_with_exports() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("subjects.csv");
    std::fs::write(
        &input,
        "id,sex,age,height,race,fev\n\
         a,m,10,1.40,white,1.9\n\
         b,f,12.5,1.52,black,NA\n\
         c,m,5,1.10,white,1.0\n\
         d,x,9,1.30,white,1.5\n",
    )
    .unwrap();

    let batch = load_subjects(&input, Reference::Wang).unwrap();
    let selection = pipeline::select_for_batch(&batch, None);
    assert!(matches!(&selection, Selection::Pct(c) if c.contains_key("fev")));

    // `x` is not a valid Wang sex code, so the whole call fails.
    let err = pipeline::evaluate(&batch, selection, Reference::Wang, false, &TableSources::default()).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    std::fs::write(
        &input,
        "id,sex,age,height,race,fev\n\
         a,m,10,1.40,white,1.9\n\
         b,f,12.5,1.52,black,NA\n\
         c,m,5,1.10,white,1.0\n",
    )
    .unwrap();
    let batch = load_subjects(&input, Reference::Wang).unwrap();
    let selection = pipeline::select_for_batch(&batch, None);
    let run = pipeline::evaluate(&batch, selection, Reference::Wang, false, &TableSources::default()).unwrap();

    assert_eq!(run.measure, "fev");
    assert!(run.results[0].pct_predicted.is_some());
    assert!(run.results[1].predicted.is_some());
    assert_eq!(run.results[1].pct_predicted, None);
    // Age 5 is below the youngest Wang stratum.
    assert_eq!(run.results[2].predicted, None);

    let csv_path = dir.path().join("out.csv");
    let json_path = dir.path().join("out.json");
    spiro_ref::io::export::write_results_csv(&csv_path, &run.results).unwrap();
    spiro_ref::io::export::write_results_json(
        &json_path,
        run.reference,
        &run.measure,
        run.adult_mode,
        &run.warnings,
        &run.results,
    )
    .unwrap();

    let exported = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(exported.lines().count(), 4);
    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(doc["results"].as_array().unwrap().len(), 3);
    assert_eq!(doc["measure"], "fev");
}

#[test]
fn table_override_changes_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knudson.csv");
    std::fs::write(
        &path,
        "measure,sex,age_lb,coef_const,coef_height,coef_age,coef_age_sq\nfev,1,6,0,0.01,0,0\n",
    )
    .unwrap();

    let sources = TableSources {
        knudson: Some(path),
        wang: None,
    };
    let batch = spiro_ref::io::ingest::read_subjects("sex,age,height\n1,8,150\n2,8,150\n".as_bytes(), Reference::Knudson)
        .unwrap();
    let run = pipeline::evaluate(
        &batch,
        Selection::Predicted(vec!["fev".to_string()]),
        Reference::Knudson,
        false,
        &sources,
    )
    .unwrap();

    assert!(close(run.results[0].predicted.unwrap(), 1.5));
    // The override has no female rows.
    assert_eq!(run.results[1].predicted, None);
}
