use chrono::{Datelike, NaiveDate};
use energy_forecaster::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::fs;
use tempfile::TempDir;

fn csv_upload(rows: &[(String, f64, f64)]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Month", "Consumption_KWh", "Bill_Amount"])
        .unwrap();
    for (month, consumption, bill) in rows {
        writer
            .write_record([month.clone(), consumption.to_string(), bill.to_string()])
            .unwrap();
    }
    writer.into_inner().unwrap()
}

fn monthly_rows(start: NaiveDate, consumption: &[f64], rate: f64) -> Vec<(String, f64, f64)> {
    consumption
        .iter()
        .enumerate()
        .map(|(i, &c)| (format_month(add_months(start, i as i32)), c, c * rate))
        .collect()
}

fn open_service(dir: &TempDir) -> ForecastService {
    ForecastService::open(StoreConfig::rooted_at(dir.path())).unwrap()
}

fn noisy_seasonal_series(months: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 5.0).unwrap();
    (0..months)
        .map(|t| {
            let t = t as f64;
            500.0 + 2.0 * t + 80.0 * (2.0 * PI * t / 12.0).sin() + noise.sample(&mut rng)
        })
        .collect()
}

#[test]
fn test_linear_trend_upload_and_forecast() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);

    let consumption: Vec<f64> = (0..12).map(|i| 200.0 + 10.0 * i as f64).collect();
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let upload = csv_upload(&monthly_rows(start, &consumption, 10.0));

    let response = service.upload("usage_2023.csv", &upload).unwrap();
    assert_eq!(response.rows.len(), 12);
    assert!((response.metadata.avg_rate_per_kwh - 10.0).abs() < 1e-9);

    let forecast = service.forecast().unwrap();
    assert_eq!(forecast.actual.len(), 12);
    assert_eq!(forecast.forecast.len(), 6);
    assert_eq!(forecast.forecast[0].month, "Jan-24");
    assert_eq!(forecast.forecast[5].month, "Jun-24");

    let last_bill = forecast.actual.last().unwrap().bill;
    let bills: Vec<f64> = forecast.forecast.iter().map(|row| row.bill).collect();
    for pair in bills.windows(2) {
        assert!(pair[1] >= pair[0], "bills decreased: {:?}", bills);
    }
    for bill in &bills {
        assert!(*bill >= last_bill * 0.5 && *bill <= last_bill * 2.0, "implausible bill {bill}");
    }
}

#[test]
fn test_missing_bill_column_leaves_dataset_unchanged() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    service
        .upload("good.csv", &csv_upload(&monthly_rows(start, &[120.0, 130.0, 125.0], 0.3)))
        .unwrap();
    let dataset_path = service.store().config().dataset_path();
    let before = fs::read(&dataset_path).unwrap();

    let bad = b"Month,Consumption_KWh\nJan-25,100\nFeb-25,90\n";
    match service.upload("bad.csv", bad) {
        Err(EnergyForecastError::MissingColumns(columns)) => {
            assert_eq!(columns, vec!["Bill_Amount".to_string()]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }

    assert_eq!(fs::read(&dataset_path).unwrap(), before);
    assert_eq!(service.history().unwrap().len(), 3);
}

#[test]
fn test_empty_dataset_forecasts_zeros() {
    let (model, metadata) = train_model(&UsageSeries::new());
    assert_eq!(model, TrainedModel::None);
    assert_eq!(metadata.avg_rate_per_kwh, 0.0);

    let forecast = forecast_consumption(&UsageSeries::new(), &model, 6).unwrap();
    assert_eq!(forecast, vec![0.0; 6]);
}

#[test]
fn test_noisy_seasonal_history_fits_seasonal_model() {
    let series = noisy_seasonal_series(48, 7);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let table = read_csv_table(csv_upload(&monthly_rows(start, &series, 0.12)).as_slice()).unwrap();

    let result = process_usage_table(&table, 12).unwrap();
    assert_eq!(result.model.kind(), "sarima");
    assert_eq!(
        result.model.model_name(),
        "SARIMA(1,1,1)(1,1,1,12) + Rate per kWh Estimation"
    );
    assert_eq!(result.forecast.len(), 12);
    assert_eq!(result.forecast[0].month, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

    let expected_mean = (48..60).map(|t| 500.0 + 2.0 * t as f64).sum::<f64>() / 12.0;
    let forecast_mean =
        result.forecast.iter().map(|p| p.consumption).sum::<f64>() / result.forecast.len() as f64;
    assert!(result.forecast.iter().all(|p| p.consumption.is_finite()));
    assert!(
        (forecast_mean - expected_mean).abs() < expected_mean * 0.2,
        "forecast mean {forecast_mean} too far from {expected_mean}"
    );
}

#[test]
fn test_model_survives_restart() {
    let dir = TempDir::new().unwrap();
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let series = noisy_seasonal_series(24, 11);

    let uploaded = {
        let service = open_service(&dir);
        service
            .upload("history.csv", &csv_upload(&monthly_rows(start, &series, 0.2)))
            .unwrap()
    };

    let reopened = open_service(&dir);
    assert_eq!(reopened.store().current_metadata(), Some(uploaded.metadata));

    let persisted = fs::read_to_string(reopened.store().config().model_path()).unwrap();
    assert!(persisted.contains("\"model_type\""));

    let prediction = reopened.predict(Some("Mar-24")).unwrap();
    assert_eq!(prediction.month, "Mar-24");
    assert_eq!(prediction.confidence, Confidence::High);
    assert!(prediction.predicted_consumption.is_finite());
}

#[test]
fn test_history_and_insights_after_upload() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);

    let upload = b"Month,Consumption_KWh,Bill_Amount\n\
                   2024/03,300,60\n\
                   January, 2024,100,20\n";
    // "January, 2024" splits into two cells; quote it as a client would.
    assert!(service.upload("odd.csv", upload).is_err());

    let upload = b"Month,Consumption_KWh,Bill_Amount\n\
                   2024/03,300,60\n\
                   \"January, 2024\",100,20\n";
    service.upload("quoted.csv", upload).unwrap();

    let history = service.history().unwrap();
    let months: Vec<&str> = history.iter().map(|row| row.month.as_str()).collect();
    assert_eq!(months, vec!["Jan-24", "Feb-24", "Mar-24"]);
    assert_eq!(history[1].consumption_kwh, 200.0);

    let InsightsResponse::Report(report) = service.insights().unwrap() else {
        panic!("expected a report");
    };
    assert_eq!(report.peak_month, "Mar-24");
    assert_eq!(report.lowest_month, "Jan-24");
    assert_eq!(report.total_bill, 120.0);
    assert_eq!(report.avg_rate_per_kwh, 0.2);
}

#[test]
fn test_schema_generation() {
    let schema = schema_as_json::<UploadResponse>().unwrap();
    assert!(schema.contains("metadata"));
    assert!(schema.contains("avg_rate_per_kwh"));

    let schema = schema_as_json::<InsightsResponse>().unwrap();
    assert!(schema.contains("recommendations"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cleaning_is_gap_free_and_idempotent(
        rows in proptest::collection::btree_map(0i32..48, (0.0f64..10_000.0, 0.0f64..2_000.0), 1..24)
    ) {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|(offset, (consumption, bill))| {
                let month = add_months(start, *offset);
                vec![
                    format!("{}-{:02}", month.year(), month.month()),
                    consumption.to_string(),
                    bill.to_string(),
                ]
            })
            .collect();
        let table = RawTable::new(
            vec!["Month".into(), "Consumption_KWh".into(), "Bill_Amount".into()],
            cells,
        );

        let cleaned = clean_dataset(&table).unwrap();
        let first = *rows.keys().next().unwrap();
        let last = *rows.keys().next_back().unwrap();
        prop_assert_eq!(cleaned.len() as i32, last - first + 1);

        let months: Vec<NaiveDate> = cleaned.keys().copied().collect();
        for pair in months.windows(2) {
            prop_assert_eq!(months_between(pair[0], pair[1]), 1);
        }
        prop_assert!(cleaned.values().all(|p| p.consumption.is_finite() && p.bill_amount.is_finite()));

        let again = clean_dataset(&to_raw_table(&cleaned)).unwrap();
        prop_assert_eq!(again.len(), cleaned.len());
        for ((m1, p1), (m2, p2)) in cleaned.iter().zip(again.iter()) {
            prop_assert_eq!(m1, m2);
            prop_assert_eq!(p1.consumption, p2.consumption);
            prop_assert_eq!(p1.bill_amount, p2.bill_amount);
        }
    }
}
