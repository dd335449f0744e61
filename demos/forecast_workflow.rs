use energy_forecaster::*;

const UPLOAD: &str = "Month,Consumption_KWh,Bill_Amount
Jan-22,540,81.00
Feb-22,510,76.50
Mar-22,470,70.50
May-22,390,58.50
Jun-22,420,63.00
Jul-22,520,78.00
Aug-22,560,84.00
Sep-22,470,70.50
Oct-22,430,64.50
Nov-22,480,72.00
Dec-22,560,84.00
Jan-23,570,88.35
Feb-23,540,83.70
Mar-23,500,77.50
Apr-23,450,69.75
May-23,420,65.10
Jun-23,450,69.75
Jul-23,550,85.25
Aug-23,590,91.45
Sep-23,500,77.50
Oct-23,455,70.53
Nov-23,510,79.05
Dec-23,590,91.45
";

fn main() -> anyhow::Result<()> {
    println!("⚡ Energy Forecast Workflow Demo\n");

    let root = std::env::temp_dir().join("energy-forecaster-demo");
    let service = ForecastService::open(StoreConfig::rooted_at(&root))?;
    println!("Store directory: {}\n", root.display());

    // Apr-22 is missing and gets interpolated during cleaning.
    let upload = service.upload("household_2022_2023.csv", UPLOAD.as_bytes())?;
    println!(
        "Uploaded {} months, trailing rate {:.4} per kWh",
        upload.rows.len(),
        upload.metadata.avg_rate_per_kwh
    );

    let forecast = service.forecast()?;
    println!("\n{:<8} {:>12} {:>10}", "Month", "kWh", "Bill");
    for row in &forecast.forecast {
        println!("{:<8} {:>12.2} {:>10.2}", row.month, row.consumption, row.bill);
    }

    for month in ["Feb-24", "2024-09", "Jun-22"] {
        let prediction = service.predict(Some(month))?;
        println!(
            "\n{} → {:.2} kWh, bill {:.2} [{}] via {}",
            prediction.month,
            prediction.predicted_consumption,
            prediction.predicted_bill,
            prediction.confidence,
            prediction.model_used
        );
    }

    if let InsightsResponse::Report(report) = service.insights()? {
        println!(
            "\nAverage {:.2} kWh, peak {} ({:.2}), lowest {} ({:.2}), total billed {:.2}",
            report.average_consumption,
            report.peak_month,
            report.peak_value,
            report.lowest_month,
            report.lowest_value,
            report.total_bill
        );
        for recommendation in &report.recommendations {
            println!("  • {}", recommendation);
        }
    }

    Ok(())
}
