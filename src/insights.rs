use crate::rates::compute_avg_rate;
use crate::schema::InsightsReport;
use crate::utils::{format_month, round_to};
use crate::UsageSeries;
use chrono::NaiveDate;

pub const PEAK_USAGE_ADVICE: &str =
    "Monitor high-consumption months and schedule maintenance to reduce peak usage.";
pub const HVAC_ADVICE: &str = "Evaluate HVAC efficiency and shift loads where possible.";
pub const TRACKING_ADVICE: &str = "Continue tracking monthly data to improve forecast accuracy.";

/// Summary statistics and advice for a dataset. `None` when there is no data.
pub fn summarize(series: &UsageSeries) -> Option<InsightsReport> {
    let (peak_month, peak_value) = extreme(series, |candidate, best| candidate > best)?;
    let (lowest_month, lowest_value) = extreme(series, |candidate, best| candidate < best)?;

    let consumption: Vec<f64> = series.values().map(|p| p.consumption).collect();
    let average = consumption.iter().sum::<f64>() / consumption.len() as f64;
    let total_bill: f64 = series.values().map(|p| p.bill_amount).sum();
    let avg_rate = compute_avg_rate(series);

    let mut recommendations = Vec::new();
    if avg_rate > 0.0 {
        recommendations.push(PEAK_USAGE_ADVICE.to_string());
    }
    if average > median(&consumption) {
        recommendations.push(HVAC_ADVICE.to_string());
    }
    recommendations.push(TRACKING_ADVICE.to_string());

    Some(InsightsReport {
        average_consumption: round_to(average, 2),
        peak_month: format_month(peak_month),
        peak_value: round_to(peak_value, 2),
        lowest_month: format_month(lowest_month),
        lowest_value: round_to(lowest_value, 2),
        total_bill: round_to(total_bill, 2),
        avg_rate_per_kwh: round_to(avg_rate, 4),
        recommendations,
    })
}

/// First month whose consumption wins under `better`; ties keep the earlier month.
fn extreme<F>(series: &UsageSeries, better: F) -> Option<(NaiveDate, f64)>
where
    F: Fn(f64, f64) -> bool,
{
    series
        .iter()
        .map(|(month, point)| (*month, point.consumption))
        .reduce(|best, candidate| {
            if better(candidate.1, best.1) {
                candidate
            } else {
                best
            }
        })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.is_empty() {
        0.0
    } else if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
