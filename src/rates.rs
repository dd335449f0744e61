use crate::UsageSeries;

/// How many trailing months feed the average rate.
pub const RATE_WINDOW: usize = 3;

/// Average bill per kWh over the last [`RATE_WINDOW`] months.
///
/// Months with zero consumption have no defined rate and are skipped. Returns
/// 0.0 for an empty series or when no month in the window yields a rate.
pub fn compute_avg_rate(series: &UsageSeries) -> f64 {
    let rates: Vec<f64> = series
        .values()
        .rev()
        .take(RATE_WINDOW)
        .filter(|p| p.consumption != 0.0)
        .map(|p| p.bill_amount / p.consumption)
        .filter(|r| r.is_finite())
        .collect();

    if rates.is_empty() {
        return 0.0;
    }

    rates.iter().sum::<f64>() / rates.len() as f64
}

/// Converts forecast consumption into a billed amount at a flat rate.
pub fn estimate_bill(consumption: f64, avg_rate: f64) -> f64 {
    consumption * avg_rate
}
