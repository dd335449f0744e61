use crate::error::{EnergyForecastError, Result};
use crate::ingestion::RawTable;
use crate::schema::{BILL_COLUMN, CONSUMPTION_COLUMN, MONTH_COLUMN, REQUIRED_COLUMNS};
use crate::utils::{format_month, month_range, parse_month};
use crate::{DataOrigin, UsagePoint, UsageSeries};
use chrono::NaiveDate;
use log::{debug, info};
use splines::{Interpolation, Key, Spline};
use std::collections::BTreeMap;

struct ColumnLayout {
    month: usize,
    consumption: usize,
    bill: usize,
}

fn resolve_columns(table: &RawTable) -> Result<ColumnLayout> {
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        missing.sort();
        return Err(EnergyForecastError::MissingColumns(missing));
    }

    let index = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| EnergyForecastError::MissingColumns(vec![name.to_string()]))
    };

    Ok(ColumnLayout {
        month: index(MONTH_COLUMN)?,
        consumption: index(CONSUMPTION_COLUMN)?,
        bill: index(BILL_COLUMN)?,
    })
}

/// Numeric coercion: anything that is not a finite number becomes missing.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates, coerces and reindexes an uploaded table onto a gap-free monthly
/// calendar.
///
/// Every month cell must parse; a bad month fails the whole table. Rows whose
/// consumption or bill is not numeric are dropped. Missing months between the
/// first and last observation are filled by linear interpolation.
pub fn clean_dataset(table: &RawTable) -> Result<UsageSeries> {
    let columns = resolve_columns(table)?;

    let mut months = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        months.push(parse_month(table.cell(row, columns.month))?);
    }

    let mut observed: Vec<(NaiveDate, f64, f64)> = months
        .into_iter()
        .enumerate()
        .filter_map(|(row, month)| {
            let consumption = coerce_numeric(table.cell(row, columns.consumption))?;
            let bill = coerce_numeric(table.cell(row, columns.bill))?;
            Some((month, consumption, bill))
        })
        .collect();

    let dropped = table.len() - observed.len();
    if dropped > 0 {
        debug!("Dropped {} rows with missing consumption or bill", dropped);
    }

    observed.sort_by_key(|(month, _, _)| *month);

    if observed.is_empty() {
        info!("Cleaned dataset is empty ({} input rows)", table.len());
        return Ok(BTreeMap::new());
    }

    let mut known: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for (month, consumption, bill) in observed {
        if known.insert(month, (consumption, bill)).is_some() {
            return Err(EnergyForecastError::DuplicateMonth(format_month(month)));
        }
    }

    let series = reindex_monthly(&known);

    let interpolated = series
        .values()
        .filter(|p| p.origin == DataOrigin::Interpolated)
        .count();
    info!(
        "Cleaned dataset: {} input rows, {} months, {} interpolated",
        table.len(),
        series.len(),
        interpolated
    );

    Ok(series)
}

/// Lays known values onto every month from the first to the last observation
/// and fills the holes.
fn reindex_monthly(known: &BTreeMap<NaiveDate, (f64, f64)>) -> UsageSeries {
    let (Some(start), Some(end)) = (known.keys().next(), known.keys().next_back()) else {
        return BTreeMap::new();
    };

    let calendar = month_range(*start, *end);
    let consumption: Vec<Option<f64>> = calendar
        .iter()
        .map(|m| known.get(m).map(|v| v.0))
        .collect();
    let bills: Vec<Option<f64>> = calendar
        .iter()
        .map(|m| known.get(m).map(|v| v.1))
        .collect();

    let consumption = fill_gaps(&consumption);
    let bills = fill_gaps(&bills);

    let mut series = BTreeMap::new();
    for (i, month) in calendar.into_iter().enumerate() {
        let (Some(consumption), Some(bill_amount)) = (consumption[i], bills[i]) else {
            continue;
        };
        let origin = if known.contains_key(&month) {
            DataOrigin::Observed
        } else {
            DataOrigin::Interpolated
        };
        series.insert(
            month,
            UsagePoint {
                consumption,
                bill_amount,
                origin,
            },
        );
    }

    series
}

/// Fills missing positions by linear interpolation between the nearest known
/// neighbours; positions before the first or after the last known value take
/// that boundary value. Known values are returned untouched. If nothing is
/// known the input comes back unchanged.
pub fn fill_gaps(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let keys: Vec<Key<f64, f64>> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| Key::new(i as f64, v, Interpolation::Linear)))
        .collect();

    if keys.is_empty() {
        return values.to_vec();
    }

    let spline = Spline::from_vec(keys);

    values
        .iter()
        .enumerate()
        .map(|(i, v)| v.or_else(|| spline.clamped_sample(i as f64)))
        .collect()
}

/// Rebuilds a series from a previously persisted table. Unlike
/// [`clean_dataset`] this is lenient: rows with an unreadable month or number
/// are skipped and no reindexing happens.
pub fn restore_series(table: &RawTable) -> Result<UsageSeries> {
    let columns = resolve_columns(table)?;

    let mut series = BTreeMap::new();
    for row in 0..table.len() {
        let Ok(month) = parse_month(table.cell(row, columns.month)) else {
            debug!("Skipping stored row {} with unreadable month", row);
            continue;
        };
        let (Some(consumption), Some(bill_amount)) = (
            coerce_numeric(table.cell(row, columns.consumption)),
            coerce_numeric(table.cell(row, columns.bill)),
        ) else {
            continue;
        };
        series.insert(
            month,
            UsagePoint {
                consumption,
                bill_amount,
                origin: DataOrigin::Observed,
            },
        );
    }

    Ok(series)
}

/// Canonical table form of a series: ISO months, shortest round-trip numbers.
pub fn to_raw_table(series: &UsageSeries) -> RawTable {
    let headers = REQUIRED_COLUMNS.iter().map(|h| h.to_string()).collect();
    let rows = series
        .iter()
        .map(|(month, point)| {
            vec![
                month.format("%Y-%m-%d").to_string(),
                point.consumption.to_string(),
                point.bill_amount.to_string(),
            ]
        })
        .collect();

    RawTable::new(headers, rows)
}
