use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use super::dataset::{Column, ColumnData, Dataset};
use super::stats;

/// Columns missing more than this fraction of their cells are dropped.
pub const MAX_MISSING_FRACTION: f64 = 0.5;

/// Multiplier applied to the interquartile range when bounding outliers.
pub const IQR_FENCE: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct CleaningPolicy {
    /// Column that is carried through untouched.
    pub target_column: String,
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            target_column: "price".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningReport {
    pub input_shape: (usize, usize),
    pub output_shape: (usize, usize),
    pub dropped_columns: Vec<String>,
    pub imputed_cells: BTreeMap<String, usize>,
    pub encoded_columns: Vec<String>,
    /// Rows removed by each column's outlier fence, in filtering order.
    pub outlier_rows_removed: Vec<(String, usize)>,
}

/// Runs the fixed cleaning recipe over `input` and returns the cleaned copy.
pub fn clean(input: &Dataset, policy: &CleaningPolicy) -> (Dataset, CleaningReport) {
    let mut data = input.clone();
    let mut report = CleaningReport {
        input_shape: input.shape(),
        ..CleaningReport::default()
    };
    let target = policy.target_column.as_str();

    info!("Cleaning missing values...");
    drop_sparse_columns(&mut data, target, &mut report);

    // Only columns that were numeric on load take part in outlier filtering.
    let numeric_columns: Vec<String> = data
        .columns
        .iter()
        .filter(|c| c.data.is_numeric() && c.name != target)
        .map(|c| c.name.clone())
        .collect();

    impute_missing(&mut data, target, &mut report);

    info!("Encoding categorical variables...");
    encode_categoricals(&mut data, target, &mut report);

    info!("Removing outliers...");
    remove_outliers(&mut data, &numeric_columns, &mut report);

    report.output_shape = data.shape();
    (data, report)
}

fn drop_sparse_columns(data: &mut Dataset, target: &str, report: &mut CleaningReport) {
    data.columns.retain(|column| {
        let fraction = column.missing_fraction();
        if column.name != target && fraction > MAX_MISSING_FRACTION {
            debug!("Dropping column {} ({:.0}% missing)", column.name, fraction * 100.0);
            report.dropped_columns.push(column.name.clone());
            false
        } else {
            true
        }
    });
}

fn impute_missing(data: &mut Dataset, target: &str, report: &mut CleaningReport) {
    for column in data.columns.iter_mut().filter(|c| c.name != target) {
        let missing = column.data.missing_count();
        if missing == 0 {
            continue;
        }

        let filled = match &mut column.data {
            ColumnData::Numeric { values, .. } => match stats::median(values) {
                Some(median) => {
                    values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(median));
                    true
                }
                None => false,
            },
            ColumnData::Categorical(values) => match stats::mode(values) {
                Some(mode) => {
                    values
                        .iter_mut()
                        .filter(|v| v.is_none())
                        .for_each(|v| *v = Some(mode.clone()));
                    true
                }
                None => false,
            },
        };

        if filled {
            report.imputed_cells.insert(column.name.clone(), missing);
        }
    }
}

fn encode_categoricals(data: &mut Dataset, target: &str, report: &mut CleaningReport) {
    for column in data.columns.iter_mut().filter(|c| c.name != target) {
        let ColumnData::Categorical(values) = &column.data else {
            continue;
        };

        // A fresh encoding per column; codes are only meaningful within this run.
        let codes = stats::label_codes(values);
        let encoded = values
            .iter()
            .map(|v| v.as_ref().map(|s| codes[s] as f64))
            .collect();

        *column = Column::numeric(column.name.clone(), encoded);
        report.encoded_columns.push(column.name.clone());
    }
}

/// Filters column by column; each fence is computed on the rows that survived
/// the previous columns, so the result depends on column order.
fn remove_outliers(data: &mut Dataset, columns: &[String], report: &mut CleaningReport) {
    for name in columns {
        let Some(column) = data.column(name) else {
            continue;
        };
        let ColumnData::Numeric { values, .. } = &column.data else {
            continue;
        };

        let (Some(q1), Some(q3)) = (stats::quantile(values, 0.25), stats::quantile(values, 0.75)) else {
            // Nothing present to compare against; every row fails the fence.
            let removed = values.len();
            data.retain_rows(&vec![false; removed]);
            report.outlier_rows_removed.push((name.clone(), removed));
            continue;
        };

        let iqr = q3 - q1;
        let lower = q1 - IQR_FENCE * iqr;
        let upper = q3 + IQR_FENCE * iqr;

        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| x >= lower && x <= upper))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();

        if removed > 0 {
            debug!("Column {}: removing {} rows outside [{}, {}]", name, removed, lower, upper);
        }
        data.retain_rows(&keep);
        report.outlier_rows_removed.push((name.clone(), removed));
    }
}
