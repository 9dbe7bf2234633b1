use std::collections::BTreeMap;

/// Median of the present values, `None` when there are none.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Most frequent present value; ties go to the smallest value in sort order.
pub fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Quantile with linear interpolation between closest ranks over the present values.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (present.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;

    Some(present[lower] + (present[upper] - present[lower]) * weight)
}

/// Maps each distinct value to its rank in sorted order.
pub fn label_codes(values: &[Option<String>]) -> BTreeMap<String, usize> {
    let mut codes: BTreeMap<String, usize> = values
        .iter()
        .flatten()
        .map(|v| (v.clone(), 0))
        .collect();
    for (code, slot) in codes.values_mut().enumerate() {
        *slot = code;
    }
    codes
}
