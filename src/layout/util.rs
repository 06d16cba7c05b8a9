pub(crate) fn sum(values: impl IntoIterator<Item = f32>) -> f32 {
    values.into_iter().sum()
}

pub(crate) fn mean(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let mut total = 0.0f32;
    let mut count = 0usize;
    for value in values {
        total += value;
        count += 1;
    }
    (count > 0).then(|| total / count as f32)
}

/// Weighted mean; falls back to the plain mean when every weight is zero.
pub(crate) fn weighted_mean(pairs: impl IntoIterator<Item = (f32, f32)>) -> Option<f32> {
    let pairs: Vec<(f32, f32)> = pairs.into_iter().collect();
    let total_weight: f32 = pairs.iter().map(|(_, w)| *w).sum();
    if total_weight > 0.0 {
        let weighted: f32 = pairs.iter().map(|(v, w)| v * w).sum();
        Some(weighted / total_weight)
    } else {
        mean(pairs.into_iter().map(|(v, _)| v))
    }
}

/// Median with the midpoint of the two central values for even counts.
pub(crate) fn median(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let mut values: Vec<f32> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

pub(crate) fn extent(values: impl IntoIterator<Item = f32>) -> Option<[f32; 2]> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some([v, v]),
        Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
    })
}

/// Formats a path operand: at most three decimals, shortest form, no `-0`.
pub(crate) fn fmt_num(value: f32) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_odd_and_even() {
        assert_eq!(median([3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(Vec::<f32>::new()), None);
    }

    #[test]
    fn weighted_mean_falls_back_to_plain_mean() {
        assert_eq!(weighted_mean([(10.0, 1.0), (20.0, 3.0)]), Some(17.5));
        assert_eq!(weighted_mean([(10.0, 0.0), (20.0, 0.0)]), Some(15.0));
        assert_eq!(weighted_mean(Vec::new()), None);
    }

    #[test]
    fn extent_and_sum() {
        assert_eq!(extent([5.0, -1.0, 3.0]), Some([-1.0, 5.0]));
        assert_eq!(extent(Vec::new()), None);
        assert_eq!(sum([1.0, 2.0, 3.5]), 6.5);
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn fmt_num_drops_negative_zero() {
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(140.0), "140");
        assert_eq!(fmt_num(-2.5), "-2.5");
        assert_eq!(fmt_num(200.0 * 0.6), "120");
        assert_eq!(fmt_num(1.23456), "1.235");
    }
}
