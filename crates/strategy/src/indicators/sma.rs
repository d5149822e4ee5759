/// Rolling simple moving average over a price series (oldest first).
///
/// Output has the same length as the input. Positions that do not yet have
/// `period` values behind them are `None`, so `out[i]` is the mean of
/// `values[i + 1 - period..=i]`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// The last two points of `sma(values, period)` as `(previous, latest)`.
/// `None` if the series is too short for both.
pub fn last_two(values: &[f64], period: usize) -> Option<(f64, f64)> {
    let series = sma(values, period);
    let n = series.len();
    if n < 2 {
        return None;
    }
    Some((series[n - 2]?, series[n - 1]?))
}
