//! Distributional outlier scoring over batch-wide numeric columns.
//!
//! Three interchangeable methods: z-score, IQR fence distance, and MAD.
//! All of them are guaranteed, by construction, to return an all-zero score
//! vector for empty, all-missing, or zero-dispersion input instead of
//! dividing by zero. Missing entries score zero and are excluded from the
//! statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    ZScore,
    Iqr,
    Mad,
}

/// Scale factor that makes MAD consistent with the standard deviation of a
/// normal distribution.
const MAD_CONSISTENCY: f64 = 0.6745;

/// Score one column. The output has the same length as the input; z-score
/// and MAD scores are signed (callers compare |score| against a threshold),
/// the IQR score is the distance past the nearer fence in IQR units, zero
/// inside the fences.
pub fn score_column(values: &[Option<f64>], method: AnomalyMethod) -> Vec<f64> {
    let present: Vec<f64> = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| v.is_finite())
        .collect();

    if present.len() < 2 {
        return vec![0.0; values.len()];
    }

    let score_one: Box<dyn Fn(f64) -> f64> = match method {
        AnomalyMethod::ZScore => {
            let mean = mean(&present);
            let stddev = sample_stddev(&present, mean);
            if stddev <= 0.0 {
                return vec![0.0; values.len()];
            }
            Box::new(move |x| (x - mean) / stddev)
        }
        AnomalyMethod::Iqr => {
            let mut sorted = present.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let q1 = quantile(&sorted, 0.25);
            let q3 = quantile(&sorted, 0.75);
            let iqr = q3 - q1;
            if iqr <= 0.0 {
                return vec![0.0; values.len()];
            }
            let lower = q1 - 1.5 * iqr;
            let upper = q3 + 1.5 * iqr;
            Box::new(move |x| {
                if x < lower {
                    (lower - x) / iqr
                } else if x > upper {
                    (x - upper) / iqr
                } else {
                    0.0
                }
            })
        }
        AnomalyMethod::Mad => {
            let med = median(&present);
            let deviations: Vec<f64> = present.iter().map(|x| (x - med).abs()).collect();
            let mad = median(&deviations);
            if mad <= 0.0 {
                return vec![0.0; values.len()];
            }
            Box::new(move |x| MAD_CONSISTENCY * (x - med) / mad)
        }
    };

    values
        .iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => score_one(*x),
            _ => 0.0,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_stddev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile(&sorted, 0.5)
}

/// Linearly interpolated quantile over a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let position = q * (n - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        let fraction = position - low as f64;
        sorted[low] + (sorted[high] - sorted[low]) * fraction
    }
}
