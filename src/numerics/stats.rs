//! Descriptive statistics.

use serde::Serialize;

use super::NumericsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample variance (n - 1 denominator); `None` for a single value
    pub variance: Option<f64>,
}

/// Mean and sample variance, computed in two passes.
pub fn describe(data: &[f64]) -> Result<Summary, NumericsError> {
    if data.is_empty() {
        return Err(NumericsError::EmptyData);
    }
    if data.iter().any(|x| !x.is_finite()) {
        return Err(NumericsError::NonFinite("data"));
    }

    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    if !mean.is_finite() {
        return Err(NumericsError::NonFinite("mean"));
    }

    let variance = if data.len() < 2 {
        None
    } else {
        let ss: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
        let variance = ss / (n - 1.0);
        if !variance.is_finite() {
            return Err(NumericsError::NonFinite("variance"));
        }
        Some(variance)
    };

    Ok(Summary {
        count: data.len(),
        mean,
        variance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_variance() {
        let s = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.variance.unwrap() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_no_variance() {
        let s = describe(&[7.0]).unwrap();
        assert_eq!(s.mean, 7.0);
        assert_eq!(s.variance, None);
    }

    #[test]
    fn empty_data_is_rejected() {
        assert_eq!(describe(&[]), Err(NumericsError::EmptyData));
    }

    #[test]
    fn large_offset_keeps_precision() {
        let s = describe(&[1e9 + 4.0, 1e9 + 7.0, 1e9 + 13.0, 1e9 + 16.0]).unwrap();
        assert!((s.variance.unwrap() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn overflowing_sum_is_rejected() {
        assert_eq!(
            describe(&[f64::MAX, f64::MAX]),
            Err(NumericsError::NonFinite("mean"))
        );
    }
}
