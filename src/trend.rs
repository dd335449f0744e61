use serde::{Deserialize, Serialize};

/// Straight line through the series against a 0-based month index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    /// Index of the first month after the training data.
    pub start_index: usize,
}

impl LinearTrend {
    /// Ordinary least squares of `y` on `0..y.len()`. A single observation
    /// gives a flat line through it.
    pub fn fit(y: &[f64]) -> Self {
        let n = y.len();
        if n == 0 {
            return Self {
                slope: 0.0,
                intercept: 0.0,
                start_index: 0,
            };
        }

        let n_f = n as f64;
        let mean_x = (n_f - 1.0) / 2.0;
        let mean_y = y.iter().sum::<f64>() / n_f;

        let (sxy, sxx) = y
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sxy, sxx), (i, &v)| {
                let dx = i as f64 - mean_x;
                (sxy + dx * (v - mean_y), sxx + dx * dx)
            });

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

        Self {
            slope,
            intercept: mean_y - slope * mean_x,
            start_index: n,
        }
    }

    pub fn predict(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }

    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        (self.start_index..self.start_index + horizon)
            .map(|i| self.predict(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let trend = LinearTrend::fit(&[10.0, 12.0, 14.0, 16.0]);
        assert!((trend.slope - 2.0).abs() < 1e-12);
        assert!((trend.intercept - 10.0).abs() < 1e-12);
        assert_eq!(trend.start_index, 4);

        let forecast = trend.forecast(2);
        assert!((forecast[0] - 18.0).abs() < 1e-12);
        assert!((forecast[1] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_points() {
        // y = 1 + x with residuals +1, -1, -1, +1 around it
        let trend = LinearTrend::fit(&[2.0, 1.0, 2.0, 5.0]);
        assert!((trend.slope - 1.0).abs() < 1e-12);
        assert!((trend.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_point_is_flat() {
        let trend = LinearTrend::fit(&[42.0]);
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.forecast(3), vec![42.0, 42.0, 42.0]);
    }
}
