//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a trailing window.
//! Lookback: period - 1 (first defined value at index period-1).

use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Returns `None` for a zero period; callers validate the period up front.
    pub fn new(period: usize) -> Option<Self> {
        if period == 0 {
            return None;
        }
        Some(Self {
            period,
            name: format!("sma_{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// One value per bar; `None` where the window is incomplete or holds a
    /// non-finite close.
    pub fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        let mut sum = 0.0;
        let mut bad_in_window = 0usize;
        for bar in bars.iter().take(self.period) {
            if bar.close.is_finite() {
                sum += bar.close;
            } else {
                bad_in_window += 1;
            }
        }
        if bad_in_window == 0 {
            result[self.period - 1] = Some(sum / self.period as f64);
        }

        // Roll the window forward, tracking non-finite closes by count so the
        // running sum never absorbs a NaN.
        for i in self.period..n {
            let leaving = bars[i - self.period].close;
            let entering = bars[i].close;

            if leaving.is_finite() {
                sum -= leaving;
            } else {
                bad_in_window -= 1;
            }
            if entering.is_finite() {
                sum += entering;
            } else {
                bad_in_window += 1;
            }

            if bad_in_window == 0 {
                result[i] = Some(sum / self.period as f64);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let sma = Sma::new(5).unwrap();
        let result = sma.compute(&bars);

        assert_eq!(result.len(), 7);
        for (i, value) in result.iter().enumerate().take(4) {
            assert!(value.is_none(), "expected None at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let bars = make_bars(&[100.0, 200.0, 300.0]);
        let result = Sma::new(1).unwrap().compute(&bars);
        assert_approx(result[0].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(result[1].unwrap(), 200.0, DEFAULT_EPSILON);
        assert_approx(result[2].unwrap(), 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_excluded_until_it_leaves_the_window() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        bars[2].close = f64::NAN;
        let result = Sma::new(3).unwrap().compute(&bars);
        // Windows touching index 2 are undefined
        assert!(result[2].is_none());
        assert!(result[3].is_none());
        assert!(result[4].is_none());
        // Index 5 window [13,14,15] → 14.0
        assert_approx(result[5].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_lookback_and_name() {
        let sma = Sma::new(200).unwrap();
        assert_eq!(sma.lookback(), 199);
        assert_eq!(sma.name(), "sma_200");
        assert_eq!(Sma::new(1).unwrap().lookback(), 0);
    }

    #[test]
    fn sma_zero_period_rejected() {
        assert!(Sma::new(0).is_none());
    }

    #[test]
    fn sma_too_few_bars() {
        let bars = make_bars(&[10.0, 11.0]);
        let result = Sma::new(5).unwrap().compute(&bars);
        assert!(result.iter().all(Option::is_none));
    }
}
