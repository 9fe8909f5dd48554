//! Ingest rate estimation.

/// Exponentially weighted moving moments of the producer byte rate,
/// sampled once per housekeeping tick.
///
/// The figures cover the whole stream, audio and muxing overhead
/// included; both are small and predictable next to the video track.
#[derive(Debug, Default)]
pub(crate) struct RateGauge {
    /// Bytes accumulated since the last tick, seeded with `-mean`.
    unit: f64,
    mean: f64,
    var: f64,
}

impl RateGauge {
    /// Record bytes accepted from the producer.
    pub fn add(&mut self, bytes: usize) {
        self.unit += bytes as f64;
    }

    /// Fold the current sample into the moving moments, at a = 0.5:
    ///     avg[n] = a * x + (1 - a) * avg[n - 1]
    ///     var[n] = a * (x - avg[n])^2 / (1 - a) + (1 - a) * var[n - 1]
    pub fn roll(&mut self) {
        self.mean += self.unit / 2.0;
        self.var += self.unit * self.unit - self.var / 2.0;
        self.unit = -self.mean;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.var
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_rate_converges_on_mean() {
        let mut gauge = RateGauge::default();
        for _ in 0..32 {
            gauge.add(1000);
            gauge.roll();
        }
        assert!((gauge.mean() - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_idle_gauge_decays() {
        let mut gauge = RateGauge::default();
        gauge.add(1000);
        gauge.roll();
        let peak = gauge.mean();
        for _ in 0..16 {
            gauge.roll();
        }
        assert!(gauge.mean() < peak / 100.0);
    }
}
