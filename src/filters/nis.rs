/// NIS (Normalized Innovation Squared) consistency monitoring
///
/// A consistent filter produces NIS values distributed as chi-square with as
/// many degrees of freedom as the measurement dimension. The monitor counts
/// how often the 95% bound is exceeded per sensor.
use serde::{Deserialize, Serialize};

use crate::types::SensorKind;

/// 95% chi-square bound for 2 degrees of freedom (lidar)
pub const CHI2_95_2DOF: f64 = 5.991;

/// 95% chi-square bound for 3 degrees of freedom (radar)
pub const CHI2_95_3DOF: f64 = 7.815;

pub fn chi2_95_bound(kind: SensorKind) -> f64 {
    match kind {
        SensorKind::Lidar => CHI2_95_2DOF,
        SensorKind::Radar => CHI2_95_3DOF,
    }
}

/// Running NIS statistics for one sensor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NisStats {
    pub count: u64,
    pub above_bound: u64,
    pub sum: f64,
    pub max: f64,
}

impl NisStats {
    fn record(&mut self, nis: f64, bound: f64) {
        self.count += 1;
        self.sum += nis;
        self.max = self.max.max(nis);
        if nis > bound {
            self.above_bound += 1;
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Fraction of samples above the 95% bound; ~0.05 for a consistent filter
    pub fn fraction_above(&self) -> Option<f64> {
        (self.count > 0).then(|| self.above_bound as f64 / self.count as f64)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NisMonitor {
    pub lidar: NisStats,
    pub radar: NisStats,
}

impl NisMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: SensorKind, nis: f64) {
        let bound = chi2_95_bound(kind);
        self.stats_mut(kind).record(nis, bound);
    }

    pub fn stats(&self, kind: SensorKind) -> &NisStats {
        match kind {
            SensorKind::Lidar => &self.lidar,
            SensorKind::Radar => &self.radar,
        }
    }

    fn stats_mut(&mut self, kind: SensorKind) -> &mut NisStats {
        match kind {
            SensorKind::Lidar => &mut self.lidar,
            SensorKind::Radar => &mut self.radar,
        }
    }

    pub fn format_status(&self) -> String {
        let fmt = |kind: SensorKind| {
            let s = self.stats(kind);
            match (s.mean(), s.fraction_above()) {
                (Some(mean), Some(frac)) => format!(
                    "{}: n={} mean={:.2} >chi2_95={:.1}%",
                    kind,
                    s.count,
                    mean,
                    frac * 100.0
                ),
                _ => format!("{}: no updates", kind),
            }
        };
        format!("{} | {}", fmt(SensorKind::Lidar), fmt(SensorKind::Radar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let monitor = NisMonitor::new();
        assert_eq!(monitor.lidar.mean(), None);
        assert_eq!(monitor.radar.fraction_above(), None);
        assert!(monitor.format_status().contains("no updates"));
    }

    #[test]
    fn test_bounds_per_sensor() {
        let mut monitor = NisMonitor::new();
        // 6.5 exceeds the 2-DoF bound but not the 3-DoF bound
        monitor.record(SensorKind::Lidar, 6.5);
        monitor.record(SensorKind::Radar, 6.5);
        monitor.record(SensorKind::Lidar, 1.5);

        assert_eq!(monitor.lidar.count, 2);
        assert_eq!(monitor.lidar.above_bound, 1);
        assert_eq!(monitor.radar.above_bound, 0);
        assert_eq!(monitor.lidar.fraction_above(), Some(0.5));
        assert_eq!(monitor.lidar.mean(), Some(4.0));
        assert_eq!(monitor.lidar.max, 6.5);
    }
}
