use serde::{Deserialize, Serialize};

/// Decision thresholds for the landing-safety classifier.
///
/// The defaults match the flight-proven values; the evaluation order in
/// [`classify`] is part of the contract, not just the numbers.
#[derive(Clone, Copy, Debug)]
pub struct TerrainThresholds {
    /// Channels without an echo before the sweep is declared NO_GROUND.
    pub no_ground_min_invalid: usize,
    /// max-min spread (cm) above which the surface is a hazard.
    pub hazard_range_cm: f64,
    /// max-min spread (cm) above which the surface is uneven.
    pub uneven_range_cm: f64,
}

impl Default for TerrainThresholds {
    fn default() -> Self {
        Self {
            no_ground_min_invalid: 3,
            hazard_range_cm: 50.0,
            uneven_range_cm: 20.0,
        }
    }
}

/// One of the five mutually exclusive terrain outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainClass {
    FlatSafe,
    Uneven,
    Hazard,
    NoGround,
    NoData,
}

impl TerrainClass {
    /// Wire string, kept byte-for-byte compatible with the ground viewer.
    pub fn as_str(&self) -> &'static str {
        match self {
            TerrainClass::FlatSafe => "FLAT-SAFE",
            TerrainClass::Uneven => "UNEVEN",
            TerrainClass::Hazard => "HAZARD!",
            TerrainClass::NoGround => "NO_GROUND",
            TerrainClass::NoData => "NO_DATA",
        }
    }

    pub fn is_safe_to_land(&self) -> bool {
        matches!(self, TerrainClass::FlatSafe)
    }
}

impl Default for TerrainClass {
    fn default() -> Self {
        TerrainClass::NoData
    }
}

/// Summary statistics over one completed sweep. Only echoes with a positive
/// distance count as valid; the -1 timeout sentinel lands in `invalid_count`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TerrainStats {
    pub min_cm: f64,
    pub max_cm: f64,
    pub variance: f64,
    pub valid_count: usize,
    pub invalid_count: usize,
}

impl TerrainStats {
    pub fn range_cm(&self) -> f64 {
        self.max_cm - self.min_cm
    }
}

/// Reduce a sweep to min / max / population variance over the valid samples.
///
/// Variance is intentionally the biased population formula
/// (`sumsq/n - mean^2`) for output compatibility with the existing log
/// consumers, and is defined as 0 when fewer than two samples are valid.
pub fn reduce(sweep: &[f64]) -> TerrainStats {
    let mut stats = TerrainStats::default();
    let mut sum = 0.0;
    let mut sumsq = 0.0;

    for &d in sweep {
        if d > 0.0 {
            if stats.valid_count == 0 {
                stats.min_cm = d;
                stats.max_cm = d;
            } else {
                stats.min_cm = stats.min_cm.min(d);
                stats.max_cm = stats.max_cm.max(d);
            }
            stats.valid_count += 1;
            sum += d;
            sumsq += d * d;
        } else {
            stats.invalid_count += 1;
        }
    }

    if stats.valid_count > 1 {
        let n = stats.valid_count as f64;
        let mean = sum / n;
        stats.variance = sumsq / n - mean * mean;
    }

    stats
}

/// Map sweep statistics to a terrain class. First match wins; the invalid
/// gate runs before the range rules so a spread computed from only two or
/// three surviving samples can never override a mostly-blind sweep.
pub fn classify(stats: &TerrainStats, thresholds: &TerrainThresholds) -> TerrainClass {
    if stats.invalid_count >= thresholds.no_ground_min_invalid {
        TerrainClass::NoGround
    } else if stats.range_cm() > thresholds.hazard_range_cm {
        TerrainClass::Hazard
    } else if stats.range_cm() > thresholds.uneven_range_cm {
        TerrainClass::Uneven
    } else if stats.valid_count > 0 {
        TerrainClass::FlatSafe
    } else {
        TerrainClass::NoData
    }
}

/// Reduce and classify one sweep.
pub fn evaluate(sweep: &[f64], thresholds: &TerrainThresholds) -> (TerrainStats, TerrainClass) {
    let stats = reduce(sweep);
    let class = classify(&stats, thresholds);
    (stats, class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranging::NO_ECHO;

    fn eval(sweep: &[f64]) -> (TerrainStats, TerrainClass) {
        evaluate(sweep, &TerrainThresholds::default())
    }

    #[test]
    fn test_all_timeouts_is_no_ground() {
        let (stats, class) = eval(&[NO_ECHO; 5]);
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.invalid_count, 5);
        assert_eq!(class, TerrainClass::NoGround);
    }

    #[test]
    fn test_uniform_distance_is_flat() {
        let (stats, class) = eval(&[42.0; 5]);
        assert_eq!(stats.valid_count, 5);
        assert_eq!(stats.min_cm, 42.0);
        assert_eq!(stats.max_cm, 42.0);
        assert!(stats.variance.abs() < 1e-9);
        assert_eq!(class, TerrainClass::FlatSafe);
    }

    #[test]
    fn test_large_spread_is_hazard() {
        // Range 60 > 50cm, all channels answered
        let (stats, class) = eval(&[10.0, 70.0, 40.0, 40.0, 40.0]);
        assert!((stats.range_cm() - 60.0).abs() < 1e-9);
        assert_eq!(class, TerrainClass::Hazard);
    }

    #[test]
    fn test_moderate_spread_is_uneven() {
        // Range 30 falls between the 20cm and 50cm gates
        let (_, class) = eval(&[50.0, 80.0, 60.0, 65.0, 70.0]);
        assert_eq!(class, TerrainClass::Uneven);
    }

    #[test]
    fn test_small_spread_is_flat() {
        // {10, 25}: range 15 <= 20
        let (_, class) = eval(&[10.0, 25.0, 20.0, 15.0, 18.0]);
        assert_eq!(class, TerrainClass::FlatSafe);
    }

    #[test]
    fn test_invalid_gate_beats_range() {
        // Two survivors 60cm apart would read HAZARD, but three blind
        // channels make the sweep NO_GROUND first.
        let (stats, class) = eval(&[10.0, 70.0, NO_ECHO, NO_ECHO, NO_ECHO]);
        assert_eq!(stats.valid_count, 2);
        assert_eq!(stats.invalid_count, 3);
        assert_eq!(class, TerrainClass::NoGround);
    }

    #[test]
    fn test_empty_valid_set_has_zero_variance() {
        let custom = TerrainThresholds {
            no_ground_min_invalid: 3,
            ..Default::default()
        };
        // Two timeouts out of two: below the invalid gate, no valid samples
        let (stats, class) = evaluate(&[NO_ECHO, NO_ECHO], &custom);
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.variance, 0.0);
        assert!(!stats.variance.is_nan());
        assert_eq!(class, TerrainClass::NoData);
    }

    #[test]
    fn test_single_valid_sample_has_zero_variance() {
        let (stats, class) = evaluate(&[33.0], &TerrainThresholds::default());
        assert_eq!(stats.valid_count, 1);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.min_cm, 33.0);
        assert_eq!(stats.max_cm, 33.0);
        assert_eq!(class, TerrainClass::FlatSafe);
    }

    #[test]
    fn test_threshold_boundaries_are_exclusive() {
        // Exactly 50cm of spread is UNEVEN, not HAZARD
        let (_, class) = eval(&[10.0, 60.0, 30.0, 40.0, 50.0]);
        assert_eq!(class, TerrainClass::Uneven);

        // Exactly 20cm of spread is FLAT-SAFE, not UNEVEN
        let (_, class) = eval(&[10.0, 30.0, 20.0, 25.0, 15.0]);
        assert_eq!(class, TerrainClass::FlatSafe);
    }

    #[test]
    fn test_population_variance_formula() {
        // Valid samples {10, 20, 15, 15}; the sentinel is excluded
        let (stats, _) = eval(&[10.0, 20.0, NO_ECHO, 15.0, 15.0]);
        let n = 4.0;
        let mean = (10.0 + 20.0 + 15.0 + 15.0) / n;
        let sumsq = 100.0 + 400.0 + 225.0 + 225.0;
        let expected = sumsq / n - mean * mean;
        assert!((stats.variance - expected).abs() < 1e-9);
    }

    #[test]
    fn test_classifier_is_idempotent() {
        let sweep = [12.0, NO_ECHO, 47.0, 31.0, 28.0];
        let first = eval(&sweep);
        let second = eval(&sweep);
        assert_eq!(first.0.valid_count, second.0.valid_count);
        assert_eq!(first.0.min_cm, second.0.min_cm);
        assert_eq!(first.0.max_cm, second.0.max_cm);
        assert_eq!(first.0.variance, second.0.variance);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(TerrainClass::FlatSafe.as_str(), "FLAT-SAFE");
        assert_eq!(TerrainClass::Uneven.as_str(), "UNEVEN");
        assert_eq!(TerrainClass::Hazard.as_str(), "HAZARD!");
        assert_eq!(TerrainClass::NoGround.as_str(), "NO_GROUND");
        assert_eq!(TerrainClass::NoData.as_str(), "NO_DATA");
        assert!(TerrainClass::FlatSafe.is_safe_to_land());
        assert!(!TerrainClass::Uneven.is_safe_to_land());
    }
}
