use serde::{Deserialize, Serialize};

use crate::sensors::{AccelSample, MagSample};

/// Roll/pitch/heading derived from one accel + mag pair.
///
/// Stateless by design: no smoothing, no tilt compensation of the heading,
/// just the direct geometry each cycle. `valid` is false when the bus handed
/// back non-finite samples; consumers keep their previous estimate instead
/// of publishing garbage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OrientationEstimate {
    /// Degrees, -180..180.
    pub roll_deg: f64,
    /// Degrees, -90..90.
    pub pitch_deg: f64,
    /// Degrees, normalized into [0, 360).
    pub heading_deg: f64,
    pub valid: bool,
}

impl Default for OrientationEstimate {
    fn default() -> Self {
        Self {
            roll_deg: 0.0,
            pitch_deg: 0.0,
            heading_deg: 0.0,
            valid: false,
        }
    }
}

/// Compute the full estimate from one matched sample pair.
pub fn estimate(accel: &AccelSample, mag: &MagSample) -> OrientationEstimate {
    let inputs = [accel.x, accel.y, accel.z, mag.x, mag.y];
    if inputs.iter().any(|v| !v.is_finite()) {
        return OrientationEstimate::default();
    }

    let roll_deg = accel.y.atan2(accel.z).to_degrees();
    let pitch_deg = (-accel.x)
        .atan2((accel.y * accel.y + accel.z * accel.z).sqrt())
        .to_degrees();

    let mut heading_deg = mag.y.atan2(mag.x).to_degrees();
    if heading_deg < 0.0 {
        heading_deg += 360.0;
    }

    OrientationEstimate {
        roll_deg,
        pitch_deg,
        heading_deg,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn accel(x: f64, y: f64, z: f64) -> AccelSample {
        AccelSample { timestamp: 0.0, x, y, z }
    }

    fn mag(x: f64, y: f64) -> MagSample {
        MagSample { timestamp: 0.0, x, y, z: 0.0 }
    }

    #[test]
    fn test_level_payload() {
        let est = estimate(&accel(0.0, 0.0, 1.0), &mag(1.0, 0.0));
        assert!(est.valid);
        assert_relative_eq!(est.roll_deg, 0.0, epsilon = 1e-9);
        assert_relative_eq!(est.pitch_deg, 0.0, epsilon = 1e-9);
        assert_relative_eq!(est.heading_deg, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cardinal_headings() {
        let level = accel(0.0, 0.0, 1.0);
        assert_relative_eq!(estimate(&level, &mag(1.0, 0.0)).heading_deg, 0.0, epsilon = 1e-9);
        assert_relative_eq!(estimate(&level, &mag(0.0, 1.0)).heading_deg, 90.0, epsilon = 1e-9);
        assert_relative_eq!(estimate(&level, &mag(-1.0, 0.0)).heading_deg, 180.0, epsilon = 1e-9);
        assert_relative_eq!(estimate(&level, &mag(0.0, -1.0)).heading_deg, 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_always_in_range() {
        let level = accel(0.0, 0.0, 1.0);
        for deg in (0..360).step_by(15) {
            let rad = (deg as f64).to_radians();
            let est = estimate(&level, &mag(rad.cos(), rad.sin()));
            assert!(est.heading_deg >= 0.0 && est.heading_deg < 360.0);
            assert_relative_eq!(est.heading_deg, deg as f64, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_roll_and_pitch_tilts() {
        // Lying on its side: gravity fully on Y
        let est = estimate(&accel(0.0, 1.0, 0.0), &mag(1.0, 0.0));
        assert_relative_eq!(est.roll_deg, 90.0, epsilon = 1e-9);

        // Nose down: gravity fully on -X gives +90 pitch
        let est = estimate(&accel(-1.0, 0.0, 0.0), &mag(1.0, 0.0));
        assert_relative_eq!(est.pitch_deg, 90.0, epsilon = 1e-9);

        // 45 degree roll
        let g = std::f64::consts::FRAC_1_SQRT_2;
        let est = estimate(&accel(0.0, g, g), &mag(1.0, 0.0));
        assert_relative_eq!(est.roll_deg, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_input_is_tagged_invalid() {
        let est = estimate(&accel(f64::NAN, 0.0, 1.0), &mag(1.0, 0.0));
        assert!(!est.valid);
        let est = estimate(&accel(0.0, 0.0, 1.0), &mag(f64::INFINITY, 0.0));
        assert!(!est.valid);
    }

    #[test]
    fn test_estimate_is_stateless() {
        let a = accel(0.1, -0.2, 0.95);
        let m = mag(800.0, -300.0);
        let first = estimate(&a, &m);
        let second = estimate(&a, &m);
        assert_eq!(first.roll_deg, second.roll_deg);
        assert_eq!(first.pitch_deg, second.pitch_deg);
        assert_eq!(first.heading_deg, second.heading_deg);
    }
}
