/// Parachute release logic. The servo itself lives behind a GPIO
/// collaborator; this only decides *when* and exposes the deployed flag the
/// telemetry publishes as `chute`.
#[derive(Clone, Debug)]
pub struct ReleaseController {
    release_altitude_m: f64,
    armed: bool,
    deployed: bool,
}

impl ReleaseController {
    pub fn new(release_altitude_m: f64) -> Self {
        Self {
            release_altitude_m,
            armed: true,
            deployed: false,
        }
    }

    pub fn deployed(&self) -> bool {
        self.deployed
    }

    /// Manual deploy from the ground-station button. Idempotent.
    pub fn deploy(&mut self) {
        self.deployed = true;
    }

    /// Re-arm after a ground test.
    pub fn reset(&mut self) {
        self.deployed = false;
        self.armed = true;
    }

    /// Altitude-threshold check, fed from each valid GPS fix.
    ///
    /// Returns true exactly once, on the descent edge through the release
    /// altitude. A zero/negative altitude is a bad fix, not the ground.
    pub fn update_altitude(&mut self, altitude_m: f64, fix_valid: bool) -> bool {
        if !fix_valid || self.deployed || !self.armed {
            return false;
        }
        if altitude_m > 0.0 && altitude_m <= self.release_altitude_m {
            self.deployed = true;
            self.armed = false;
            return true;
        }
        false
    }
}
