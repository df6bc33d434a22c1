use std::fs;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::orientation::OrientationEstimate;
use crate::ranging::NO_ECHO;
use crate::sensors::{AccelSample, EnvSample, GpsFix, MagSample};
use crate::terrain::{TerrainClass, TerrainStats};

/// Handle the transport side reads through. All writes happen in the
/// scheduler task, except the deploy/reset control routes.
pub type SharedTelemetry = Arc<RwLock<TelemetrySnapshot>>;

/// Most-recently-known mission state.
///
/// Each producer group carries its own last-updated stamp (mission ms), so a
/// consumer can see that the orientation is newer than the terrain or vice
/// versa. Mixed-epoch reads are expected, not a bug.
#[derive(Clone, Debug)]
pub struct TelemetrySnapshot {
    pub orientation: OrientationEstimate,
    pub accel: AccelSample,
    pub mag: MagSample,
    pub environment: EnvSample,
    pub gps: GpsFix,
    pub distances_cm: Vec<f64>,
    pub terrain_stats: TerrainStats,
    pub terrain_class: TerrainClass,
    pub mission_time_ms: u64,
    pub parachute_deployed: bool,
    pub mission_status: String,
    pub orientation_updated_ms: u64,
    pub terrain_updated_ms: u64,
    pub env_updated_ms: u64,
    pub gps_updated_ms: u64,
}

impl TelemetrySnapshot {
    pub fn new(channel_count: usize) -> Self {
        Self {
            orientation: OrientationEstimate::default(),
            accel: AccelSample::default(),
            mag: MagSample::default(),
            environment: EnvSample::default(),
            gps: GpsFix::default(),
            distances_cm: vec![NO_ECHO; channel_count],
            terrain_stats: TerrainStats::default(),
            terrain_class: TerrainClass::NoData,
            mission_time_ms: 0,
            parachute_deployed: false,
            mission_status: "INITIALIZING".to_string(),
            orientation_updated_ms: 0,
            terrain_updated_ms: 0,
            env_updated_ms: 0,
            gps_updated_ms: 0,
        }
    }

    pub fn update_orientation(
        &mut self,
        estimate: OrientationEstimate,
        accel: AccelSample,
        mag: MagSample,
        now_ms: u64,
    ) {
        // An invalid estimate keeps the previous good angles on the wire;
        // the raw samples still go out for diagnostics.
        if estimate.valid {
            self.orientation = estimate;
        }
        self.accel = accel;
        self.mag = mag;
        self.orientation_updated_ms = now_ms;
    }

    pub fn update_terrain(
        &mut self,
        distances_cm: Vec<f64>,
        stats: TerrainStats,
        class: TerrainClass,
        now_ms: u64,
    ) {
        self.distances_cm = distances_cm;
        self.terrain_stats = stats;
        self.terrain_class = class;
        self.terrain_updated_ms = now_ms;
    }

    pub fn update_environment(&mut self, env: EnvSample, now_ms: u64) {
        self.environment = env;
        self.env_updated_ms = now_ms;
    }

    pub fn update_gps(&mut self, fix: GpsFix, now_ms: u64) {
        self.gps = fix;
        self.gps_updated_ms = now_ms;
    }

    /// Project the snapshot onto the wire record.
    pub fn record(&self) -> TelemetryRecord {
        TelemetryRecord {
            temp: self.environment.temperature_c,
            hum: self.environment.humidity_pct,
            hdg: self.orientation.heading_deg,
            roll: self.orientation.roll_deg,
            pitch: self.orientation.pitch_deg,
            ax: self.accel.x,
            ay: self.accel.y,
            az: self.accel.z,
            time: self.mission_time_ms,
            chute: self.parachute_deployed,
            lat: self.gps.latitude,
            lon: self.gps.longitude,
            gps_alt: self.gps.altitude_m,
            gps_spd: self.gps.speed_kmh,
            gps_sat: self.gps.satellites,
            gps_valid: self.gps.valid,
            distances: self.distances_cm.clone(),
            min: self.terrain_stats.min_cm,
            max: self.terrain_stats.max_cm,
            var: self.terrain_stats.variance,
            status: self.terrain_class.as_str().to_string(),
        }
    }

    /// One serial frame for the ground viewer: `TERRAIN:{"s0":...,"status":...}`.
    pub fn terrain_frame(&self) -> String {
        let mut map = Map::new();
        for (i, d) in self.distances_cm.iter().enumerate() {
            map.insert(format!("s{i}"), json!(d));
        }
        map.insert("min".to_string(), json!(self.terrain_stats.min_cm));
        map.insert("max".to_string(), json!(self.terrain_stats.max_cm));
        map.insert("var".to_string(), json!(self.terrain_stats.variance));
        map.insert("status".to_string(), json!(self.terrain_class.as_str()));
        format!("TERRAIN:{}", Value::Object(map))
    }
}

/// Flat machine-readable record. Field names and units are frozen for the
/// existing dashboard and log consumers: cm for distances, degrees for
/// angles, g for accelerations, ms for mission time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub temp: f64,
    pub hum: f64,
    pub hdg: f64,
    pub roll: f64,
    pub pitch: f64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub time: u64,
    pub chute: bool,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "gpsAlt")]
    pub gps_alt: f64,
    #[serde(rename = "gpsSpd")]
    pub gps_spd: f64,
    #[serde(rename = "gpsSat")]
    pub gps_sat: u32,
    #[serde(rename = "gpsValid")]
    pub gps_valid: bool,
    pub distances: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub var: f64,
    pub status: String,
}

impl TelemetryRecord {
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
