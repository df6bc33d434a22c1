//! Offline terrain-scanner demo: sweeps a simulated undulating surface and
//! prints the same `TERRAIN:` frames the flight build puts on the serial
//! line, so the 3D ground viewer can be exercised without hardware.

use cansat_telemetry_rs::ranging::{descent_terrain, ArrayConfig, RangerArray, SimulatedRanging};
use cansat_telemetry_rs::telemetry::TelemetrySnapshot;
use cansat_telemetry_rs::terrain::{self, TerrainThresholds};

fn main() {
    let sweeps: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    let config = ArrayConfig::five_sensor();
    let thresholds = TerrainThresholds::default();
    let mut ranger = RangerArray::new(SimulatedRanging::new(vec![]), config.clone());
    let mut snapshot = TelemetrySnapshot::new(config.channel_count());

    println!("=== Terrain Scanner Demo ({} sweeps) ===\n", sweeps);

    for i in 0..sweeps {
        let t = i as f64 * 0.8;
        ranger.timer_mut().set_distances(descent_terrain(t, config.channel_count()));

        let sweep = ranger.sweep();
        let (stats, class) = terrain::evaluate(&sweep, &thresholds);
        snapshot.update_terrain(sweep, stats, class, (t * 1000.0) as u64);

        println!("{}", snapshot.terrain_frame());
        println!(
            "  sweep {:>3}: valid {}/{} | range {:.1}cm | var {:.1} | {}",
            i + 1,
            stats.valid_count,
            config.channel_count(),
            stats.range_cm(),
            stats.variance,
            class.as_str()
        );
    }

    println!("\nSimulated bus time: {:.1}ms", ranger.timer_mut().clock_us() as f64 / 1000.0);
}
