use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep, Duration};

use cansat_telemetry_rs::dashboard::{start_dashboard, DashboardState};
use cansat_telemetry_rs::orientation;
use cansat_telemetry_rs::ranging::{descent_terrain, ArrayConfig, RangerArray, SimulatedRanging};
use cansat_telemetry_rs::release::ReleaseController;
use cansat_telemetry_rs::sensors::{self, EnvSample, GpsFix, ImuFrame};
use cansat_telemetry_rs::telemetry::TelemetrySnapshot;
use cansat_telemetry_rs::terrain::{self, TerrainThresholds};

#[derive(Parser, Debug)]
#[command(name = "cansat_telemetry")]
#[command(about = "CanSat flight telemetry - orientation, terrain scan, ground station", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Ground-station HTTP port
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Milliseconds between terrain sweeps
    #[arg(long, default_value = "1000")]
    ranging_interval_ms: u64,

    /// Auto-deploy the parachute below this GPS altitude (meters)
    #[arg(long, default_value = "150.0")]
    release_altitude: f64,

    /// Output directory for status and session files
    #[arg(long, default_value = "cansat_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::info!("CanSat telemetry starting");
    log::info!("  duration: {}s (0=continuous)", args.duration);
    log::info!("  ranging interval: {}ms", args.ranging_interval_ms);
    log::info!("  release altitude: {}m", args.release_altitude);
    log::info!("  output dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let config = ArrayConfig::five_sensor();
    let thresholds = TerrainThresholds::default();

    // The scheduler task owns the array, and with it the shared trigger
    // line; sweeps are strictly sequential because nothing else can reach it.
    let mut ranger = RangerArray::new(SimulatedRanging::new(vec![]), config.clone());

    let telemetry = Arc::new(RwLock::new(TelemetrySnapshot::new(config.channel_count())));
    let release = Arc::new(RwLock::new(ReleaseController::new(args.release_altitude)));

    let (imu_tx, mut imu_rx) = mpsc::channel::<ImuFrame>(500);
    let (env_tx, mut env_rx) = mpsc::channel::<EnvSample>(50);
    let (gps_tx, mut gps_rx) = mpsc::channel::<GpsFix>(100);

    let _imu_handle = tokio::spawn(sensors::imu_loop(imu_tx));
    let _env_handle = tokio::spawn(sensors::env_loop(env_tx));
    let _gps_handle = tokio::spawn(sensors::gps_loop(gps_tx));

    let _dashboard_handle = tokio::spawn(start_dashboard(
        DashboardState {
            telemetry: telemetry.clone(),
            release: release.clone(),
        },
        args.port,
    ));

    let start = Instant::now();
    let mut last_sweep_ms = 0u64;
    let mut last_status_ms = 0u64;
    let mut sweep_count = 0u64;
    let mut frame_count = 0u64;

    {
        let mut snapshot = telemetry.write().await;
        snapshot.mission_status = "RUNNING".to_string();
    }
    log::info!("mission started");

    loop {
        let now_ms = start.elapsed().as_millis() as u64;

        if args.duration > 0 && now_ms >= args.duration * 1000 {
            log::info!("duration reached, stopping");
            break;
        }

        // Orientation cycle: one estimate per matched accel/mag frame
        while let Ok(frame) = imu_rx.try_recv() {
            let estimate = orientation::estimate(&frame.accel, &frame.mag);
            if !estimate.valid {
                log::warn!("[imu] non-finite bus sample, keeping previous orientation");
            }
            let mut snapshot = telemetry.write().await;
            snapshot.mission_time_ms = now_ms;
            snapshot.update_orientation(estimate, frame.accel, frame.mag, now_ms);
            frame_count += 1;
        }

        while let Ok(env) = env_rx.try_recv() {
            let mut snapshot = telemetry.write().await;
            snapshot.mission_time_ms = now_ms;
            snapshot.update_environment(env, now_ms);
        }

        while let Ok(fix) = gps_rx.try_recv() {
            let fired = release
                .write()
                .await
                .update_altitude(fix.altitude_m, fix.valid);
            let mut snapshot = telemetry.write().await;
            snapshot.mission_time_ms = now_ms;
            snapshot.update_gps(fix, now_ms);
            if fired {
                snapshot.parachute_deployed = true;
                snapshot.mission_status = "PARACHUTE DEPLOYED".to_string();
                log::warn!(
                    "[release] altitude {}m below threshold, parachute deployed",
                    fix.altitude_m
                );
            }
        }

        // Terrain sweep on its own cadence, independent of the orientation
        // cycle; the two interleave at whatever alignment falls out.
        if now_ms.saturating_sub(last_sweep_ms) >= args.ranging_interval_ms || sweep_count == 0 {
            let t = now_ms as f64 / 1000.0;
            let profile = descent_terrain(t, config.channel_count());
            ranger.timer_mut().set_distances(profile);

            let sweep = ranger.sweep();
            let (stats, class) = terrain::evaluate(&sweep, &thresholds);

            let mut snapshot = telemetry.write().await;
            snapshot.mission_time_ms = now_ms;
            snapshot.update_terrain(sweep, stats, class, now_ms);

            // Serial frame for the terrain viewer; stdout is the wire here
            println!("{}", snapshot.terrain_frame());
            drop(snapshot);

            sweep_count += 1;
            last_sweep_ms = now_ms;
        }

        if now_ms.saturating_sub(last_status_ms) >= 2000 {
            let snapshot = telemetry.read().await;
            let record = snapshot.record();
            log::info!(
                "T:{:.1}s | Temp:{:.1}C | Hum:{:.1}% | Hdg:{:.1} | Terrain:{} | Alt:{:.0}m",
                now_ms as f64 / 1000.0,
                record.temp,
                record.hum,
                record.hdg,
                record.status,
                record.gps_alt,
            );
            drop(snapshot);

            let status_path = format!("{}/live_status.json", args.output_dir);
            if let Err(e) = record.save(&status_path) {
                log::warn!("failed to save live status: {e}");
            }
            last_status_ms = now_ms;
        }

        sleep(Duration::from_millis(10)).await;
    }

    // Final session save
    let record = telemetry.read().await.record();
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let session_path = format!("{}/session_{}.json", args.output_dir, stamp);
    record.save(&session_path)?;

    println!("\n=== Final Stats ===");
    println!("Mission time: {:.1}s", record.time as f64 / 1000.0);
    println!("Orientation frames: {}", frame_count);
    println!("Terrain sweeps: {}", sweep_count);
    println!("Last terrain: {}", record.status);
    println!("Session saved to {}", session_path);

    Ok(())
}
