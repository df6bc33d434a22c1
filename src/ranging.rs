use serde::{Deserialize, Serialize};

/// Sentinel distance for "no echo within the timeout window".
pub const NO_ECHO: f64 = -1.0;

/// Trigger held low before the pulse (µs).
pub const TRIGGER_LOW_US: u64 = 2;
/// Trigger pulse width (µs), per the HC-SR04 datasheet.
pub const TRIGGER_PULSE_US: u64 = 10;
/// Echo wait ceiling (µs); ~5m of round trip.
pub const ECHO_TIMEOUT_US: u64 = 30_000;
/// Wait between channels so one sensor's pulse dies out before the next
/// sensor fires. Dropping this lets a channel hear its neighbor's echo.
pub const SETTLING_DELAY_MS: u64 = 30;
/// Speed of sound, cm per µs.
pub const CM_PER_US: f64 = 0.0343;

/// Convert an echo round-trip duration to one-way distance in cm.
pub fn duration_to_cm(duration_us: u64) -> f64 {
    duration_us as f64 * CM_PER_US / 2.0
}

/// Ground-plane offset of one sensor, used by surface renderers only; the
/// classifier never reads it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub x: f64,
    pub y: f64,
}

/// Static description of the sensor array.
#[derive(Clone, Debug)]
pub struct ArrayConfig {
    pub channels: Vec<ChannelLayout>,
    pub echo_timeout_us: u64,
    pub settling_delay_ms: u64,
}

impl ArrayConfig {
    /// The flight layout: one center sensor and four corners.
    pub fn five_sensor() -> Self {
        Self {
            channels: vec![
                ChannelLayout { x: 0.0, y: 0.0 },
                ChannelLayout { x: -1.0, y: 1.0 },
                ChannelLayout { x: 1.0, y: 1.0 },
                ChannelLayout { x: -1.0, y: -1.0 },
                ChannelLayout { x: 1.0, y: -1.0 },
            ],
            echo_timeout_us: ECHO_TIMEOUT_US,
            settling_delay_ms: SETTLING_DELAY_MS,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Timing collaborator for the array. One shared trigger line, one echo line
/// per channel. Implementations must block until each operation completes;
/// the driver relies on that to keep channels from cross-talking.
pub trait PulseTimer {
    /// Drive the shared trigger low for `low_us`, then high for `high_us`.
    fn pulse_trigger(&mut self, low_us: u64, high_us: u64);
    /// Measure the high time of `channel`'s echo line. `None` on timeout.
    fn measure_echo(&mut self, channel: usize, timeout_us: u64) -> Option<u64>;
    /// Inter-channel settling wait.
    fn settle_ms(&mut self, ms: u64);
}

/// Sequences the ultrasonic channels behind the shared trigger line.
///
/// Owns the `PulseTimer` outright: whoever holds the array holds the trigger
/// line, so a sweep can never interleave with another measurement.
pub struct RangerArray<T: PulseTimer> {
    timer: T,
    config: ArrayConfig,
}

impl<T: PulseTimer> RangerArray<T> {
    pub fn new(timer: T, config: ArrayConfig) -> Self {
        Self { timer, config }
    }

    pub fn config(&self) -> &ArrayConfig {
        &self.config
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Run one complete sweep, visiting channels in index order.
    ///
    /// A timed-out channel records the -1 sentinel and is not retried; the
    /// next scheduled sweep re-attempts naturally.
    pub fn sweep(&mut self) -> Vec<f64> {
        let n = self.config.channel_count();
        let mut distances = Vec::with_capacity(n);

        for channel in 0..n {
            self.timer.pulse_trigger(TRIGGER_LOW_US, TRIGGER_PULSE_US);
            let sample = match self.timer.measure_echo(channel, self.config.echo_timeout_us) {
                Some(duration_us) => duration_to_cm(duration_us),
                None => NO_ECHO,
            };
            distances.push(sample);
            self.timer.settle_ms(self.config.settling_delay_ms);
        }

        distances
    }
}

/// One entry in the simulated timing log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimingEvent {
    /// Trigger pulse issued; `at_us` is the start of the low preamble.
    Trigger { at_us: u64 },
    /// Echo measurement finished. `duration_us` is `None` on timeout.
    Echo {
        channel: usize,
        at_us: u64,
        duration_us: Option<u64>,
    },
    /// Settling wait finished.
    Settle { at_us: u64, ms: u64 },
}

/// Software stand-in for the trigger/echo wiring.
///
/// Echo durations come from a per-channel distance profile; the virtual clock
/// advances exactly as the hardware contract would (pulse widths, echo round
/// trips, timeouts, settling), and every operation lands in `log` so tests
/// can audit the sequencing.
pub struct SimulatedRanging {
    clock_us: u64,
    distances_cm: Vec<f64>,
    pub log: Vec<TimingEvent>,
}

impl SimulatedRanging {
    pub fn new(distances_cm: Vec<f64>) -> Self {
        Self {
            clock_us: 0,
            distances_cm,
            log: Vec::new(),
        }
    }

    /// Replace the terrain the sensors will see on the next sweep.
    pub fn set_distances(&mut self, distances_cm: Vec<f64>) {
        self.distances_cm = distances_cm;
    }

    pub fn clock_us(&self) -> u64 {
        self.clock_us
    }

    /// Largest one-way distance a given timeout can report.
    fn max_range_cm(timeout_us: u64) -> f64 {
        duration_to_cm(timeout_us)
    }
}

impl PulseTimer for SimulatedRanging {
    fn pulse_trigger(&mut self, low_us: u64, high_us: u64) {
        self.log.push(TimingEvent::Trigger { at_us: self.clock_us });
        self.clock_us += low_us + high_us;
    }

    fn measure_echo(&mut self, channel: usize, timeout_us: u64) -> Option<u64> {
        let distance = self.distances_cm.get(channel).copied().unwrap_or(NO_ECHO);
        let result = if distance > 0.0 && distance <= Self::max_range_cm(timeout_us) {
            let duration_us = (distance * 2.0 / CM_PER_US).round() as u64;
            self.clock_us += duration_us;
            Some(duration_us)
        } else {
            // Out of range or no surface: the echo line never goes high and
            // the full timeout elapses.
            self.clock_us += timeout_us;
            None
        };
        self.log.push(TimingEvent::Echo {
            channel,
            at_us: self.clock_us,
            duration_us: result,
        });
        result
    }

    fn settle_ms(&mut self, ms: u64) {
        self.clock_us += ms * 1000;
        self.log.push(TimingEvent::Settle { at_us: self.clock_us, ms });
    }
}

/// Deterministic descent terrain for the simulated backend: a slowly
/// breathing base height with a tilting slope across the array, matching the
/// demo generator in the ground viewer.
pub fn descent_terrain(t_secs: f64, channel_count: usize) -> Vec<f64> {
    let base = 50.0 + 20.0 * (t_secs * 0.5).sin();
    let slope_gain = (t_secs * 0.3).sin();
    (0..channel_count)
        .map(|ch| {
            let slope = match ch {
                0 => 0.0,
                1 => -12.0,
                2 => 8.0,
                3 => -8.0,
                _ => 15.0,
            };
            (base + slope * slope_gain).clamp(2.0, 400.0)
        })
        .collect()
}
