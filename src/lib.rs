//! Flight software for a can-sized descending payload: orientation from a
//! raw accel/mag pair, an ultrasonic ranging array swept behind one shared
//! trigger line, terrain-safety classification over each sweep, and a
//! telemetry snapshot served to the ground station.

pub mod dashboard;
pub mod orientation;
pub mod ranging;
pub mod release;
pub mod sensors;
pub mod telemetry;
pub mod terrain;
