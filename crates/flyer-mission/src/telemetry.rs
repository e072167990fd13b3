use serde::{Deserialize, Serialize};

/// Position in the local north-east-down frame, metres from home.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub north: f64,
    pub east: f64,
    /// Positive downward.
    pub down: f64,
}

impl LocalPosition {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }

    /// Height above the home point.
    pub fn altitude(&self) -> f64 {
        -self.down
    }
}

/// Position in the global frame (degrees, degrees, metres).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl GlobalPosition {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self { longitude, latitude, altitude }
    }

    /// The autopilot reports zeros until it has a position; any exact zero
    /// component means home is not resolved yet.
    pub fn is_resolved(&self) -> bool {
        self.longitude != 0.0 && self.latitude != 0.0 && self.altitude != 0.0
    }
}

/// Local-frame velocity, m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity3 {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

impl Velocity3 {
    pub fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }
}

/// Latest telemetry from the vehicle. The link writes it; the mission only reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub local_position: LocalPosition,
    pub global_position: GlobalPosition,
    pub local_velocity: Velocity3,
    pub armed: bool,
    pub guided: bool,
}

/// Telemetry change notifications delivered to the mission, one per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    LocalPositionChanged,
    LocalVelocityChanged,
    /// Armed or guided flag reported (every vehicle heartbeat).
    StateChanged,
}
