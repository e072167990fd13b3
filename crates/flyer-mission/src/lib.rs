pub mod doctor;
pub mod gateway;
pub mod mission;
pub mod planner;
pub mod telemetry;

use serde::Deserialize;

pub use gateway::CommandGateway;
pub use mission::{FlightState, Mission, Transition};
pub use planner::{compute_box, Waypoint};
pub use telemetry::{GlobalPosition, LocalPosition, TelemetryEvent, TelemetrySnapshot, Velocity3};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionCfg {
    /// Box altitude above home, metres.
    pub cruise_alt_m: f64,

    /// Navigation log location, relative to the working directory.
    pub log_dir: String,
    pub log_file: String,
}

impl Default for MissionCfg {
    fn default() -> Self {
        Self {
            cruise_alt_m: planner::DEFAULT_CRUISE_ALT_M,
            log_dir: "Logs".into(),
            log_file: "NavLog.txt".into(),
        }
    }
}
