//! Folds vehicle MAVLink traffic into a [`TelemetrySnapshot`].
//!
//! Each update reports which telemetry kinds changed (for the mission) and
//! what to write to the navigation log.

use flyer_mission::{GlobalPosition, LocalPosition, TelemetryEvent, TelemetrySnapshot, Velocity3};
use flyer_proto::navlog::LogRecord;
use mavlink::common::{MavAutopilot, MavMessage, MavModeFlag};

#[derive(Debug, Default, PartialEq)]
pub struct Update {
    pub events: Vec<TelemetryEvent>,
    pub records: Vec<LogRecord>,
}

pub fn apply(tel: &mut TelemetrySnapshot, msg: &MavMessage) -> Update {
    let mut up = Update::default();
    match msg {
        MavMessage::HEARTBEAT(hb) => {
            // gimbals, cameras and other GCSes also heartbeat
            if hb.autopilot == MavAutopilot::MAV_AUTOPILOT_INVALID {
                return up;
            }
            tel.armed = hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
            tel.guided = hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_GUIDED_ENABLED);
            up.events.push(TelemetryEvent::StateChanged);
            up.records.push(LogRecord::State { armed: tel.armed, guided: tel.guided });
        }
        MavMessage::LOCAL_POSITION_NED(p) => {
            tel.local_position = LocalPosition::new(p.x as f64, p.y as f64, p.z as f64);
            tel.local_velocity = Velocity3::new(p.vx as f64, p.vy as f64, p.vz as f64);
            up.events.push(TelemetryEvent::LocalPositionChanged);
            up.events.push(TelemetryEvent::LocalVelocityChanged);
            let (l, v) = (tel.local_position, tel.local_velocity);
            up.records.push(LogRecord::LocalPosition { north: l.north, east: l.east, down: l.down });
            up.records.push(LogRecord::LocalVelocity { north: v.north, east: v.east, down: v.down });
        }
        MavMessage::GLOBAL_POSITION_INT(g) => {
            tel.global_position = GlobalPosition::new(
                g.lon as f64 / 1e7,
                g.lat as f64 / 1e7,
                g.alt as f64 / 1000.0,
            );
            let gp = tel.global_position;
            up.records.push(LogRecord::GlobalPosition {
                longitude: gp.longitude,
                latitude: gp.latitude,
                altitude: gp.altitude,
            });
        }
        _ => {}
    }
    up
}
