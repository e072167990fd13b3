use anyhow::{Context, Result};
use flyer_mission::CommandGateway;
use mavlink::{
    common::{
        MavAutopilot, MavCmd, MavFrame, MavMessage, MavModeFlag, MavState, MavType,
        PositionTargetTypemask, COMMAND_INT_DATA, COMMAND_LONG_DATA, HEARTBEAT_DATA,
        REQUEST_DATA_STREAM_DATA, SET_POSITION_TARGET_LOCAL_NED_DATA,
    },
    error::MessageReadError,
    MavConnection, MavHeader,
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::connection::StopHandle;
use crate::{Endpoint, FcConfig};

/// ArduCopter custom modes used for taking and releasing control.
const COPTER_MODE_STABILIZE: f32 = 0.0;
const COPTER_MODE_GUIDED: f32 = 4.0;

/// MAV_DATA_STREAM_ALL
const DATA_STREAM_ALL: u8 = 0;

/// What the event loop needs from a vehicle connection.
pub trait VehicleLink: CommandGateway {
    /// Next message from the vehicle. `Ok(None)` for frames that did not
    /// decode; `Err` once the connection is gone.
    fn recv(&mut self) -> Result<Option<(MavHeader, MavMessage)>>;
    fn send_heartbeat(&mut self) -> Result<()>;
    fn request_streams(&mut self, rate_hz: u16) -> Result<()>;
    fn target_sys(&self) -> u8;
    fn stop_handle(&self) -> StopHandle;
}

pub struct FcLink {
    conn: Box<dyn MavConnection<MavMessage> + Send + Sync>,
    hdr: MavHeader,
    endpoint: Endpoint,
    target_sys: u8,
    target_comp: u8,
    seen_heartbeat: bool,
    require_heartbeat: bool,
    stop: StopHandle,
}

impl FcLink {
    pub fn open(cfg: &FcConfig) -> Result<Self> {
        let endpoint = cfg.endpoint();
        if let Endpoint::Serial { dev, baud } = &endpoint {
            // quick validate device
            let _ = tokio_serial::new(dev.as_str(), *baud)
                .open_native_async()
                .with_context(|| format!("open fc serial device {}", dev))?;
        }

        let url = endpoint.url();
        let conn = mavlink::connect::<MavMessage>(&url)
            .with_context(|| format!("mavlink connect {}", url))?;
        info!("fc: connected to {}", endpoint);

        Ok(Self {
            conn,
            hdr: MavHeader { system_id: cfg.sys_id, component_id: cfg.comp_id, sequence: 0 },
            endpoint,
            target_sys: cfg.target_sys,
            target_comp: cfg.target_comp,
            seen_heartbeat: false,
            require_heartbeat: cfg.require_heartbeat,
            stop: StopHandle::new(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn command_long(&mut self, command: MavCmd, params: [f32; 7]) -> Result<()> {
        self.ensure_ready(&format!("{:?}", command))?;
        let cmd = COMMAND_LONG_DATA {
            target_system: self.target_sys,
            target_component: self.target_comp,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        };
        debug!("fc: sending {:?}", command);
        self.send(MavMessage::COMMAND_LONG(cmd))
    }

    fn ensure_ready(&self, what: &str) -> Result<()> {
        if self.require_heartbeat && !self.seen_heartbeat {
            anyhow::bail!("refusing {}: no heartbeat seen yet", what);
        }
        Ok(())
    }

    fn set_mode(&mut self, custom_mode: f32) -> Result<()> {
        let flag = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits() as f32;
        self.command_long(MavCmd::MAV_CMD_DO_SET_MODE, [flag, custom_mode, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    fn send(&mut self, msg: MavMessage) -> Result<()> {
        self.hdr.sequence = self.hdr.sequence.wrapping_add(1);
        self.conn.send(&self.hdr, &msg).context("mavlink send")?;
        Ok(())
    }
}

impl VehicleLink for FcLink {
    fn recv(&mut self) -> Result<Option<(MavHeader, MavMessage)>> {
        match self.conn.recv() {
            Ok((hdr, msg)) => {
                if hdr.system_id == self.target_sys && matches!(msg, MavMessage::HEARTBEAT(_)) {
                    self.seen_heartbeat = true;
                }
                Ok(Some((hdr, msg)))
            }
            Err(MessageReadError::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(MessageReadError::Io(e)) => Err(e).context("mavlink recv"),
            Err(e) => {
                debug!("fc: dropping undecodable frame: {:?}", e);
                Ok(None)
            }
        }
    }

    fn send_heartbeat(&mut self) -> Result<()> {
        let hb = HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_GCS,
            autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
            base_mode: MavModeFlag::empty(),
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        };
        self.send(MavMessage::HEARTBEAT(hb))
    }

    fn request_streams(&mut self, rate_hz: u16) -> Result<()> {
        let req = REQUEST_DATA_STREAM_DATA {
            req_message_rate: rate_hz,
            target_system: self.target_sys,
            target_component: self.target_comp,
            req_stream_id: DATA_STREAM_ALL,
            start_stop: 1,
        };
        info!("fc: requesting telemetry at {}Hz", rate_hz);
        self.send(MavMessage::REQUEST_DATA_STREAM(req))
    }

    fn target_sys(&self) -> u8 {
        self.target_sys
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

impl CommandGateway for FcLink {
    fn take_control(&mut self) -> Result<()> {
        info!("fc: taking control (GUIDED)");
        self.set_mode(COPTER_MODE_GUIDED)
    }

    fn release_control(&mut self) -> Result<()> {
        info!("fc: releasing control (STABILIZE)");
        self.set_mode(COPTER_MODE_STABILIZE)
    }

    fn arm(&mut self) -> Result<()> {
        info!("fc: sending ARM");
        self.command_long(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    fn disarm(&mut self) -> Result<()> {
        info!("fc: sending DISARM");
        self.command_long(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, [0.0; 7])
    }

    fn set_home_position(&mut self, longitude: f64, latitude: f64, altitude: f64) -> Result<()> {
        self.ensure_ready("MAV_CMD_DO_SET_HOME")?;
        // COMMAND_INT keeps full 1e-7 degree precision for lat/lon
        let cmd = COMMAND_INT_DATA {
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            x: (latitude * 1e7).round() as i32,
            y: (longitude * 1e7).round() as i32,
            z: altitude as f32,
            command: MavCmd::MAV_CMD_DO_SET_HOME,
            target_system: self.target_sys,
            target_component: self.target_comp,
            frame: MavFrame::MAV_FRAME_GLOBAL,
            current: 0,
            autocontinue: 0,
        };
        info!("fc: setting home lat={:.7} lon={:.7} alt={:.1}", latitude, longitude, altitude);
        self.send(MavMessage::COMMAND_INT(cmd))
    }

    fn takeoff(&mut self, altitude: f64) -> Result<()> {
        info!("fc: sending TAKEOFF to {:.1}m", altitude);
        self.command_long(
            MavCmd::MAV_CMD_NAV_TAKEOFF,
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, altitude as f32],
        )
    }

    fn fly_to(&mut self, north: f64, east: f64, altitude: f64, heading: f64) -> Result<()> {
        self.ensure_ready("SET_POSITION_TARGET_LOCAL_NED")?;
        let target = SET_POSITION_TARGET_LOCAL_NED_DATA {
            time_boot_ms: 0,
            x: north as f32,
            y: east as f32,
            z: -altitude as f32,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            afx: 0.0,
            afy: 0.0,
            afz: 0.0,
            yaw: heading as f32,
            yaw_rate: 0.0,
            type_mask: position_and_yaw_only(),
            target_system: self.target_sys,
            target_component: self.target_comp,
            coordinate_frame: MavFrame::MAV_FRAME_LOCAL_NED,
        };
        info!("fc: position target n={:.1} e={:.1} alt={:.1}", north, east, altitude);
        self.send(MavMessage::SET_POSITION_TARGET_LOCAL_NED(target))
    }

    fn land(&mut self) -> Result<()> {
        info!("fc: sending LAND");
        self.command_long(MavCmd::MAV_CMD_NAV_LAND, [0.0; 7])
    }

    fn stop(&mut self) -> Result<()> {
        info!("fc: stopping event loop");
        self.stop.stop();
        Ok(())
    }
}

fn position_and_yaw_only() -> PositionTargetTypemask {
    PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VY_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typemask_keeps_position_and_yaw() {
        let mask = position_and_yaw_only();
        assert!(!mask.contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_X_IGNORE));
        assert!(!mask.contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE));
        assert!(mask.contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE));
        assert!(mask.contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE));
    }
}
