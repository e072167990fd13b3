pub mod connection;
pub mod doctor;
pub mod driver;
pub mod mav;
pub mod navlog;
pub mod state;
pub mod telemetry;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FcConfig {
    /// TCP endpoint of the autopilot (SITL listens on 5760).
    pub host: String,
    pub port: u16,

    /// When set, connect over serial instead of TCP.
    pub serial_dev: Option<String>,
    pub baud: Option<u32>,

    /// MAVLink ids we use (controller side). 255 is the usual GCS id.
    pub sys_id: u8,
    pub comp_id: u8,

    /// target system/component (FC side). 1/1 is common for ArduPilot.
    pub target_sys: u8,
    pub target_comp: u8,

    /// Require seeing FC heartbeat before sending commands
    pub require_heartbeat: bool,

    /// Controller heartbeat send rate. Default 1Hz.
    pub send_heartbeat_hz: Option<f32>,

    /// Requested telemetry stream rate. Default 10Hz.
    pub stream_rate_hz: Option<u16>,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5760,
            serial_dev: None,
            baud: None,
            sys_id: 255,
            comp_id: 190,
            target_sys: 1,
            target_comp: 1,
            require_heartbeat: true,
            send_heartbeat_hz: None,
            stream_rate_hz: None,
        }
    }
}

impl FcConfig {
    pub fn endpoint(&self) -> Endpoint {
        match &self.serial_dev {
            Some(dev) => Endpoint::Serial { dev: dev.clone(), baud: self.baud.unwrap_or(57600) },
            None => Endpoint::Tcp { host: self.host.clone(), port: self.port },
        }
    }

    pub fn heartbeat_hz(&self) -> f32 {
        self.send_heartbeat_hz.unwrap_or(1.0).max(0.2)
    }

    pub fn stream_rate(&self) -> u16 {
        self.stream_rate_hz.unwrap_or(10).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Serial { dev: String, baud: u32 },
}

impl Endpoint {
    /// Address in the form `mavlink::connect` expects.
    pub fn url(&self) -> String {
        match self {
            Endpoint::Tcp { host, port } => format!("tcpout:{}:{}", host, port),
            Endpoint::Serial { dev, baud } => format!("serial:{}:{}", dev, baud),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp {}:{}", host, port),
            Endpoint::Serial { dev, baud } => write!(f, "serial {} @ {}", dev, baud),
        }
    }
}
