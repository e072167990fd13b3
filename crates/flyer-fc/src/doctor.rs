use anyhow::Result;
use crate::{Endpoint, FcConfig};

pub fn check_link(fc: &FcConfig) -> Result<()> {
    match fc.endpoint() {
        Endpoint::Tcp { host, port } => {
            anyhow::ensure!(!host.is_empty(), "fc.host missing");
            anyhow::ensure!(port > 0, "fc.port invalid");
        }
        Endpoint::Serial { dev, baud } => {
            anyhow::ensure!(!dev.is_empty(), "fc.serial_dev empty");
            anyhow::ensure!(baud > 0, "fc.baud invalid");
        }
    }
    anyhow::ensure!(fc.sys_id != fc.target_sys, "fc.sys_id must differ from fc.target_sys");
    if let Some(hz) = fc.send_heartbeat_hz {
        anyhow::ensure!(hz >= 0.2 && hz <= 10.0, "fc.send_heartbeat_hz should be 0.2..10");
    }
    if let Some(hz) = fc.stream_rate_hz {
        anyhow::ensure!(hz >= 1 && hz <= 50, "fc.stream_rate_hz should be 1..50");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_link_ok() {
        check_link(&FcConfig::default()).unwrap();
    }

    #[test]
    fn same_system_id_rejected() {
        let fc = FcConfig { sys_id: 1, ..FcConfig::default() };
        assert!(check_link(&fc).is_err());
    }

    #[test]
    fn zero_port_rejected() {
        let fc = FcConfig { port: 0, ..FcConfig::default() };
        assert!(check_link(&fc).is_err());
    }

    #[test]
    fn stream_rate_bounds() {
        let fc = FcConfig { stream_rate_hz: Some(200), ..FcConfig::default() };
        assert!(check_link(&fc).is_err());
    }
}
