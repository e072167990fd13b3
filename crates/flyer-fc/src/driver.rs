use anyhow::Result;
use flyer_mission::{Mission, MissionCfg};
use tracing::{info, warn};

use crate::connection::{Connection, StopHandle};
use crate::mav::VehicleLink;
use crate::navlog::NavLog;
use crate::FcConfig;

/// Owns one box mission from log open to connection close.
pub struct MissionDriver<L: VehicleLink> {
    connection: Connection<L>,
    mission: Mission,
    cfg: MissionCfg,
}

impl<L: VehicleLink> MissionDriver<L> {
    pub fn new(link: L, fc: &FcConfig, cfg: MissionCfg) -> Self {
        let connection = Connection::new(link, fc.heartbeat_hz(), fc.stream_rate())
            .with_endpoint(fc.endpoint().to_string());
        Self { connection, mission: Mission::new(cfg.cruise_alt_m), cfg }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.connection.stop_handle()
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn connection(&self) -> &Connection<L> {
        &self.connection
    }

    /// Blocks until the connection ends. The log is closed on every exit path.
    pub fn run(&mut self) -> Result<()> {
        info!("driver: creating log file");
        let mut log = NavLog::start(&self.cfg.log_dir, &self.cfg.log_file)?;

        info!("driver: starting connection");
        let res = self.connection.start(&mut self.mission, Some(&mut log));

        info!("driver: closing log file");
        let closed = log.stop();
        if let Err(e) = &closed {
            warn!("driver: {:#}", e);
        }

        if self.mission.in_mission() {
            warn!("driver: connection ended with mission incomplete ({})", self.mission.state());
        } else {
            info!("driver: mission finished in {}", self.mission.state());
        }
        res?;
        closed.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::{box_flight, heartbeat, ScriptedLink};
    use flyer_mission::FlightState;
    use flyer_proto::navlog::{LogLine, LogRecord};

    fn cfg_in(name: &str) -> MissionCfg {
        let dir = std::env::temp_dir().join(format!("flyer-driver-{}-{}", name, std::process::id()));
        MissionCfg { log_dir: dir.to_string_lossy().into_owned(), ..MissionCfg::default() }
    }

    fn read_log(cfg: &MissionCfg) -> Vec<LogLine> {
        let path = std::path::Path::new(&cfg.log_dir).join(&cfg.log_file);
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn run_flies_box_and_logs_transitions() {
        let cfg = cfg_in("box");
        let mut driver = MissionDriver::new(ScriptedLink::new(box_flight()), &FcConfig::default(), cfg.clone());
        driver.run().unwrap();
        assert_eq!(driver.mission().state(), FlightState::Disarming);

        let transitions: Vec<(String, String)> = read_log(&cfg)
            .into_iter()
            .filter_map(|l| match l.record {
                LogRecord::Transition { from, to } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(transitions.len(), 8);
        assert_eq!(transitions[0], ("Manual".to_string(), "Arming".to_string()));
        assert_eq!(transitions[7], ("Landing".to_string(), "Disarming".to_string()));
        std::fs::remove_dir_all(&cfg.log_dir).ok();
    }

    #[test]
    fn log_closed_when_mission_incomplete() {
        let cfg = cfg_in("short");
        let mut driver = MissionDriver::new(ScriptedLink::new(vec![heartbeat()]), &FcConfig::default(), cfg.clone());
        driver.run().unwrap();
        assert_eq!(driver.mission().state(), FlightState::Manual);
        assert!(driver.mission().in_mission());

        let lines = read_log(&cfg);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].record, LogRecord::State { armed: false, guided: true });
        std::fs::remove_dir_all(&cfg.log_dir).ok();
    }

    #[test]
    fn custom_cruise_altitude_reaches_mission() {
        let cfg = MissionCfg { cruise_alt_m: 5.0, ..cfg_in("alt") };
        let driver = MissionDriver::new(ScriptedLink::new(vec![]), &FcConfig::default(), cfg);
        assert_eq!(driver.mission().cruise_alt_m(), 5.0);
    }
}
