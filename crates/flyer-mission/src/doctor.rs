use anyhow::Result;
use crate::MissionCfg;

pub fn check_mission(cfg: &MissionCfg) -> Result<()> {
    anyhow::ensure!(cfg.cruise_alt_m.is_finite(), "mission.cruise_alt_m must be a number");
    anyhow::ensure!(cfg.cruise_alt_m >= 1.0 && cfg.cruise_alt_m <= 120.0, "mission.cruise_alt_m should be 1..120");
    anyhow::ensure!(!cfg.log_dir.is_empty(), "mission.log_dir missing");
    anyhow::ensure!(!cfg.log_file.is_empty(), "mission.log_file missing");
    Ok(())
}
