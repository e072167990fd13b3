use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use flyer_fc::driver::MissionDriver;
use flyer_fc::mav::FcLink;
use flyer_fc::{doctor as fc_doctor, FcConfig};
use flyer_mission::{doctor as mission_doctor, MissionCfg};

#[derive(Debug, Parser)]
#[command(name = "flyer", version, about = "Flies a box mission over MAVLink")]
struct Cli {
    /// Optional TOML config; flags below override it.
    #[arg(long)]
    config: Option<String>,

    /// Autopilot host
    #[arg(long)]
    host: Option<String>,

    /// Autopilot TCP port
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and fly the box (default).
    Run,
    /// Validate configuration without connecting.
    Doctor,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    fc: FcConfig,
    mission: MissionCfg,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(host) = &cli.host {
        cfg.fc.host = host.clone();
    }
    if let Some(port) = cli.port {
        cfg.fc.port = port;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    match cli.cmd.unwrap_or(Command::Run) {
        Command::Run => run(cfg).await?,
        Command::Doctor => doctor(&cfg)?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    fc_doctor::check_link(&cfg.fc)?;
    mission_doctor::check_mission(&cfg.mission)?;
    info!("doctor: OK ({})", cfg.fc.endpoint());
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    info!("run: starting");
    let link = FcLink::open(&cfg.fc).context("FC open")?;
    let mut driver = MissionDriver::new(link, &cfg.fc, cfg.mission);
    let stop = driver.stop_handle();

    // The event loop blocks on the link; keep it off the async workers.
    let mut handle = tokio::task::spawn_blocking(move || driver.run());

    tokio::select! {
        res = &mut handle => res.context("mission driver task")??,
        _ = tokio::signal::ctrl_c() => {
            warn!("run: interrupted, returning control to pilot");
            stop.abort();
            handle.await.context("mission driver task")??;
        }
    }

    info!("run: done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_sitl() {
        let cli = Cli::parse_from(["flyer"]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.fc.host, "127.0.0.1");
        assert_eq!(cfg.fc.port, 5760);
        assert!(cli.cmd.is_none());
    }

    #[test]
    fn flags_override_endpoint() {
        let cli = Cli::parse_from(["flyer", "--host", "10.0.0.2", "--port", "14550", "doctor"]);
        let cfg = resolve_config(&cli).unwrap();
        assert_eq!(cfg.fc.endpoint().url(), "tcpout:10.0.0.2:14550");
        assert!(matches!(cli.cmd, Some(Command::Doctor)));
    }

    #[test]
    fn config_sections_are_optional() {
        let cfg: Config = toml::from_str("[mission]\ncruise_alt_m = 5.0\n").unwrap();
        assert_eq!(cfg.mission.cruise_alt_m, 5.0);
        assert_eq!(cfg.mission.log_file, "NavLog.txt");
        assert_eq!(cfg.fc.port, 5760);
        doctor(&cfg).unwrap();
    }
}
