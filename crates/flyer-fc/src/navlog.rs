use anyhow::{Context, Result};
use flyer_proto::navlog::{LogLine, LogRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Telemetry and transition log, one JSON object per line.
pub struct NavLog {
    path: PathBuf,
    out: BufWriter<File>,
    lines: u64,
}

impl NavLog {
    pub fn start(dir: impl AsRef<Path>, file: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;
        let path = dir.join(file);
        let f = File::create(&path).with_context(|| format!("create nav log {}", path.display()))?;
        info!("navlog: writing {}", path.display());
        Ok(Self { path, out: BufWriter::new(f), lines: 0 })
    }

    pub fn write(&mut self, record: LogRecord) -> Result<()> {
        let line = LogLine {
            ts_unix_ms: time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64 / 1_000_000,
            record,
        };
        serde_json::to_writer(&mut self.out, &line).context("encode nav log line")?;
        self.out.write_all(b"\n").context("write nav log")?;
        self.lines += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flushes and closes the file.
    pub fn stop(mut self) -> Result<PathBuf> {
        self.out.flush().with_context(|| format!("flush nav log {}", self.path.display()))?;
        info!("navlog: closed {} ({} lines)", self.path.display(), self.lines);
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flyer-navlog-{}-{}", name, std::process::id()))
    }

    #[test]
    fn writes_json_lines() {
        let dir = scratch_dir("lines");
        let mut log = NavLog::start(&dir, "NavLog.txt").unwrap();
        log.write(LogRecord::State { armed: false, guided: true }).unwrap();
        log.write(LogRecord::Transition { from: "Manual".into(), to: "Arming".into() }).unwrap();
        assert_eq!(log.lines(), 2);
        let path = log.stop().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<LogLine> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].record, LogRecord::State { armed: false, guided: true });
        assert!(lines[1].ts_unix_ms >= lines[0].ts_unix_ms);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn start_creates_nested_dir() {
        let dir = scratch_dir("nested").join("a").join("b");
        let log = NavLog::start(&dir, "NavLog.txt").unwrap();
        assert!(log.path().starts_with(&dir));
        log.stop().unwrap();
        assert!(dir.join("NavLog.txt").exists());
        std::fs::remove_dir_all(scratch_dir("nested")).ok();
    }
}
