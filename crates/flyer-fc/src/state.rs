use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    pub connected: bool,
    pub endpoint: Option<String>,
    pub last_heartbeat: Option<Instant>,
    pub messages: u64,
    pub last_msg: Option<&'static str>,
}

impl LinkStatus {
    pub fn hb_age(&self) -> Option<Duration> {
        self.last_heartbeat.map(|t| t.elapsed())
    }

    pub fn on_message(&mut self, name: &'static str) {
        self.messages += 1;
        self.last_msg = Some(name);
        if name == "HEARTBEAT" {
            self.last_heartbeat = Some(Instant::now());
        }
    }
}
