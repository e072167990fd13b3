use anyhow::Result;
use flyer_mission::{Mission, TelemetrySnapshot};
use flyer_proto::navlog::LogRecord;
use mavlink::common::{MavMessage, MavResult};
use mavlink::{MavHeader, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::mav::VehicleLink;
use crate::navlog::NavLog;
use crate::state::LinkStatus;
use crate::telemetry;

/// Ends a running event loop from another thread.
///
/// `stop` just leaves the loop. `abort` first hands the vehicle back to the
/// pilot through the mission's manual transition.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopFlags>,
}

#[derive(Debug, Default)]
struct StopFlags {
    stop: AtomicBool,
    abort: AtomicBool,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    pub fn abort(&self) {
        self.inner.abort.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    fn take_abort(&self) -> bool {
        self.inner.abort.swap(false, Ordering::SeqCst)
    }
}

/// Single-threaded event loop: one message in, its events dispatched to the
/// mission to completion, then the next message.
pub struct Connection<L: VehicleLink> {
    link: L,
    telemetry: TelemetrySnapshot,
    status: LinkStatus,
    heartbeat_interval: Duration,
    stream_rate_hz: u16,
    last_hb_send: Option<Instant>,
}

impl<L: VehicleLink> Connection<L> {
    pub fn new(link: L, heartbeat_hz: f32, stream_rate_hz: u16) -> Self {
        Self {
            link,
            telemetry: TelemetrySnapshot::default(),
            status: LinkStatus::default(),
            heartbeat_interval: Duration::from_secs_f32(1.0 / heartbeat_hz),
            stream_rate_hz,
            last_hb_send: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.status.endpoint = Some(endpoint.into());
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.link.stop_handle()
    }

    pub fn stop(&self) {
        self.link.stop_handle().stop();
    }

    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Runs until the link closes or a stop is requested.
    pub fn start(&mut self, mission: &mut Mission, mut log: Option<&mut NavLog>) -> Result<()> {
        let stop = self.link.stop_handle();
        self.status.connected = true;
        if let Err(e) = self.link.request_streams(self.stream_rate_hz) {
            warn!("fc: stream request failed: {:#}", e);
        }
        info!("fc: event loop started ({})", self.status.endpoint.as_deref().unwrap_or("link"));

        while !stop.is_stopped() {
            if stop.take_abort() {
                warn!("fc: abort requested in {}", mission.state());
                let t = mission.manual_transition(&mut self.link);
                log_transition(log.as_deref_mut(), t);
                continue;
            }

            self.maybe_send_heartbeat();

            let (hdr, msg) = match self.link.recv() {
                Ok(Some(m)) => m,
                Ok(None) => continue,
                Err(e) => {
                    info!("fc: connection closed: {:#}", e);
                    break;
                }
            };
            self.dispatch(&hdr, &msg, mission, log.as_deref_mut());
        }

        self.status.connected = false;
        info!(
            "fc: event loop ended in {} after {} messages (last heartbeat age {:?})",
            mission.state(),
            self.status.messages,
            self.status.hb_age()
        );
        Ok(())
    }

    fn maybe_send_heartbeat(&mut self) {
        let due = self.last_hb_send.map_or(true, |t| t.elapsed() >= self.heartbeat_interval);
        if due {
            if let Err(e) = self.link.send_heartbeat() {
                warn!("fc: heartbeat send failed: {:#}", e);
            }
            self.last_hb_send = Some(Instant::now());
        }
    }

    fn dispatch(
        &mut self,
        hdr: &MavHeader,
        msg: &MavMessage,
        mission: &mut Mission,
        mut log: Option<&mut NavLog>,
    ) {
        if hdr.system_id != self.link.target_sys() {
            return;
        }
        self.status.on_message(msg.message_name());

        if let MavMessage::COMMAND_ACK(ack) = msg {
            if ack.result != MavResult::MAV_RESULT_ACCEPTED {
                warn!("fc: {:?} rejected: {:?}", ack.command, ack.result);
            } else {
                debug!("fc: {:?} accepted", ack.command);
            }
        }

        let update = telemetry::apply(&mut self.telemetry, msg);
        if let Some(log) = log.as_deref_mut() {
            for record in update.records {
                if let Err(e) = log.write(record) {
                    warn!("navlog: {:#}", e);
                }
            }
        }

        for event in update.events {
            if let Some(t) = mission.handle(event, &self.telemetry, &mut self.link) {
                log_transition(log.as_deref_mut(), t);
            }
        }
    }
}

fn log_transition(log: Option<&mut NavLog>, t: flyer_mission::Transition) {
    if let Some(log) = log {
        let record = LogRecord::Transition { from: t.from.to_string(), to: t.to.to_string() };
        if let Err(e) = log.write(record) {
            warn!("navlog: {:#}", e);
        }
    }
}
