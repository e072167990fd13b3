use std::collections::VecDeque;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::gateway::CommandGateway;
use crate::planner::{compute_box, Waypoint, DEFAULT_CRUISE_ALT_M};
use crate::telemetry::{LocalPosition, TelemetryEvent, TelemetrySnapshot, Velocity3};

/// Horizontal distance at which a waypoint counts as reached, metres.
pub const TARGET_RADIUS_M: f64 = 0.2;
/// Fraction of the target altitude that completes the takeoff.
pub const TAKEOFF_ALT_FRACTION: f64 = 0.95;
/// Distance from home altitude that counts as on the ground, metres.
pub const GROUND_TOLERANCE_M: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Manual,
    Arming,
    Takeoff,
    Waypoint,
    Landing,
    Disarming,
}

impl std::fmt::Display for FlightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Active state plus the data only that state needs.
#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Manual,
    Arming,
    Takeoff,
    Waypoint { pending: VecDeque<Waypoint> },
    Landing,
    Disarming,
}

impl Phase {
    fn state(&self) -> FlightState {
        match self {
            Phase::Manual => FlightState::Manual,
            Phase::Arming => FlightState::Arming,
            Phase::Takeoff => FlightState::Takeoff,
            Phase::Waypoint { .. } => FlightState::Waypoint,
            Phase::Landing => FlightState::Landing,
            Phase::Disarming => FlightState::Disarming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: FlightState,
    pub to: FlightState,
}

pub fn target_close(local: &LocalPosition, target: &Waypoint) -> bool {
    (local.north - target.north).hypot(local.east - target.east) < TARGET_RADIUS_M
}

pub fn altitude_close(local: &LocalPosition, target: &Waypoint) -> bool {
    local.altitude() >= TAKEOFF_ALT_FRACTION * target.altitude
}

pub fn near_ground(local: &LocalPosition) -> bool {
    local.down.abs() < GROUND_TOLERANCE_M
}

fn landed(local: &LocalPosition, velocity: &Velocity3) -> bool {
    velocity.down == 0.0 && near_ground(local)
}

/// Box mission state machine.
///
/// Driven one telemetry event at a time; each event can fire at most one
/// transition, chosen by the state active when the event arrives. Events
/// that do not match the active state are ignored.
#[derive(Debug, Clone)]
pub struct Mission {
    phase: Phase,
    target: Waypoint,
    in_mission: bool,
    cruise_alt_m: f64,
}

impl Default for Mission {
    fn default() -> Self {
        Self::new(DEFAULT_CRUISE_ALT_M)
    }
}

impl Mission {
    pub fn new(cruise_alt_m: f64) -> Self {
        Self {
            phase: Phase::Manual,
            target: Waypoint::default(),
            in_mission: true,
            cruise_alt_m,
        }
    }

    pub fn state(&self) -> FlightState {
        self.phase.state()
    }

    pub fn target_position(&self) -> Waypoint {
        self.target
    }

    /// Corners still to fly after the current target, front first.
    pub fn pending_waypoints(&self) -> Vec<Waypoint> {
        match &self.phase {
            Phase::Waypoint { pending } => pending.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn in_mission(&self) -> bool {
        self.in_mission
    }

    pub fn cruise_alt_m(&self) -> f64 {
        self.cruise_alt_m
    }

    pub fn handle(
        &mut self,
        event: TelemetryEvent,
        telemetry: &TelemetrySnapshot,
        gateway: &mut dyn CommandGateway,
    ) -> Option<Transition> {
        let from = self.state();
        let fired = match (event, from) {
            (TelemetryEvent::StateChanged, FlightState::Manual) => {
                self.arming_transition(telemetry, gateway)
            }
            (TelemetryEvent::StateChanged, FlightState::Arming) => {
                self.takeoff_transition(gateway);
                true
            }
            (TelemetryEvent::LocalPositionChanged, FlightState::Takeoff) => {
                if altitude_close(&telemetry.local_position, &self.target) {
                    let mut pending: VecDeque<Waypoint> = compute_box(self.cruise_alt_m).into();
                    match pending.pop_front() {
                        Some(first) => {
                            self.waypoint_transition(first, pending, gateway);
                            true
                        }
                        None => false,
                    }
                } else {
                    false
                }
            }
            (TelemetryEvent::LocalPositionChanged, FlightState::Waypoint) => {
                if target_close(&telemetry.local_position, &self.target) {
                    self.advance_waypoint(gateway);
                    true
                } else {
                    false
                }
            }
            (TelemetryEvent::LocalVelocityChanged, FlightState::Landing) => {
                if landed(&telemetry.local_position, &telemetry.local_velocity) {
                    self.disarming_transition(gateway);
                    true
                } else {
                    false
                }
            }
            _ => false,
        };

        fired.then(|| Transition { from, to: self.state() })
    }

    /// Hands the vehicle back to the pilot from any state and ends the
    /// connection loop.
    pub fn manual_transition(&mut self, gateway: &mut dyn CommandGateway) -> Transition {
        let from = self.state();
        info!("mission: manual transition");
        issue("release control", gateway.release_control());
        issue("stop", gateway.stop());
        self.in_mission = false;
        self.phase = Phase::Manual;
        Transition { from, to: FlightState::Manual }
    }

    fn arming_transition(
        &mut self,
        telemetry: &TelemetrySnapshot,
        gateway: &mut dyn CommandGateway,
    ) -> bool {
        let home = telemetry.global_position;
        if !home.is_resolved() {
            debug!("mission: global position not resolved yet, deferring arm");
            return false;
        }

        info!("mission: arming transition");
        issue("take control", gateway.take_control());
        issue("arm", gateway.arm());
        issue(
            "set home",
            gateway.set_home_position(home.longitude, home.latitude, home.altitude),
        );
        self.phase = Phase::Arming;
        true
    }

    fn takeoff_transition(&mut self, gateway: &mut dyn CommandGateway) {
        info!("mission: takeoff transition to {:.1}m", self.cruise_alt_m);
        self.target.altitude = self.cruise_alt_m;
        issue("takeoff", gateway.takeoff(self.target.altitude));
        self.phase = Phase::Takeoff;
    }

    fn waypoint_transition(
        &mut self,
        target: Waypoint,
        pending: VecDeque<Waypoint>,
        gateway: &mut dyn CommandGateway,
    ) {
        info!("mission: waypoint transition to {} ({} left)", target, pending.len());
        self.target = target;
        issue(
            "fly to",
            gateway.fly_to(target.north, target.east, target.altitude, 0.0),
        );
        self.phase = Phase::Waypoint { pending };
    }

    fn advance_waypoint(&mut self, gateway: &mut dyn CommandGateway) {
        let Phase::Waypoint { pending } = &mut self.phase else {
            return;
        };
        match pending.pop_front() {
            Some(target) => {
                let pending = std::mem::take(pending);
                self.waypoint_transition(target, pending, gateway);
            }
            None => self.landing_transition(gateway),
        }
    }

    fn landing_transition(&mut self, gateway: &mut dyn CommandGateway) {
        info!("mission: landing transition");
        issue("land", gateway.land());
        self.phase = Phase::Landing;
    }

    fn disarming_transition(&mut self, gateway: &mut dyn CommandGateway) {
        info!("mission: disarm transition");
        issue("disarm", gateway.disarm());
        self.in_mission = false;
        self.phase = Phase::Disarming;
    }
}

fn issue(what: &str, res: Result<()>) {
    if let Err(e) = res {
        warn!("mission: {} command failed: {:#}", what, e);
    }
}
