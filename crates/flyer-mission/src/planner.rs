use serde::{Deserialize, Serialize};

/// Side length of the box, metres.
pub const BOX_SIDE_M: f64 = 10.0;

/// Default cruise altitude, metres above home.
pub const DEFAULT_CRUISE_ALT_M: f64 = 3.0;

/// A target in the local frame with altitude positive up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub north: f64,
    pub east: f64,
    pub altitude: f64,
}

impl Waypoint {
    pub fn new(north: f64, east: f64, altitude: f64) -> Self {
        Self { north, east, altitude }
    }
}

impl std::fmt::Display for Waypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.north, self.east, self.altitude)
    }
}

/// Corners of the box in traversal order, ending back over home.
pub fn compute_box(altitude: f64) -> [Waypoint; 4] {
    let l = BOX_SIDE_M;
    [
        Waypoint::new(l, 0.0, altitude),
        Waypoint::new(l, l, altitude),
        Waypoint::new(0.0, l, altitude),
        Waypoint::new(0.0, 0.0, altitude),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_corners_in_order() {
        let wps = compute_box(DEFAULT_CRUISE_ALT_M);
        assert_eq!(
            wps,
            [
                Waypoint::new(10.0, 0.0, 3.0),
                Waypoint::new(10.0, 10.0, 3.0),
                Waypoint::new(0.0, 10.0, 3.0),
                Waypoint::new(0.0, 0.0, 3.0),
            ]
        );
    }

    #[test]
    fn altitude_applies_to_every_corner() {
        assert!(compute_box(7.5).iter().all(|wp| wp.altitude == 7.5));
    }
}
