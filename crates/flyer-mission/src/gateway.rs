use anyhow::Result;

/// Discrete vehicle commands the mission can issue.
///
/// Every call is fire-and-forget: `Ok` means the request left, not that the
/// vehicle accepted it.
pub trait CommandGateway {
    fn take_control(&mut self) -> Result<()>;
    fn release_control(&mut self) -> Result<()>;
    fn arm(&mut self) -> Result<()>;
    fn disarm(&mut self) -> Result<()>;
    fn set_home_position(&mut self, longitude: f64, latitude: f64, altitude: f64) -> Result<()>;
    fn takeoff(&mut self, altitude: f64) -> Result<()>;
    /// Local-frame position target; `altitude` is positive up, `heading` in radians.
    fn fly_to(&mut self, north: f64, east: f64, altitude: f64, heading: f64) -> Result<()>;
    fn land(&mut self) -> Result<()>;
    /// Ends the connection event loop.
    fn stop(&mut self) -> Result<()>;
}
