use serde::{Deserialize, Serialize};

/// What a navigation log line carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    LocalPosition { north: f64, east: f64, down: f64 },
    LocalVelocity { north: f64, east: f64, down: f64 },
    GlobalPosition { longitude: f64, latitude: f64, altitude: f64 },
    State { armed: bool, guided: bool },
    Transition { from: String, to: String },
}

/// One line of the navigation log (JSON lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub ts_unix_ms: i64,
    #[serde(flatten)]
    pub record: LogRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_kind_is_flattened_into_line() {
        let line = LogLine {
            ts_unix_ms: 1_700_000_000_000,
            record: LogRecord::State { armed: true, guided: false },
        };
        let v = serde_json::to_value(&line).unwrap();
        assert_eq!(v["kind"], "state");
        assert_eq!(v["armed"], true);
        assert_eq!(v["ts_unix_ms"], 1_700_000_000_000i64);
    }

    #[test]
    fn transition_line_parses_back() {
        let s = r#"{"ts_unix_ms":5,"kind":"transition","from":"Takeoff","to":"Waypoint"}"#;
        let line: LogLine = serde_json::from_str(s).unwrap();
        assert_eq!(
            line.record,
            LogRecord::Transition { from: "Takeoff".into(), to: "Waypoint".into() }
        );
    }
}
