//! GRBL status report parsing
//!
//! Status reports arrive as `<State|MPos:x,y,z|...>` in reply to the `?`
//! realtime query. After stripping the delimiters the body is split on
//! comma, colon, and pipe: field 0 is the controller state name and fields
//! 2-4 are the machine X/Y/Z coordinates. A `WCO` token anywhere in the
//! report is followed by the three work-coordinate offsets.
//!
//! Fields that are missing or fail to parse are reported as `None`; the
//! session keeps the previous value (partial updates are expected and
//! normal).

use grblbridge_core::Position;
use serde::{Deserialize, Serialize};

/// Parsed fields of one status report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    /// Controller state name (field 0).
    pub state: String,
    /// Machine X coordinate, when present and numeric.
    pub machine_x: Option<f64>,
    /// Machine Y coordinate, when present and numeric.
    pub machine_y: Option<f64>,
    /// Machine Z coordinate, when present and numeric.
    pub machine_z: Option<f64>,
    /// Work coordinate offset, when the report carried a `WCO` segment.
    pub work_offset: Option<Position>,
}

/// Parse a `<...>` status report line
///
/// Returns `None` when the line is not delimited as a status report.
pub fn parse_status(line: &str) -> Option<StatusReport> {
    if !(line.len() >= 2 && line.starts_with('<') && line.ends_with('>')) {
        return None;
    }

    let body = &line[1..line.len() - 1];
    let fields: Vec<&str> = body.split(['|', ':', ',']).collect();

    let field = |i: usize| fields.get(i).and_then(|s| s.trim().parse::<f64>().ok());

    let mut report = StatusReport {
        state: fields.first().map(|s| s.to_string()).unwrap_or_default(),
        machine_x: field(2),
        machine_y: field(3),
        machine_z: field(4),
        work_offset: None,
    };

    if let Some(i) = fields.iter().position(|f| *f == "WCO") {
        if let (Some(x), Some(y), Some(z)) = (field(i + 1), field(i + 2), field(i + 3)) {
            report.work_offset = Some(Position::new(x, y, z));
        }
    }

    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_state_and_machine_position() {
        let report = parse_status("<Idle|MPos:1.000,2.000,-0.500|FS:0,0>")
            .expect("status report");
        assert_eq!(report.state, "Idle");
        assert_eq!(report.machine_x, Some(1.0));
        assert_eq!(report.machine_y, Some(2.0));
        assert_eq!(report.machine_z, Some(-0.5));
        assert_eq!(report.work_offset, None);
    }

    #[test]
    fn finds_wco_wherever_it_appears() {
        let report = parse_status("<Run|MPos:0.000,0.000,0.000|FS:500,0|WCO:1.000,2.000,3.000>")
            .expect("status report");
        assert_eq!(report.work_offset, Some(Position::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn missing_fields_stay_unset() {
        let report = parse_status("<Alarm>").expect("status report");
        assert_eq!(report.state, "Alarm");
        assert_eq!(report.machine_x, None);
        assert_eq!(report.work_offset, None);
    }

    #[test]
    fn rejects_non_status_lines() {
        assert_eq!(parse_status("ok"), None);
        assert_eq!(parse_status("[GC:G0 G54]"), None);
        assert_eq!(parse_status("<unterminated"), None);
    }
}
