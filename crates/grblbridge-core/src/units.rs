//! Unit conversion and coordinate formatting
//!
//! The controller reports in whatever units `$13` selects; this module only
//! converts where a command must be rewritten (jog targets) and picks the
//! display precision (3 decimals metric, 4 decimals imperial).

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Convert millimeters to inches
pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Convert inches to millimeters
pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

/// Decimal places used when rendering a coordinate for display
pub fn display_precision(inches: bool) -> usize {
    if inches {
        4
    } else {
        3
    }
}

/// Render a coordinate at display precision
pub fn format_coordinate(value: f64, inches: bool) -> String {
    format!("{:.*}", display_precision(inches), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_round_trip() {
        assert!((mm_to_inches(25.4) - 1.0).abs() < 1e-12);
        assert!((inches_to_mm(2.0) - 50.8).abs() < 1e-12);
    }

    #[test]
    fn precision_follows_units() {
        assert_eq!(format_coordinate(1.5, false), "1.500");
        assert_eq!(format_coordinate(1.5, true), "1.5000");
        assert_eq!(format_coordinate(-0.1234567, true), "-0.1235");
    }
}
