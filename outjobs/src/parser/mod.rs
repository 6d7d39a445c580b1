pub mod sexp;

// Re-export for convenience
pub use sexp::{parse, ParseError, SExp, SExpParser};

use uuid::Uuid;

pub fn parse_uuid(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s).ok()
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Formats a float with at most six decimals and no redundant zeros.
pub fn format_float(value: f64) -> String {
    let mut s = format!("{:.6}", value);
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    if s == "-0.0" {
        s = "0.0".to_string();
    }
    s
}

pub fn bool_atom(value: bool) -> SExp {
    SExp::atom(if value { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-0.0), "0.0");
        assert_eq!(format_float(12.3456789), "12.345679");
    }

    #[test]
    fn test_parse_bool_is_strict() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
