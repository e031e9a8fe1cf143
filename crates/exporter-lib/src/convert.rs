//! Unit conversions and label formatting

const GIB: i64 = 1024 * 1024 * 1024;
const GB: i64 = 1000 * 1000 * 1000;

/// Binary gigabytes to bytes
pub fn gib_to_bytes(gib: i64) -> i64 {
    gib.saturating_mul(GIB)
}

/// Decimal gigabytes to bytes
pub fn gb_to_bytes(gb: i64) -> i64 {
    gb.saturating_mul(GB)
}

/// Parse a decimal integer, yielding zero on anything unparsable
pub fn parse_i64_or_zero(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

pub fn millis_to_seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

pub fn bool_label(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
