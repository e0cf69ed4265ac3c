//! Formato de timestamps persistidos.
//!
//! Ancho fijo con milisegundos (`2025-06-10T12:00:00.000Z`): el orden
//! lexicográfico de las columnas TEXT coincide con el cronológico, lo que
//! habilita los deletes por expiración de `run_locks` sin parsear.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const ISO_FMT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.format(ISO_FMT).to_string()
}

pub fn now_iso() -> String {
    to_iso(&Utc::now())
}

pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ISO_FMT).ok().map(|n| Utc.from_utc_datetime(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_keeps_millis() {
        let now = Utc::now();
        let text = to_iso(&now);
        let parsed = parse_iso(&text).expect("parse");
        assert_eq!(to_iso(&parsed), text);
        assert!((now - parsed).num_milliseconds().abs() < 1);
    }

    #[test]
    fn lexicographic_order_is_chronological() {
        let early = parse_iso("2025-06-10T12:00:00.000Z").unwrap();
        let late = parse_iso("2025-06-10T12:00:00.001Z").unwrap();
        assert!(early < late);
        assert!(to_iso(&early) < to_iso(&late));
    }
}
