//! Generación de identificadores de run y de worker.
//!
//! Formatos estables:
//! - run: `run-<base36(millis)>-<8-hex>`
//! - worker: `worker-<8-hex>`

use chrono::Utc;
use uuid::Uuid;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Sufijo hex corto (8 chars) derivado de un UUID v4.
pub fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Id de run generado cuando el operador no provee uno.
pub fn generate_run_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    format!("run-{}-{}", base36(millis), short_hex())
}

/// Identidad de worker para el lock cuando el caller no provee una.
pub fn generate_worker_id() -> String {
    format!("worker-{}", short_hex())
}
