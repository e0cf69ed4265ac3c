//! Saneado de secretos sobre payloads persistidos/emitidos.
//!
//! Reglas (aplican SOLO a lo que se serializa a disco o se entrega a hooks;
//! el contexto en memoria entre etapas nunca se sanea):
//! - Valores bajo campos sensibles (match case-insensitive) -> `[REDACTED]`.
//! - Strings de más de 500 caracteres -> truncado + marcador.
//! - Arrays limitados a 50 elementos.
//! - Anidamiento limitado a profundidad 6; más hondo -> `[truncated]`.

use serde_json::{Map, Value};

pub const MAX_STRING_LEN: usize = 500;
pub const MAX_ARRAY_LEN: usize = 50;
pub const MAX_DEPTH: usize = 6;

const REDACTED: &str = "[REDACTED]";
const TRUNCATED: &str = "…[truncated]";

/// Nombres de campo sensibles, comparados en minúsculas.
const SENSITIVE_FIELDS: [&str; 8] =
    ["apikey", "api_key", "password", "secret", "token", "authtoken", "credential", "authorization"];

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_FIELDS.contains(&lower.as_str())
}

fn scrub_string(s: &str) -> Value {
    if s.chars().count() > MAX_STRING_LEN {
        let prefix: String = s.chars().take(MAX_STRING_LEN).collect();
        Value::String(format!("{prefix}{TRUNCATED}"))
    } else {
        Value::String(s.to_string())
    }
}

fn scrub_at(value: &Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String("[truncated]".to_string());
    }
    match value {
        Value::String(s) => scrub_string(s),
        Value::Array(items) => {
            Value::Array(items.iter().take(MAX_ARRAY_LEN).map(|v| scrub_at(v, depth + 1)).collect())
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                if is_sensitive(k) {
                    out.insert(k.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(k.clone(), scrub_at(v, depth + 1));
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Devuelve una copia saneada del valor.
pub fn scrub(value: &Value) -> Value {
    scrub_at(value, 0)
}
