//! Parser de argumentos compartido por los comandos.
//!
//! Convenciones:
//! - `--key=value` o `--key value`.
//! - `--flag` sin valor equivale a `true`.
//! - El primer token que no es flag es el comando.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct CliArgs {
    pub command: Option<String>,
    flags: BTreeMap<String, String>,
}

impl CliArgs {
    pub fn parse(args: &[String]) -> Self {
        let mut command = None;
        let mut flags = BTreeMap::new();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if let Some(rest) = arg.strip_prefix("--") {
                if let Some((key, value)) = rest.split_once('=') {
                    flags.insert(key.to_string(), value.to_string());
                } else {
                    match args.get(i + 1) {
                        Some(next) if !next.starts_with("--") => {
                            flags.insert(rest.to_string(), next.clone());
                            i += 1;
                        }
                        _ => {
                            flags.insert(rest.to_string(), "true".to_string());
                        }
                    }
                }
            } else if command.is_none() {
                command = Some(arg.clone());
            }
            i += 1;
        }
        Self { command, flags }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    /// Valor obligatorio; error de uso si falta.
    pub fn require(&self, key: &str) -> Result<&str, String> {
        self.get(key).ok_or_else(|| format!("missing required flag --{key}"))
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true") | Some("1") | Some("yes"))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}
