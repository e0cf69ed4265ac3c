//! Derivación pura de rutas e inferencia de content-type.

/// Directorio relativo de un intento: `<run_id>/stages/<stage>/attempt-<n>`.
pub fn attempt_dir(run_id: &str, stage: &str, attempt: i32) -> String {
    format!("{run_id}/stages/{stage}/attempt-{attempt}")
}

/// Ruta relativa de un artefacto dentro de su intento.
pub fn artifact_path(run_id: &str, stage: &str, attempt: i32, filename: &str) -> String {
    format!("{}/{filename}", attempt_dir(run_id, stage, attempt))
}

/// Content-type por sufijo de archivo; binario en cualquier otro caso.
/// El caller puede pisar el valor al registrar el artefacto.
pub fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".ndjson") {
        "application/x-ndjson"
    } else if filename.ends_with(".json") {
        "application/json"
    } else if filename.ends_with(".md") {
        "text/markdown"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_dir_shape() {
        assert_eq!(attempt_dir("run-x", "3a", 2), "run-x/stages/3a/attempt-2");
        assert_eq!(artifact_path("run-x", "7", 1, "deck.pptx"), "run-x/stages/7/attempt-1/deck.pptx");
    }

    #[test]
    fn content_types_by_suffix() {
        assert_eq!(content_type_for("output.json"), "application/json");
        assert_eq!(content_type_for("output.md"), "text/markdown");
        assert_eq!(content_type_for("events.ndjson"), "application/x-ndjson");
        assert_eq!(content_type_for("deck.pptx"), "application/octet-stream");
    }
}
