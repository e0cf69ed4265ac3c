//! Escritura por bundle de los artefactos estándar de un intento.
//!
//! Toda escritura pasa por el protocolo atómico del `ArtifactStore` y se
//! registra en el store de metadatos con semántica upsert por
//! `(run_id, stage, attempt, filename)`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::artifact::{artifact_path, content_type_for, ArtifactStore};
use crate::constants::{ERROR_JSON, EVENTS_NDJSON, META_JSON, OUTPUT_JSON, OUTPUT_MD};
use crate::errors::RunnerError;
use crate::model::ErrorArtifact;
use crate::store::{ArtifactRecord, PipelineStore};

/// Subconjunto de artefactos estándar a escribir para un intento, más blobs
/// binarios nombrados (p. ej. el deck).
#[derive(Default)]
pub struct StageArtifactBundle<'a> {
    pub output: Option<&'a Value>,
    pub output_md: Option<&'a str>,
    pub meta: Option<&'a Value>,
    pub events_ndjson: Option<&'a str>,
    pub binaries: Option<&'a BTreeMap<String, Vec<u8>>>,
}

fn write_one<A, S>(fs: &A,
                   store: &S,
                   run_id: &str,
                   stage: &str,
                   attempt: i32,
                   filename: &str,
                   bytes: &[u8])
                   -> Result<ArtifactRecord, RunnerError>
    where A: ArtifactStore + ?Sized,
          S: PipelineStore + ?Sized
{
    let path = artifact_path(run_id, stage, attempt, filename);
    let size = fs.write_atomic(&path, bytes)?;
    let record = ArtifactRecord { run_id: run_id.to_string(),
                                  stage: stage.to_string(),
                                  attempt,
                                  filename: filename.to_string(),
                                  path,
                                  size_bytes: size as i64,
                                  content_type: content_type_for(filename).to_string() };
    store.record_artifact(&record)?;
    Ok(record)
}

/// Escribe el bundle y registra cada artefacto. Devuelve los registros en el
/// orden en que se escribieron.
pub fn write_stage_artifacts<A, S>(fs: &A,
                                   store: &S,
                                   run_id: &str,
                                   stage: &str,
                                   attempt: i32,
                                   bundle: &StageArtifactBundle<'_>)
                                   -> Result<Vec<ArtifactRecord>, RunnerError>
    where A: ArtifactStore + ?Sized,
          S: PipelineStore + ?Sized
{
    let mut records = Vec::new();
    if let Some(output) = bundle.output {
        let bytes = serde_json::to_vec_pretty(output).map_err(|e| RunnerError::InvalidArgument(format!("unserializable output: {e}")))?;
        records.push(write_one(fs, store, run_id, stage, attempt, OUTPUT_JSON, &bytes)?);
    }
    if let Some(md) = bundle.output_md {
        records.push(write_one(fs, store, run_id, stage, attempt, OUTPUT_MD, md.as_bytes())?);
    }
    if let Some(meta) = bundle.meta {
        let bytes = serde_json::to_vec_pretty(meta).map_err(|e| RunnerError::InvalidArgument(format!("unserializable meta: {e}")))?;
        records.push(write_one(fs, store, run_id, stage, attempt, META_JSON, &bytes)?);
    }
    if let Some(nd) = bundle.events_ndjson {
        records.push(write_one(fs, store, run_id, stage, attempt, EVENTS_NDJSON, nd.as_bytes())?);
    }
    if let Some(binaries) = bundle.binaries {
        for (filename, bytes) in binaries {
            records.push(write_one(fs, store, run_id, stage, attempt, filename, bytes)?);
        }
    }
    Ok(records)
}

/// Serializa un payload de error a `error.json` y lo registra.
pub fn write_error_artifact<A, S>(fs: &A,
                                  store: &S,
                                  run_id: &str,
                                  stage: &str,
                                  attempt: i32,
                                  error: &ErrorArtifact)
                                  -> Result<ArtifactRecord, RunnerError>
    where A: ArtifactStore + ?Sized,
          S: PipelineStore + ?Sized
{
    let bytes = serde_json::to_vec_pretty(error).map_err(|e| RunnerError::InvalidArgument(format!("unserializable error payload: {e}")))?;
    write_one(fs, store, run_id, stage, attempt, ERROR_JSON, &bytes)
}
