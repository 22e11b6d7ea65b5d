//! JSON command surface over a [`SigningPipeline`].
//!
//! Every request is one JSON object with an `action`; every reply is a JSON
//! object, either the action's payload or `{"error": .., "status": ..}`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{SignError, SignResult};
use crate::features::fields::WireField;
use crate::features::hashes::sha256_hex;
use crate::features::pipeline::SigningPipeline;
use crate::features::sample::agreement_pdf;

const SAMPLE_NAME: &str = "sample-agreement.pdf";

#[derive(Deserialize)]
struct Command {
    action: String,
    path: Option<String>,
    original_name: Option<String>,
    mime_type: Option<String>,
    document_id: Option<String>,
    fields: Option<Vec<WireField>>,
    expected_hash: Option<String>,
}

#[derive(Debug)]
enum Action {
    Upload {
        path: PathBuf,
        original_name: Option<String>,
        mime_type: Option<String>,
    },
    Sign {
        document_id: String,
        fields: Vec<WireField>,
    },
    Verify {
        document_id: String,
        expected_hash: String,
    },
    Document {
        document_id: String,
    },
    Documents,
    Export {
        document_id: String,
        path: PathBuf,
    },
    Sample {
        path: Option<PathBuf>,
    },
}

fn required(value: Option<String>, what: &str) -> SignResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SignError::Validation(format!("{what} is required")))
}

fn parse_action(command: Command) -> SignResult<Action> {
    let Command {
        action,
        path,
        original_name,
        mime_type,
        document_id,
        fields,
        expected_hash,
    } = command;

    match action.as_str() {
        "upload" => Ok(Action::Upload {
            path: PathBuf::from(required(path, "path")?),
            original_name,
            mime_type,
        }),
        "sign" => Ok(Action::Sign {
            document_id: required(document_id, "document_id")?,
            fields: fields
                .filter(|f| !f.is_empty())
                .ok_or_else(|| SignError::Validation("Fields array is required".into()))?,
        }),
        "verify" => Ok(Action::Verify {
            document_id: required(document_id, "document_id")?,
            expected_hash: required(expected_hash, "expected_hash")?,
        }),
        "document" => Ok(Action::Document {
            document_id: required(document_id, "document_id")?,
        }),
        "documents" => Ok(Action::Documents),
        "export" => Ok(Action::Export {
            document_id: required(document_id, "document_id")?,
            path: PathBuf::from(required(path, "path")?),
        }),
        "sample" => Ok(Action::Sample {
            path: path.filter(|p| !p.trim().is_empty()).map(PathBuf::from),
        }),
        other => Err(SignError::Validation(format!("unknown action: {other}"))),
    }
}

fn read_input(path: &Path) -> SignResult<Vec<u8>> {
    fs::read(path).map_err(|e| SignError::Validation(format!("cannot read {}: {e}", path.display())))
}

fn write_output(path: &Path, bytes: &[u8]) -> SignResult<()> {
    fs::write(path, bytes)
        .map_err(|e| SignError::Internal(format!("cannot write {}: {e}", path.display())))
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn to_value<T: serde::Serialize>(value: &T) -> SignResult<Value> {
    serde_json::to_value(value).map_err(|e| SignError::Internal(format!("encode_failed:{e}")))
}

fn handle_command(pipeline: &SigningPipeline, command: Command) -> SignResult<Value> {
    match parse_action(command)? {
        Action::Upload {
            path,
            original_name,
            mime_type,
        } => {
            let bytes = read_input(&path)?;
            let name = original_name.unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let mime = mime_type.unwrap_or_else(|| sniff_mime(&bytes));
            to_value(&pipeline.upload(&name, &mime, &bytes)?)
        }
        Action::Sign {
            document_id,
            fields,
        } => to_value(&pipeline.sign_wire(&document_id, &fields)?),
        Action::Verify {
            document_id,
            expected_hash,
        } => to_value(&pipeline.verify(&document_id, &expected_hash)?),
        Action::Document { document_id } => to_value(&pipeline.document(&document_id)?),
        Action::Documents => Ok(json!({ "documents": to_value(&pipeline.documents()?)? })),
        Action::Export { document_id, path } => {
            let bytes = pipeline.signed_artifact(&document_id)?;
            write_output(&path, &bytes)?;
            Ok(json!({
                "documentId": document_id,
                "path": path.to_string_lossy(),
                "size": bytes.len(),
                "contentHash": sha256_hex(&bytes),
            }))
        }
        Action::Sample { path: Some(path) } => {
            let bytes = agreement_pdf()?;
            write_output(&path, &bytes)?;
            Ok(json!({
                "path": path.to_string_lossy(),
                "size": bytes.len(),
                "contentHash": sha256_hex(&bytes),
            }))
        }
        Action::Sample { path: None } => {
            let bytes = agreement_pdf()?;
            to_value(&pipeline.upload(SAMPLE_NAME, crate::features::pipeline::PDF_MIME, &bytes)?)
        }
    }
}

pub fn error_value(err: &SignError) -> Value {
    json!({
        "error": err.public_message(),
        "status": err.status(),
    })
}

/// Runs one JSON command and returns the JSON reply.
pub fn dispatch(pipeline: &SigningPipeline, input: &str) -> String {
    let result = serde_json::from_str::<Command>(input)
        .map_err(SignError::from)
        .and_then(|command| handle_command(pipeline, command));
    let value = match result {
        Ok(value) => value,
        Err(err) => {
            log::debug!("command failed: {err}");
            error_value(&err)
        }
    };
    value.to_string()
}
