//! The process boundary: every invocation ends in exactly one JSON document
//! on stdout.

use std::process::ExitCode;

use serde::Serialize;
use serde_json::{json, Map, Value};

use forkterm_command::CommandError;
use forkterm_core::{ConfigError, FailureKind, RegistryError};
use forkterm_detector::DetectError;

/// Result of a command, before serialization.
#[derive(Debug)]
pub enum Outcome {
    Success(Map<String, Value>),
    Failure {
        error: FailureKind,
        details: String,
        /// Extra fields reported alongside the failure.
        context: Map<String, Value>,
    },
}

impl Outcome {
    pub fn success(body: impl Serialize) -> anyhow::Result<Self> {
        Ok(Outcome::Success(object(serde_json::to_value(body)?)))
    }

    pub fn failure(error: FailureKind, details: impl Into<String>) -> Self {
        Outcome::Failure {
            error,
            details: details.into(),
            context: Map::new(),
        }
    }

    pub fn failure_with(
        error: FailureKind,
        details: impl Into<String>,
        context: impl Serialize,
    ) -> anyhow::Result<Self> {
        Ok(Outcome::Failure {
            error,
            details: details.into(),
            context: object(serde_json::to_value(context)?),
        })
    }

    /// Classify an error that escaped a command.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Outcome::failure(failure_kind(err), format!("{err:#}"))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Outcome::Success(body) => {
                let mut doc = body.clone();
                doc.insert("success".into(), json!(true));
                Value::Object(doc)
            }
            Outcome::Failure {
                error,
                details,
                context,
            } => {
                let mut doc = context.clone();
                doc.insert("success".into(), json!(false));
                doc.insert("error".into(), json!(error));
                doc.insert("details".into(), json!(details));
                Value::Object(doc)
            }
        }
    }

    /// Print the document and return the process exit status.
    pub fn emit(&self, failure_code: u8) -> ExitCode {
        let doc = self.to_json();
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                // Unreachable for a `Value`, but stdout must still get JSON.
                tracing::error!(error = %err, "failed to serialize output");
                println!(r#"{{"success":false,"error":"IoError"}}"#);
                return ExitCode::from(1);
            }
        }
        match self {
            Outcome::Success(_) => ExitCode::SUCCESS,
            Outcome::Failure { .. } => ExitCode::from(failure_code),
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".into(), other);
            map
        }
    }
}

/// Failure category for an error chain, from the first typed error in it.
pub fn failure_kind(err: &anyhow::Error) -> FailureKind {
    if let Some(e) = err.downcast_ref::<RegistryError>() {
        return e.kind();
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return e.kind();
    }
    if let Some(e) = err.downcast_ref::<CommandError>() {
        return e.kind();
    }
    if let Some(e) = err.downcast_ref::<DetectError>() {
        return e.kind();
    }
    FailureKind::IoError
}
