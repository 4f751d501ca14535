use thiserror::Error;

use crate::core::types::{BodyPrototypeId, CharacterId, ProcedureId};

/// Hard failures: unmodelled configuration and broken references.
///
/// Expected rejections (wrong target, missing tools, patient moved) are never
/// errors; they travel as [`crate::procedures::Feasibility`] values.
#[derive(Error, Debug)]
pub enum ProcedureError {
    #[error("Character not found: {0:?}")]
    CharacterNotFound(CharacterId),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(ProcedureId),

    #[error("Unknown procedure name: {0}")]
    UnknownProcedureName(String),

    #[error("Body prototype not found: {0:?}")]
    PrototypeNotFound(BodyPrototypeId),

    #[error("Unknown body prototype name: {0}")]
    UnknownPrototypeName(String),

    #[error("Unknown procedure kind: {0}")]
    UnknownKind(String),

    #[error("Unknown variant flag '{flag}' for {kind}")]
    UnknownVariantFlag { kind: String, flag: String },

    #[error("Unknown phase action '{0}'")]
    UnknownPhaseAction(String),

    #[error("Invalid phase action '{action}': {reason}")]
    InvalidPhaseAction { action: String, reason: String },

    #[error("Procedure '{0}' has no phases")]
    NoPhases(String),

    #[error("Unknown anatomy reference '{name}' in {context}")]
    UnknownAnatomy { name: String, context: String },

    #[error("{procedure} is missing its resolved {what}")]
    MissingTarget { procedure: String, what: &'static str },

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProcedureError>;
