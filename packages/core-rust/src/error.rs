//! Error taxonomy of the engine.
//!
//! - [`MissingRequiredArgument`]: recoverable, makes the owning step skip.
//! - [`DispatchError`]: fatal for one call.
//! - [`BuildError`]: fatal for one build; no dispatcher is produced.

use std::fmt;

use crate::types::TypeInfo;

/// Why a required argument could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The source held no value.
    Absent,
    /// The set was empty but the argument requires at least one element.
    EmptySet,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("not found"),
            Self::EmptySet => f.write_str("is empty but must not be empty"),
        }
    }
}

/// A required step argument is unavailable; the step will not be called.
///
/// Never surfaced past the pipeline: it only tells the pipeline to continue
/// with the context the skipped step received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("required argument {position} ({argument_type}) {reason}, will not call {target}::{method}")]
pub struct MissingRequiredArgument {
    pub target: &'static str,
    pub method: String,
    pub position: usize,
    pub argument_type: TypeInfo,
    pub reason: MissingReason,
}

/// Fatal errors raised while executing a call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no pipeline configured for {interface}::{method}")]
    UnknownMethod { interface: String, method: String },

    #[error("required parameter at position {position} of {method} is null")]
    NullRequiredParameter { method: String, position: usize },

    #[error(
        "argument {position} of {target}::{method} reads call argument {index}, \
         but only {len} were provided"
    )]
    IndexOutOfRange {
        target: &'static str,
        method: String,
        position: usize,
        index: usize,
        len: usize,
    },

    #[error("argument {position} of {method}: expected {expected}, got {found}")]
    ArgumentTypeMismatch {
        method: String,
        position: usize,
        expected: TypeInfo,
        found: TypeInfo,
    },

    #[error("{method} returns {expected}, caller requested {found}")]
    ReturnTypeMismatch {
        method: String,
        expected: TypeInfo,
        found: TypeInfo,
    },

    #[error("could not invoke configured target ({target}::{method})")]
    InvocationFailure {
        target: &'static str,
        method: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Configuration errors detected before a dispatcher exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("method {method} not found on {target}: {reason}")]
    MethodNotFound {
        target: String,
        method: String,
        reason: String,
    },

    #[error("method {method} of {interface} is configured more than once")]
    DuplicateMethod { interface: String, method: String },

    #[error("{target} exposes {method} more than once; overloading is not supported")]
    OverloadedMethod { target: String, method: String },

    #[error("argument {position} of {target}::{method}: parameter is {expected}, argument is {found}")]
    ArgumentTypeMismatch {
        target: String,
        method: String,
        position: usize,
        expected: TypeInfo,
        found: TypeInfo,
    },

    #[error("argument {position} of {target}::{method}: {reason}")]
    IncompatibleArgument {
        target: String,
        method: String,
        position: usize,
        reason: String,
    },

    #[error(
        "argument {position} of {target}::{method} reads call argument {index}, \
         but {pipeline} declares {arity} parameters"
    )]
    IndexOutOfRange {
        pipeline: String,
        target: String,
        method: String,
        position: usize,
        index: usize,
        arity: usize,
    },

    #[error("{method} must return {expected}, but {found} is configured")]
    ReturnTypeMismatch {
        method: String,
        expected: TypeInfo,
        found: TypeInfo,
    },

    #[error("parameters of {method} do not match the signature declared by {interface}")]
    SignatureMismatch { interface: String, method: String },

    #[error("dispatcher was configured for {configured}, not {requested}")]
    InterfaceMismatch {
        configured: String,
        requested: String,
    },
}
