//! Error types for pipeline compilation.
//!
//! Two kinds of failure leave this crate: an unsupported target, raised before
//! any step is produced, and whatever an engine collaborator reports while the
//! pipeline is being applied. The latter is forwarded unchanged.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PipelineErrorCode {
    /// Target identifier is not in the profile table, or is a boolean sentinel
    UnsupportedTarget = 9100,
    /// Raised by the engine or one of its extensions
    Engine = 9101,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{code}] Unsupported target '{target}'.")]
    UnsupportedTarget { code: u32, target: String },

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn unsupported_target(target: impl Into<String>) -> Self {
        Self::UnsupportedTarget {
            code: PipelineErrorCode::UnsupportedTarget as u32,
            target: target.into(),
        }
    }

    pub fn code(&self) -> PipelineErrorCode {
        match self {
            Self::UnsupportedTarget { .. } => PipelineErrorCode::UnsupportedTarget,
            Self::Engine(_) => PipelineErrorCode::Engine,
        }
    }
}
