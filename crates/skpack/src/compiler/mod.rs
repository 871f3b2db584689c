//! Source compilers
//!
//! The pipeline never translates Python itself. It hands each file to a
//! [`SourceCompiler`] and only relies on the returned [`CompiledUnit`]: an
//! executable body plus the name of the entry-point function it defines.

mod command;
mod deferred;
mod syntax_check;

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use command::CommandCompiler;
pub use deferred::DeferredCompiler;

use crate::minify::MinifyError;

/// Compilation mode understood by the runtime compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// Compile a whole module for execution
    #[default]
    Exec,
}

impl CompileMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exec => "exec",
        }
    }
}

/// Flags passed along with every compile request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub mode: CompileMode,
    /// Emit code that may suspend (needed for `input()`, `time.sleep()`, ...)
    pub can_suspend: bool,
    /// Emit source annotations for debugging
    pub annotate: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: CompileMode::Exec,
            can_suspend: true,
            annotate: false,
        }
    }
}

/// Output of a successful compile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompiledUnit {
    /// Executable JavaScript body
    pub code: String,
    /// Name of the entry-point function defined by `code`
    pub funcname: String,
}

/// Per-file compile failure. Never aborts a run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("{message}")]
    Rejected {
        message: String,
        detail: Option<String>,
    },

    #[error("source is not valid UTF-8")]
    Decode(#[source] std::string::FromUtf8Error),

    #[error("failed to run compiler `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("compiler returned an unreadable response")]
    Protocol(#[source] serde_json::Error),

    #[error(transparent)]
    Minify(#[from] MinifyError),
}

impl CompileError {
    /// Additional diagnostic output, when the compiler provided any
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Rejected { detail, .. } => detail.clone(),
            Self::Decode(err) => Some(format!(
                "invalid byte sequence at offset {}",
                err.utf8_error().valid_up_to()
            )),
            Self::Spawn { source, .. } => Some(source.to_string()),
            Self::Protocol(err) => Some(err.to_string()),
            Self::Minify(err) => err.detail(),
            Self::Syntax { .. } => None,
        }
    }
}

/// An external compiler collaborator
pub trait SourceCompiler {
    /// Compile `source` registered as `module_name`
    fn compile(
        &self,
        source: &str,
        module_name: &str,
        options: &CompileOptions,
    ) -> Result<CompiledUnit, CompileError>;
}

impl<T: SourceCompiler + ?Sized> SourceCompiler for Box<T> {
    fn compile(
        &self,
        source: &str,
        module_name: &str,
        options: &CompileOptions,
    ) -> Result<CompiledUnit, CompileError> {
        (**self).compile(source, module_name, options)
    }
}
