//! Compiler backed by an external program
//!
//! The program receives one JSON request on stdin:
//!
//! ```json
//! {"source": "...", "name": "src/lib/pkg/mod.py", "mode": "exec", "can_suspend": true, "annotate": false}
//! ```
//!
//! and answers on stdout with either `{"code": "...", "funcname": "..."}` or
//! `{"error": {"message": "...", "detail": "..."}}`. A non-zero exit status is
//! treated as a rejection with stderr as the diagnostic detail.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use serde::{Deserialize, Serialize};

use super::{CompileError, CompileMode, CompileOptions, CompiledUnit, SourceCompiler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    source: &'a str,
    name: &'a str,
    mode: CompileMode,
    can_suspend: bool,
    annotate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompileResponse {
    Compiled(CompiledUnit),
    Failed { error: RejectedCompile },
}

#[derive(Debug, Deserialize)]
struct RejectedCompile {
    message: String,
    #[serde(default)]
    detail: Option<String>,
}

impl CommandCompiler {
    /// Build from a command line such as `["node", "tools/compile.js"]`.
    /// Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, request: &[u8]) -> Result<std::process::Output, CompileError> {
        let spawn_error = |source| CompileError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request).map_err(spawn_error)?;
        }
        child.wait_with_output().map_err(spawn_error)
    }
}

impl SourceCompiler for CommandCompiler {
    fn compile(
        &self,
        source: &str,
        module_name: &str,
        options: &CompileOptions,
    ) -> Result<CompiledUnit, CompileError> {
        let request = serde_json::to_vec(&CompileRequest {
            source,
            name: module_name,
            mode: options.mode,
            can_suspend: options.can_suspend,
            annotate: options.annotate,
        })
        .map_err(CompileError::Protocol)?;

        let output = self.run(&request)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(CompileError::Rejected {
                message: format!("`{}` exited with {}", self.program, output.status),
                detail: (!stderr.is_empty()).then_some(stderr),
            });
        }

        match serde_json::from_slice(&output.stdout).map_err(CompileError::Protocol)? {
            CompileResponse::Compiled(unit) => Ok(unit),
            CompileResponse::Failed { error } => Err(CompileError::Rejected {
                message: error.message,
                detail: error.detail,
            }),
        }
    }
}
