//! Minifiers applied to every wrapped module before it is bundled

use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("failed to run minifier `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("minifier `{program}` exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("minifier `{program}` produced non UTF-8 output")]
    Decode {
        program: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl MinifyError {
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Spawn { source, .. } => Some(source.to_string()),
            Self::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr.clone()),
            Self::Failed { .. } => None,
            Self::Decode { source, .. } => Some(source.to_string()),
        }
    }
}

/// An external minifier collaborator
pub trait Minifier {
    /// Return a semantically equivalent, smaller version of `code`
    fn minify(&self, code: &str) -> Result<String, MinifyError>;
}

impl<T: Minifier + ?Sized> Minifier for Box<T> {
    fn minify(&self, code: &str) -> Result<String, MinifyError> {
        (**self).minify(code)
    }
}

/// Strips indentation, trailing whitespace and blank lines.
///
/// Line structure is preserved, so automatic semicolon insertion behaves the
/// same as in the input. Multi-line template literals would lose their
/// indentation; neither the built-in compiler nor Skulpt emits them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineMinifier;

impl Minifier for LineMinifier {
    fn minify(&self, code: &str) -> Result<String, MinifyError> {
        let lines: Vec<&str> = code
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Pipes code through an external program such as `terser` or `babel-minify`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMinifier {
    program: String,
    args: Vec<String>,
}

impl CommandMinifier {
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Minifier for CommandMinifier {
    fn minify(&self, code: &str) -> Result<String, MinifyError> {
        let spawn_error = |source| MinifyError::Spawn {
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
            stdin.write_all(code.as_bytes()).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        if !output.status.success() {
            return Err(MinifyError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        let minified = String::from_utf8(output.stdout).map_err(|source| MinifyError::Decode {
            program: self.program.clone(),
            source,
        })?;
        Ok(minified.trim_end().to_owned())
    }
}
