//! Serializes a [`Bundle`] into the registration script
//!
//! Every module becomes one statement. With the default style:
//!
//! ```text
//! Sk.builtinFiles.files["src/lib/pedal/core.js"] = "<wrapped code>"
//! ```
//!
//! Statements are joined with `\n`, without a trailing newline.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};

use crate::{
    bundle::Bundle,
    error::{BundleError, BundleResult},
    util::js_string_literal,
};

/// Syntax of one registration statement
///
/// The generic loader form is `registerModule("<key>", "<code>")`, available
/// as [`RegistrationStyle::Call`]. The default is instead the assignment into
/// `Sk.builtinFiles.files` that Skulpt's stock loader reads, so a bundle works
/// without a custom `registerModule` shim on the page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum RegistrationStyle {
    /// `Sk.builtinFiles.files["<key>"] = "<code>"`
    #[default]
    SkulptFiles,
    /// `<function>("<key>", "<code>")`
    Call { function: String },
}

impl RegistrationStyle {
    /// Render the statement registering `code` under `module_path`
    pub fn statement(&self, module_path: &str, code: &str) -> String {
        let key = js_string_literal(module_path);
        let value = js_string_literal(code);
        match self {
            Self::SkulptFiles => format!("Sk.builtinFiles.files[{key}] = {value}"),
            Self::Call { function } => format!("{function}({key}, {value})"),
        }
    }
}

/// Where the rendered bundle goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

#[derive(Debug, Clone, Default)]
pub struct BundleEmitter {
    style: RegistrationStyle,
}

impl BundleEmitter {
    pub fn new(style: RegistrationStyle) -> Self {
        Self { style }
    }

    /// Render every entry of `bundle` in the bundle's iteration order
    pub fn render(&self, bundle: &Bundle) -> String {
        bundle
            .iter()
            .map(|(module_path, code)| self.style.statement(module_path, code))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render `bundle` and write it to `target`, replacing any previous content
    pub fn emit(&self, bundle: &Bundle, target: &OutputTarget) -> BundleResult<()> {
        let rendered = self.render(bundle);
        match target {
            OutputTarget::File(path) => write_atomically(path, rendered.as_bytes()),
            OutputTarget::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(|source| BundleError::Write {
                        path: PathBuf::from("<stdout>"),
                        source,
                    })
            }
        }
    }
}

/// Write through a temporary file in the target's directory and rename it
/// over the target, so readers never observe a half-written bundle.
///
/// The target keeps its existing permissions. A new target gets the same
/// umask-derived mode a plain `File::create` would give it.
fn write_atomically(path: &Path, contents: &[u8]) -> BundleResult<()> {
    let write_error = |source| BundleError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = temp_file_in(dir).map_err(write_error)?;
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    }
    file.write_all(contents).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path)
        .map_err(|err| write_error(err.error))?;

    log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Temporary files are created 0600 by default; ask for 0666 so the
/// process umask decides, as it does for `File::create`.
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".skpack");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
