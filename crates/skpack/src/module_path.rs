//! Derivation of internal module paths
//!
//! A discovered file's path, exactly as the walker produced it from the
//! configured root, is turned into the key the runtime loader looks up:
//! leading `..`, `.` and root components are stripped, the library root is
//! prefixed, and the source extension is swapped for the target extension.
//!
//! `../../pedal/report/feedback.py` becomes `src/lib/pedal/report/feedback.js`.

use std::path::{Component, Path};

use crate::util::to_slash_components;

/// Naming rules for the modules of one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNaming {
    /// Prefix prepended to every module key (e.g. `src/lib`)
    library_root: String,
    /// Extension of the registered module, without the leading dot
    target_extension: String,
}

impl Default for ModuleNaming {
    fn default() -> Self {
        Self::new("src/lib", "js")
    }
}

impl ModuleNaming {
    pub fn new(library_root: &str, target_extension: &str) -> Self {
        Self {
            library_root: library_root.trim_end_matches('/').to_owned(),
            target_extension: target_extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Name handed to the compiler: library root plus the relative path,
    /// keeping the source extension.
    pub fn source_name(&self, path: &Path) -> String {
        let relative = to_slash_components(strip_leading_markers(path));
        if self.library_root.is_empty() {
            relative
        } else {
            format!("{}/{relative}", self.library_root)
        }
    }

    /// Key the compiled module is registered under in the bundle
    pub fn module_key(&self, path: &Path) -> String {
        let with_target = path.with_extension(&self.target_extension);
        self.source_name(&with_target)
    }
}

/// Skip every leading component that does not name a directory or file:
/// `..`, `.`, a root separator or a Windows prefix.
fn strip_leading_markers(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components()
        .skip_while(|component| !matches!(component, Component::Normal(_)))
}
