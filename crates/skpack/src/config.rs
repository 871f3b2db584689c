//! Configuration
//!
//! Layers are applied in order, later layers overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. user config (`~/.config/skpack/skpack.toml`)
//! 3. project config (`./skpack.toml`)
//! 4. an explicit `--config` file
//! 5. `SKPACK_*` environment variables
//! 6. command line flags (applied by the binary)
//!
//! Paths are kept exactly as written. Module keys are derived from the path
//! a file was reached through, so `../../pedal` yields `src/lib/pedal/...`.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    adapter::DEFAULT_ENTRY_POINT,
    compiler::CompileOptions,
    dirs::{CONFIG_FILE_NAME, user_config_file},
    emitter::RegistrationStyle,
    module_path::ModuleNaming,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("no source roots configured; pass --root or set `roots` in {CONFIG_FILE_NAME}")]
    NoRoots,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// External compiler command line. The built-in compiler is used when unset.
    pub command: Option<Vec<String>>,
    pub can_suspend: bool,
    pub annotate: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let options = CompileOptions::default();
        Self {
            command: None,
            can_suspend: options.can_suspend,
            annotate: options.annotate,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifierConfig {
    /// External minifier command line. The built-in line minifier is used when unset.
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directories searched for sources
    pub roots: Vec<PathBuf>,
    /// Files and directories skipped entirely (exact path match)
    pub exclude: Vec<PathBuf>,
    /// Accepted source extensions
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub follow_links: bool,
    pub output: PathBuf,
    /// Prefix of every module key
    pub library_root: String,
    /// Extension of every module key
    pub target_extension: String,
    /// Name the loader calls to initialize a module
    pub entry_point: String,
    pub minify: bool,
    pub compiler: CompilerConfig,
    pub minifier: MinifierConfig,
    pub registration: RegistrationStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            exclude: Vec::new(),
            extensions: vec!["py".to_owned()],
            recursive: true,
            follow_links: false,
            output: PathBuf::from("dist/skulpt-bundle.js"),
            library_root: "src/lib".to_owned(),
            target_extension: "js".to_owned(),
            entry_point: DEFAULT_ENTRY_POINT.to_owned(),
            minify: true,
            compiler: CompilerConfig::default(),
            minifier: MinifierConfig::default(),
            registration: RegistrationStyle::default(),
        }
    }
}

/// A single config file. Only the keys it sets override earlier layers.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigLayer {
    roots: Option<Vec<PathBuf>>,
    exclude: Option<Vec<PathBuf>>,
    extensions: Option<Vec<String>>,
    recursive: Option<bool>,
    follow_links: Option<bool>,
    output: Option<PathBuf>,
    library_root: Option<String>,
    target_extension: Option<String>,
    entry_point: Option<String>,
    minify: Option<bool>,
    compiler: Option<CompilerLayer>,
    minifier: Option<MinifierConfig>,
    registration: Option<RegistrationStyle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CompilerLayer {
    command: Option<Vec<String>>,
    can_suspend: Option<bool>,
    annotate: Option<bool>,
}

macro_rules! apply_fields {
    ($target:expr, $layer:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $layer.$field {
                $target.$field = value;
            }
        )*
    };
}

impl Config {
    /// Load every configuration layer except command line flags
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(user_file) = user_config_file()
            && user_file.is_file()
        {
            log::debug!("Loading user config from {}", user_file.display());
            config.apply_file(&user_file)?;
        }

        let project_file = Path::new(CONFIG_FILE_NAME);
        if project_file.is_file() {
            log::debug!("Loading project config from {}", project_file.display());
            config.apply_file(project_file)?;
        }

        if let Some(path) = explicit {
            log::debug!("Loading config from {}", path.display());
            config.apply_file(path)?;
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a complete configuration from TOML, starting from the defaults
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_toml_str(content, origin)?;
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_toml_str(&content, path)
    }

    fn apply_toml_str(&mut self, content: &str, origin: &Path) -> Result<(), ConfigError> {
        let layer: ConfigLayer = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        self.apply_layer(layer);
        Ok(())
    }

    fn apply_layer(&mut self, layer: ConfigLayer) {
        apply_fields!(
            self,
            layer,
            [
                roots,
                exclude,
                extensions,
                recursive,
                follow_links,
                output,
                library_root,
                target_extension,
                entry_point,
                minify,
                minifier,
                registration,
            ]
        );
        if let Some(compiler) = layer.compiler {
            if compiler.command.is_some() {
                self.compiler.command = compiler.command;
            }
            apply_fields!(self.compiler, compiler, [can_suspend, annotate]);
        }
    }

    /// Apply `SKPACK_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_with(|name| std::env::var_os(name))
    }

    /// Apply `SKPACK_*` variables looked up through `lookup`
    ///
    /// `SKPACK_ROOTS` and `SKPACK_EXCLUDE` are platform path lists (`:`
    /// separated on Unix), `SKPACK_OUTPUT` is a path and `SKPACK_MINIFY` a
    /// boolean.
    pub fn apply_env_overrides_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<(), ConfigError> {
        if let Some(roots) = lookup("SKPACK_ROOTS") {
            self.roots = std::env::split_paths(&roots).collect();
        }
        if let Some(exclude) = lookup("SKPACK_EXCLUDE") {
            self.exclude = std::env::split_paths(&exclude).collect();
        }
        if let Some(output) = lookup("SKPACK_OUTPUT") {
            self.output = PathBuf::from(output);
        }
        if let Some(minify) = lookup("SKPACK_MINIFY") {
            self.minify = parse_bool("SKPACK_MINIFY", &minify)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }
        Ok(())
    }

    pub fn naming(&self) -> ModuleNaming {
        ModuleNaming::new(&self.library_root, &self.target_extension)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            can_suspend: self.compiler.can_suspend,
            annotate: self.compiler.annotate,
            ..CompileOptions::default()
        }
    }
}

fn parse_bool(name: &'static str, value: &OsString) -> Result<bool, ConfigError> {
    let text = value.to_string_lossy();
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: text.into_owned(),
        }),
    }
}
