//! Runs the bundling pipeline once: discover, compile, emit.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rustc_hash::FxHashSet;

use crate::{
    adapter::CompilerAdapter,
    bundle::{Bundle, Collision},
    compiler::{CommandCompiler, CompileError, DeferredCompiler, SourceCompiler},
    config::Config,
    emitter::{BundleEmitter, OutputTarget},
    error::{BundleError, BundleResult},
    minify::{CommandMinifier, LineMinifier, Minifier},
    util::{display_path, normalize_line_endings},
    walker::SourceWalker,
};

/// A source file that was skipped because it failed to compile
#[derive(Debug)]
pub struct CompileFailure {
    pub path: PathBuf,
    /// Name the module was compiled as
    pub module_name: String,
    pub error: CompileError,
}

/// What happened during a run
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Module keys in the emitted bundle, in emission order
    pub bundled: Vec<String>,
    pub failures: Vec<CompileFailure>,
    pub collisions: Vec<Collision>,
}

impl BuildReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct BundleOrchestrator {
    config: Config,
    compiler: Box<dyn SourceCompiler>,
    minifier: Box<dyn Minifier>,
}

impl std::fmt::Debug for BundleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BundleOrchestrator {
    /// Pick the compiler and minifier backends named by `config`
    pub fn new(config: Config) -> Self {
        let compiler: Box<dyn SourceCompiler> = match config
            .compiler
            .command
            .as_deref()
            .and_then(CommandCompiler::from_command)
        {
            Some(command) => Box::new(command),
            None => Box::new(DeferredCompiler::new()),
        };
        let minifier: Box<dyn Minifier> = match config
            .minifier
            .command
            .as_deref()
            .and_then(CommandMinifier::from_command)
        {
            Some(command) => Box::new(command),
            None => Box::new(LineMinifier),
        };
        Self::with_backends(config, compiler, minifier)
    }

    pub fn with_backends(
        config: Config,
        compiler: Box<dyn SourceCompiler>,
        minifier: Box<dyn Minifier>,
    ) -> Self {
        Self {
            config,
            compiler,
            minifier,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn walker(&self) -> SourceWalker {
        SourceWalker::new(self.config.roots.clone())
            .recursive(self.config.recursive)
            .follow_links(self.config.follow_links)
            .extensions(&self.config.extensions)
            .excludes(self.config.exclude.clone())
    }

    /// Discover and compile every source into an in-memory bundle.
    ///
    /// Compile failures are logged and recorded in the report; filesystem
    /// failures abort.
    pub fn build(&self) -> BundleResult<(Bundle, BuildReport)> {
        let walker = self.walker();
        walker.check_roots()?;

        let naming = self.config.naming();
        let adapter = CompilerAdapter::new(
            self.compiler.as_ref(),
            self.config.minify.then_some(self.minifier.as_ref()),
            &naming,
            self.config.compile_options(),
            &self.config.entry_point,
        );

        let mut bundle = Bundle::new();
        let mut report = BuildReport::default();

        // Repeated or nested roots reach the same file more than once
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();

        for discovered in walker.walk() {
            let path = discovered?.path();
            if !seen.insert(path.clone()) {
                debug!("Already processed {}", display_path(&path));
                continue;
            }
            let contents = read_source(&path)?;
            let compiled = contents
                .and_then(|source| adapter.compile_file(&path, &normalize_line_endings(source)));

            match compiled {
                Ok(entry) => {
                    info!("Compiled: {}", adapter.source_name(&path));
                    if let Some(collision) = bundle.insert(&path, entry) {
                        warn!(
                            "{} and {} both map to {}; keeping {}",
                            display_path(&collision.replaced),
                            display_path(&collision.kept),
                            collision.module_path,
                            display_path(&collision.kept),
                        );
                        report.collisions.push(collision);
                    }
                }
                Err(err) => {
                    let module_name = adapter.source_name(&path);
                    error!("Failed to compile: {module_name}");
                    error!("{}: {err}", display_path(&path));
                    if let Some(detail) = err.detail() {
                        error!("{detail}");
                    }
                    report.failures.push(CompileFailure {
                        path,
                        module_name,
                        error: err,
                    });
                }
            }
        }

        report.bundled = bundle.module_paths().map(str::to_owned).collect();
        Ok((bundle, report))
    }

    /// Build the bundle and write it to `target`
    pub fn run(&self, target: &OutputTarget) -> BundleResult<BuildReport> {
        let (bundle, report) = self.build()?;
        BundleEmitter::new(self.config.registration.clone()).emit(&bundle, target)?;

        if let OutputTarget::File(path) = target {
            debug!("Bundle written to {}", path.display());
        }
        info!("Bundled modules: {:?}", report.bundled);
        Ok(report)
    }
}

/// Read one source file. The outer error is fatal; an inner error means the
/// file is not UTF-8 and is only skipped.
fn read_source(path: &Path) -> BundleResult<Result<String, CompileError>> {
    let bytes = std::fs::read(path).map_err(|source| BundleError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8(bytes).map_err(CompileError::Decode))
}
