//! Turns one discovered source file into a bundle entry
//!
//! The compiled body is wrapped with a trailer that binds the loader's
//! well-known entry-point name to whatever function the compiler generated,
//! then minified.

use std::path::Path;

use crate::{
    compiler::{CompileError, CompileOptions, SourceCompiler},
    minify::Minifier,
    module_path::ModuleNaming,
};

/// Name the Skulpt loader calls to initialize a JavaScript module
pub const DEFAULT_ENTRY_POINT: &str = "$builtinmodule";

/// One compiled module, ready to be registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEntry {
    /// Key the module is registered under
    pub module_path: String,
    /// Compiled body plus the entry-point trailer
    pub wrapped_code: String,
}

#[derive(Debug)]
pub struct CompilerAdapter<'a, C: ?Sized, M: ?Sized> {
    compiler: &'a C,
    /// `None` disables minification
    minifier: Option<&'a M>,
    naming: &'a ModuleNaming,
    options: CompileOptions,
    entry_point: &'a str,
}

impl<'a, C, M> CompilerAdapter<'a, C, M>
where
    C: SourceCompiler + ?Sized,
    M: Minifier + ?Sized,
{
    pub fn new(
        compiler: &'a C,
        minifier: Option<&'a M>,
        naming: &'a ModuleNaming,
        options: CompileOptions,
        entry_point: &'a str,
    ) -> Self {
        Self {
            compiler,
            minifier,
            naming,
            options,
            entry_point,
        }
    }

    /// Name passed to the compiler for `path`
    pub fn source_name(&self, path: &Path) -> String {
        self.naming.source_name(path)
    }

    /// Compile, wrap and minify the contents of `path`
    pub fn compile_file(&self, path: &Path, contents: &str) -> Result<CompiledEntry, CompileError> {
        let source_name = self.naming.source_name(path);
        let unit = self
            .compiler
            .compile(contents, &source_name, &self.options)?;

        let wrapped = format!("{}\nvar {} = {};", unit.code, self.entry_point, unit.funcname);
        let wrapped_code = match self.minifier {
            Some(minifier) => minifier.minify(&wrapped)?,
            None => wrapped,
        };

        Ok(CompiledEntry {
            module_path: self.naming.module_key(path),
            wrapped_code,
        })
    }
}
