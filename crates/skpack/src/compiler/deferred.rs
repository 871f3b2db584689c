//! Built-in compiler that checks sources ahead of time and leaves code
//! generation to the browser runtime.
//!
//! Every module is parsed with ruff's parser and then checked for the
//! compile-time errors the grammar alone accepts (`return` at module level,
//! `break` outside a loop, ...), so they are reported at bundle time with a
//! line and column instead of on first import in the browser. The accepted
//! source is embedded unchanged, so runtime tracebacks keep the original line
//! numbers, in an entry-point function that calls the runtime's own
//! `Sk.compile` with the same mode and flags a build-time compiler would have
//! received.

use ruff_python_parser::parse_module;
use ruff_text_size::TextSize;

use super::{CompileError, CompileOptions, CompiledUnit, SourceCompiler, syntax_check};
use crate::util::js_string_literal;

/// Compiler that validates Python syntax and defers code generation
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredCompiler;

impl DeferredCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Reject `source` if CPython would refuse to compile it
    fn check(source: &str) -> Result<(), CompileError> {
        let parsed = parse_module(source).map_err(|err| {
            syntax_error(source, err.error.to_string(), err.location.start())
        })?;
        match syntax_check::check_module(parsed.syntax()) {
            Some(misplaced) => Err(syntax_error(
                source,
                misplaced.message,
                misplaced.range.start(),
            )),
            None => Ok(()),
        }
    }
}

impl SourceCompiler for DeferredCompiler {
    fn compile(
        &self,
        source: &str,
        module_name: &str,
        options: &CompileOptions,
    ) -> Result<CompiledUnit, CompileError> {
        Self::check(source)?;
        let funcname = entry_point_name(module_name);

        // The generated function forwards whatever arguments the loader passes,
        // so it behaves exactly like the function `Sk.compile` would define.
        let code = format!(
            "var {funcname} = function() {{\n    var co = Sk.compile({source}, {name}, {mode}, \
             {can_suspend}, {annotate});\n    return Sk.global[\"eval\"](co.code + \"\\n\" + \
             co.funcname).apply(this, arguments);\n}};",
            source = js_string_literal(source),
            name = js_string_literal(module_name),
            mode = js_string_literal(options.mode.as_str()),
            can_suspend = options.can_suspend,
            annotate = options.annotate,
        );

        log::trace!("Deferred compile of {module_name} as {funcname}");
        Ok(CompiledUnit { code, funcname })
    }
}

/// `$deferred_` followed by the module name with every character that is not
/// valid in a JavaScript identifier replaced by `_`
fn entry_point_name(module_name: &str) -> String {
    let sanitized: String = module_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("$deferred_{sanitized}")
}

fn syntax_error(source: &str, message: String, offset: TextSize) -> CompileError {
    let (line, column) = line_column(source, offset);
    CompileError::Syntax {
        message,
        line,
        column,
    }
}

/// One-based line and column (in characters) of a byte offset
fn line_column(source: &str, offset: TextSize) -> (usize, usize) {
    let before = source.get(..usize::from(offset)).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
