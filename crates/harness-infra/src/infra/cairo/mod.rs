//! Cairo 0 subset understood by the in-memory runtime.

mod ast;
mod compiler;
mod lexer;
mod parser;
mod vm;

pub use compiler::{CompiledContract, FunctionDef, FunctionKind};
pub use vm::{DEFAULT_STEP_LIMIT, ExecError, MAX_CALL_DEPTH, Storage, Vm};

use crate::usecases::ports::CompileDiagnostic;
use lexer::SourceMap;

/// Parses and checks `src`, reporting every diagnostic with its 1-based line
/// and column.
pub fn compile_source(src: &str) -> Result<CompiledContract, Vec<CompileDiagnostic>> {
    let map = SourceMap::new(src);
    let module = parser::parse(src, &map).map_err(|errors| {
        errors
            .into_iter()
            .map(|err| diagnostic(&map, err.span.start, err.message))
            .collect::<Vec<_>>()
    })?;
    compiler::compile(module, map.clone()).map_err(|errors| {
        errors
            .into_iter()
            .map(|err| diagnostic(&map, err.span.start, err.message))
            .collect()
    })
}

fn diagnostic(map: &SourceMap, offset: usize, message: String) -> CompileDiagnostic {
    let (line, column) = map.line_col(offset);
    CompileDiagnostic::new(line, column, message)
}
