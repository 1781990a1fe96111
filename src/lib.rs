//! Post-link symbol embedding for PE images.
//!
//! Given a linked PE image carrying stabs debug info (or, failing that, a
//! platform line-number provider plus its COFF symbol table), this crate
//! strips the debug sections and embeds a compact `.rossym` address table
//! in their place — sorted `(Address, FileOffset, FunctionOffset,
//! SourceLine)` records plus a shared string pool, cheap enough for a
//! runtime crash handler to binary-search without needing a separate
//! symbol server.

mod checksum;
mod coff_symbols;
mod dbghelp;
mod endian;
mod error;
mod format;
mod logging;
mod merge;
mod orchestrator;
mod pod;
mod pool;
mod record;
mod reloc;
mod rossym;
mod stabs;
#[cfg(test)]
mod testutil;
mod util;
mod view;
mod writer;

use std::path::PathBuf;

pub use dbghelp::{DbgHelpLine, LineSource, NullLineSource, NullSymbolResolver, SymbolResolver};
pub use error::{Error, ErrorKind, Result};
pub use record::SymbolRecord;

/// Configuration for a single [`run`] invocation.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    /// Root directory to search when resolving source file paths reported
    /// by an external line-number provider (§4.4's path-chop heuristic).
    /// Has no effect on images carrying stabs, which embed their own
    /// paths directly.
    pub source_path: Option<PathBuf>,
}

/// Run the embedding pipeline over `data`.
///
/// Returns `Ok(None)` for an ELF image (a successful no-op, per §6), or
/// `Ok(Some(bytes))` with the rewritten PE image otherwise. `line_source`
/// and `resolver` supply line and function-name information for images
/// with no stabs section; pass [`NullLineSource`] and
/// [`NullSymbolResolver`] when neither is available.
pub fn run(
    data: &[u8],
    options: &Options,
    line_source: &mut dyn LineSource,
    resolver: &dyn SymbolResolver,
) -> Result<Option<Vec<u8>>> {
    orchestrator::process(data, options, line_source, resolver)
}
