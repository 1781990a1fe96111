//! DbgHelp Adapter (§4.4): when an image carries no stabs, line information
//! instead comes from an external, platform-specific symbol API. This
//! module treats that API as a black box behind two collaborator traits,
//! so the rest of the crate never depends on it directly.
//!
//! The line iterator and symbol resolver are genuinely external (owned by
//! the host debugger's toolchain integration, e.g. a real Windows
//! `dbghelp.dll` session); this crate ships only null defaults for both,
//! since neither has a portable implementation to call into directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pool::StringPool;
use crate::record::{self, SymbolRecord};

/// One line mapping as reported by an external line-number provider,
/// before resolution, path chopping, or string interning.
#[derive(Debug, Clone)]
pub struct DbgHelpLine<'a> {
    pub address: u64,
    pub file: &'a str,
    pub line: u32,
    pub module_base: u64,
}

/// A stateful collaborator able to enumerate every address-to-line
/// mapping it knows about for the image under process, one at a time.
pub trait LineSource {
    fn next_line(&mut self) -> Option<DbgHelpLine<'_>>;
}

/// Resolves an address to the name of the function containing it.
/// `None` means "not found", which discards the line record entirely.
pub trait SymbolResolver {
    fn resolve(&self, address: u64) -> Option<&str>;
}

/// A [`LineSource`] that reports nothing, used whenever no line provider
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLineSource;

impl LineSource for NullLineSource {
    fn next_line(&mut self) -> Option<DbgHelpLine<'_>> {
        None
    }
}

/// A [`SymbolResolver`] that never finds anything, used alongside
/// [`NullLineSource`] when no dbghelp session is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSymbolResolver;

impl SymbolResolver for NullSymbolResolver {
    fn resolve(&self, _address: u64) -> Option<&str> {
        None
    }
}

/// Decode every line reported by `source` into sorted symbol records.
///
/// A line whose address `resolver` cannot name is dropped. File paths are
/// deduplicated before interning: distinct lines sharing the same
/// reported path resolve to a single pool offset, so a function with a
/// thousand lines interns its file name once.
pub fn decode(
    source: &mut dyn LineSource,
    resolver: &dyn SymbolResolver,
    source_path: Option<&Path>,
    pool: &mut StringPool,
) -> Vec<SymbolRecord> {
    let mut resolved_files: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::new();

    while let Some(line) = source.next_line() {
        let Some(function_name) = resolver.resolve(line.address) else {
            continue;
        };

        let file_offset = match resolved_files.get(line.file) {
            Some(&offset) => offset,
            None => {
                let offset = match source_path.and_then(|root| chop_path(root, line.file)) {
                    Some(chopped) => pool.intern(chopped.to_string_lossy().as_bytes()),
                    None => pool.intern(line.file.as_bytes()),
                };
                resolved_files.insert(line.file.to_string(), offset);
                offset
            }
        };
        let function_offset = pool.intern(function_name.as_bytes());

        records.push(SymbolRecord {
            address: line.address.wrapping_sub(line.module_base) as u32,
            file_offset,
            function_offset,
            source_line: line.line,
        });
    }

    record::sort(&mut records);
    records
}

/// Reported paths come from the machine that built the image, and rarely
/// exist verbatim on the machine running this tool. Walk `reported`'s
/// components from the end, joining each growing suffix onto `source_path`,
/// and return the longest suffix that exists on disk under `source_path`.
fn chop_path(source_path: &Path, reported: &str) -> Option<PathBuf> {
    let components: Vec<&str> = reported
        .split(|c| c == '/' || c == '\\')
        .filter(|c| !c.is_empty())
        .collect();

    for start in 0..components.len() {
        let mut candidate = source_path.to_path_buf();
        for component in &components[start..] {
            candidate.push(component);
        }
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
