//! Stabs Decoder (§4.2): turns the `.stab`/`.stabstr` section pair into
//! [`SymbolRecord`]s.
//!
//! Stabs encodes a function's address directly on its `N_FUN` record, but
//! the `N_SLINE` records that follow it carry only the offset from that
//! function's start. `LastFunctionAddress` is the rolling cursor that makes
//! those offsets absolute again.

use crate::format::{stab_type, StabEntry};
use crate::pod::Bytes;
use crate::pool::StringPool;
use crate::record::{self, SymbolRecord};
use crate::{Error, Result};

const MAX_NAME_LEN: usize = 255;

/// Decode a `.stab`/`.stabstr` section pair into sorted symbol records.
///
/// `image_base` converts the absolute virtual addresses stabs records
/// carry into the RVAs the rest of the pipeline (and `.rossym`'s
/// contract) deal in.
pub fn decode(stab: &[u8], stabstr: &[u8], image_base: u32, pool: &mut StringPool) -> Result<Vec<SymbolRecord>> {
    if stab.len() % std::mem::size_of::<StabEntry>() != 0 {
        return Err(Error::bad_debug(".stab section length is not a multiple of 12"));
    }
    let entries: &[StabEntry] = Bytes(stab)
        .read_slice(stab.len() / std::mem::size_of::<StabEntry>())
        .map_err(|()| Error::bad_debug("failed to read .stab entries"))?;

    let mut records = Vec::new();
    let mut current_file = 0u32;
    let mut current_function = 0u32;
    let mut last_function_address = 0u32;

    for entry in entries {
        let value = entry.n_value.get();
        match entry.n_type {
            stab_type::N_SO | stab_type::N_SOL | stab_type::N_BINCL => {
                let name = read_stab_string(stabstr, entry.n_strx.get())?;
                check_name_len(name)?;
                if is_valid_file_name(name) && value >= image_base {
                    current_file = pool.intern(name);
                }
            }
            stab_type::N_FUN => {
                if entry.n_desc.get() == 0 || value < image_base {
                    // End-of-function marker: reset the cursor so the next
                    // N_FUN is treated as opening a fresh function.
                    last_function_address = 0;
                    continue;
                }
                let name = read_stab_string(stabstr, entry.n_strx.get())?;
                check_name_len(name)?;
                let name = truncate_at_colon(name);
                current_function = pool.intern(name);
                let address = value - image_base;
                last_function_address = address;
                records.push(SymbolRecord {
                    address,
                    file_offset: current_file,
                    function_offset: current_function,
                    source_line: 0,
                });
            }
            stab_type::N_SLINE => {
                records.push(SymbolRecord {
                    address: last_function_address.wrapping_add(value),
                    file_offset: current_file,
                    function_offset: current_function,
                    source_line: entry.n_desc.get() as u32,
                });
            }
            _ => {}
        }
    }

    record::sort(&mut records);
    Ok(records)
}

/// A valid stabs file name is nonempty and does not end in a path
/// separator; a trailing separator marks an `N_BINCL` directory entry
/// rather than a file, and those are not interned as `FileOffset`s.
fn is_valid_file_name(name: &[u8]) -> bool {
    match name.last() {
        None => false,
        Some(b'/') | Some(b'\\') => false,
        Some(_) => true,
    }
}

fn read_stab_string(stabstr: &[u8], offset: u32) -> Result<&[u8]> {
    if offset == 0 {
        return Ok(b"");
    }
    Bytes(stabstr)
        .read_string_at(offset as usize)
        .map_err(|()| Error::bad_debug("stab string offset out of bounds"))
}

fn check_name_len(name: &[u8]) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(Error::bad_debug("stab name exceeds 255 bytes"));
    }
    Ok(())
}

/// Stabs function names carry a type descriptor after a colon, e.g.
/// `main:F(0,1)`; only the part before the first `:` is the symbol name.
fn truncate_at_colon(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(i) => &name[..i],
        None => name,
    }
}
