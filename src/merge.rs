//! Symbol Merger (§4.5): combines stabs- and COFF-derived records into one
//! sorted table.
//!
//! Stabs records take priority: COFF only fills in fields stabs left at 0.
//! A COFF entry that fuses into a stabs record is marked consumed in a
//! side bitmap — the input slice itself is never mutated — and any COFF
//! entry left unconsumed with a real address and function name is
//! appended as an orphan.

use crate::record::{self, SymbolRecord};

/// Merge already-sorted `stabs` and `coff` record sets.
///
/// A COFF record fuses into the stabs record whose function it falls
/// within, not only one at the exact same address: stabs describes line
/// granularity but often leaves an assembly-written function unnamed, so
/// a COFF symbol anywhere between that function's start and the next
/// stabs record (or end of the table, for the last function) still
/// supplies the missing name.
pub fn merge(stabs: &[SymbolRecord], coff: &[SymbolRecord]) -> Vec<SymbolRecord> {
    let mut merged = collapse_same_address_runs(stabs);
    let mut consumed = vec![false; coff.len()];

    for i in 0..merged.len() {
        // Only a record stabs left unnamed is a candidate: COFF is the
        // authority for a function name only when stabs never supplied one.
        if merged[i].function_offset != 0 {
            continue;
        }
        let window_start = merged[i].address;
        let window_end = merged.get(i + 1).map_or(u32::MAX, |next| next.address);
        let fusion = coff.iter().enumerate().find(|(j, rec)| {
            !consumed[*j] && rec.function_offset != 0 && rec.address >= window_start && rec.address < window_end
        });
        if let Some((j, rec)) = fusion {
            merged[i].inherit_missing_from(rec);
            consumed[j] = true;
        }
    }

    for (i, rec) in coff.iter().enumerate() {
        if !consumed[i] && rec.address != 0 && rec.function_offset != 0 {
            merged.push(*rec);
        }
    }

    record::sort(&mut merged);
    merged
}

/// Collapse adjacent same-address stabs records (e.g. an `N_FUN` entry
/// immediately followed by its first `N_SLINE`) into one, filling any
/// field the earlier record left at 0 from the later one.
fn collapse_same_address_runs(stabs: &[SymbolRecord]) -> Vec<SymbolRecord> {
    let mut out: Vec<SymbolRecord> = Vec::with_capacity(stabs.len());
    for &rec in stabs {
        match out.last_mut() {
            Some(last) if last.address == rec.address => last.inherit_missing_from(&rec),
            _ => out.push(rec),
        }
    }
    out
}
