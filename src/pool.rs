//! Append-only string pool with hashed deduplication (§4.1 String Pool).
//!
//! Offset 0 always holds the empty string, so a Symbol Record with
//! `FileOffset == 0` or `FunctionOffset == 0` is self-consistent without
//! any special-casing at the consumer.

const BUCKET_COUNT: usize = 1024;

/// Append-only pool of NUL-terminated byte strings, indexed by stable byte
/// offset.
#[derive(Debug, Default)]
pub struct StringPool {
    data: Vec<u8>,
    // Bucket lists hold `(offset, length)`; the bytes themselves live in
    // `data` and are re-read for comparison, so nothing is duplicated here.
    buckets: Vec<Vec<(u32, u32)>>,
}

impl StringPool {
    /// Create a new pool with offset 0 pre-populated as `""`.
    pub fn new() -> Self {
        let mut pool = Self {
            data: vec![0u8],
            buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
        };
        pool.bucket_for(b"").push((0, 0));
        pool
    }

    fn bucket_for(&mut self, s: &[u8]) -> &mut Vec<(u32, u32)> {
        let index = djb_hash(s) as usize % BUCKET_COUNT;
        &mut self.buckets[index]
    }

    /// Intern `s`, returning its stable byte offset. Appends `s` plus a
    /// trailing NUL if it has not already been interned.
    pub fn intern(&mut self, s: &[u8]) -> u32 {
        let index = djb_hash(s) as usize % BUCKET_COUNT;
        for &(offset, len) in &self.buckets[index] {
            if &self.data[offset as usize..offset as usize + len as usize] == s {
                return offset;
            }
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s);
        self.data.push(0);
        self.buckets[index].push((offset, s.len() as u32));
        offset
    }

    /// Read the string starting at `offset`.
    ///
    /// Panics if `offset` does not point at the start of an interned
    /// string; callers that read offsets out of an untrusted `.rossym`
    /// table should instead scan `as_bytes()` directly.
    pub fn get(&self, offset: u32) -> &[u8] {
        let start = offset as usize;
        let len = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .expect("interned string is NUL-terminated");
        &self.data[start..start + len]
    }

    /// The pool's raw byte contents, as written to the `.rossym` payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// DJB hash: `h = 5381; h = 33*h + c` for each byte.
fn djb_hash(s: &[u8]) -> u32 {
    let mut h: u32 = 5381;
    for &c in s {
        h = h.wrapping_mul(33).wrapping_add(c as u32);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_zero_is_empty_string() {
        let pool = StringPool::new();
        assert_eq!(pool.get(0), b"");
    }

    #[test]
    fn intern_is_idempotent() {
        let mut pool = StringPool::new();
        let a = pool.intern(b"foo.c");
        let tail_len = pool.len();
        let b = pool.intern(b"foo.c");
        assert_eq!(a, b);
        assert_eq!(pool.len(), tail_len, "pool must not grow on repeat intern");
    }

    #[test]
    fn distinct_strings_get_distinct_offsets() {
        let mut pool = StringPool::new();
        let a = pool.intern(b"alpha");
        let b = pool.intern(b"beta");
        assert_ne!(a, b);
        assert_eq!(pool.get(a), b"alpha");
        assert_eq!(pool.get(b), b"beta");
    }

    #[test]
    fn hash_collisions_still_resolve_correctly() {
        // Force every string into bucket 0 regardless of its real hash by
        // interning enough distinct strings that collisions are certain
        // within 1024 buckets, then confirm every one still round-trips.
        let mut pool = StringPool::new();
        let strings: Vec<Vec<u8>> = (0..4000u32).map(|i| format!("s{i}").into_bytes()).collect();
        let offsets: Vec<u32> = strings.iter().map(|s| pool.intern(s)).collect();
        for (s, off) in strings.iter().zip(offsets.iter()) {
            assert_eq!(pool.get(*off), s.as_slice());
        }
    }

    #[test]
    fn repeating_sequence_yields_same_offsets_and_unchanged_tail() {
        let mut pool = StringPool::new();
        let seq: &[&[u8]] = &[b"a.c", b"main", b"a.c", b"helper", b"main"];
        let first: Vec<u32> = seq.iter().map(|s| pool.intern(s)).collect();
        let tail_len = pool.len();
        let second: Vec<u32> = seq.iter().map(|s| pool.intern(s)).collect();
        assert_eq!(first, second);
        assert_eq!(pool.len(), tail_len);
    }
}
