//! Append-only string pool.
//!
//! Strings are stored back to back in a single owned buffer and addressed by
//! a dense id. Lookups hand out `&str` borrowed from that buffer.

use std::collections::TryReserveError;

use crate::error::LookupError;

#[derive(Debug, Clone, Default)]
pub struct StringPool {
    buf: String,
    /// End offset of each string in `buf`; the start is the previous end.
    ends: Vec<usize>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a pool from strings in id order.
    pub fn from_strings<I, S>(strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = StringPool::new();
        for s in strings {
            pool.push(s.as_ref());
        }
        pool
    }

    /// Append `item` and return its id. Duplicates get a fresh id.
    pub fn push(&mut self, item: &str) -> usize {
        let id = self.ends.len();
        self.buf.push_str(item);
        self.ends.push(self.buf.len());
        id
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        let end = *self.ends.get(id)?;
        let start = if id == 0 { 0 } else { self.ends[id - 1] };
        self.buf.get(start..end)
    }

    /// Like [`get`](Self::get) but reports unknown ids as errors.
    pub fn lookup(&self, id: usize) -> Result<&str, LookupError> {
        self.get(id).ok_or(LookupError::UnknownId {
            id,
            len: self.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Total bytes held by pooled strings.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Make room for at least `capacity` bytes of string data in total.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.buf.capacity() {
            self.buf.reserve(capacity - self.buf.len());
        }
    }

    /// Fallible [`reserve`](Self::reserve) for sizes read from untrusted input.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        if capacity > self.buf.capacity() {
            self.buf.try_reserve(capacity - self.buf.len())?;
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn shrink_to_fit(&mut self) {
        self.buf.shrink_to_fit();
        self.ends.shrink_to_fit();
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        (0..self.len()).filter_map(move |id| self.get(id).map(|s| (id, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_monotonic() {
        let mut pool = StringPool::new();
        assert_eq!(pool.push("西安"), 0);
        assert_eq!(pool.push(""), 1);
        assert_eq!(pool.push("先"), 2);
        assert_eq!(pool.get(0), Some("西安"));
        assert_eq!(pool.get(1), Some(""));
        assert_eq!(pool.get(2), Some("先"));
        assert_eq!(pool.get(3), None);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn duplicates_get_fresh_ids() {
        let mut pool = StringPool::new();
        pool.push("a");
        pool.push("b");
        assert_eq!(pool.push("a"), 2);
        assert_eq!(pool.get(0), pool.get(2));
        assert_eq!(pool.byte_len(), 3);
    }

    #[test]
    fn lookup_reports_unknown_ids() {
        let pool = StringPool::from_strings(["x"]);
        assert_eq!(pool.lookup(0), Ok("x"));
        assert_eq!(pool.lookup(5), Err(LookupError::UnknownId { id: 5, len: 1 }));
    }

    #[test]
    fn reserve_and_shrink_keep_contents() {
        let mut pool = StringPool::from_strings(["中国", "北京"]);
        pool.reserve(1024);
        assert!(pool.capacity() >= 1024);
        pool.shrink_to_fit();
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec![(0, "中国"), (1, "北京")]);
        assert_eq!(pool.byte_len(), 12);
    }

    #[test]
    fn impossible_reservation_fails_cleanly() {
        let mut pool = StringPool::from_strings(["a"]);
        assert!(pool.try_reserve(usize::MAX).is_err());
        assert_eq!(pool.get(0), Some("a"));
        assert!(pool.try_reserve(64).is_ok());
    }
}
