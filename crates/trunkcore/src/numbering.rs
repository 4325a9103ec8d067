//! Explicitly-owned id generators

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id generator
///
/// Each call to [`next_id()`](Sequence::next_id) returns a
/// value one greater than the last. `Sequence` may be shared
/// between threads; ids are unique across all callers.
#[derive(Debug, Default)]
pub struct Sequence {
    next: AtomicU64,
}

impl Sequence {
    /// New sequence which begins at zero
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// New sequence which begins at `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Claim the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id which the next claim will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Receiver (source) identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id generators for calls, sources, and recorders
///
/// Call numbers, source numbers, and recorder numbers are
/// unique within one `Numbering`. Inject the same instance
/// into the [`CallFactory`](crate::CallFactory) and every
/// [`SourceBuilder::build()`](crate::SourceBuilder::build)
/// for one process. Tests may use a fresh `Numbering` to
/// get deterministic ids.
#[derive(Debug, Default)]
pub struct Numbering {
    calls: Sequence,
    sources: Sequence,
    recorders: Sequence,
}

impl Numbering {
    /// All sequences begin at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Next call number
    pub fn next_call(&self) -> u64 {
        self.calls.next_id()
    }

    /// Next source id
    pub fn next_source(&self) -> SourceId {
        SourceId(self.sources.next_id() as u32)
    }

    /// Next recorder number
    pub fn next_recorder(&self) -> u32 {
        self.recorders.next_id() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn test_sequence() {
        let seq = Sequence::starting_at(10);
        assert_eq!(10, seq.peek());
        assert_eq!(10, seq.next_id());
        assert_eq!(11, seq.next_id());
        assert_eq!(12, seq.peek());
    }

    #[test]
    fn test_numbering_independent() {
        let num = Numbering::new();
        assert_eq!(0, num.next_call());
        assert_eq!(1, num.next_call());
        assert_eq!(SourceId(0), num.next_source());
        assert_eq!(0, num.next_recorder());
        assert_eq!(1, num.next_recorder());
        assert_eq!(2, num.next_call());
    }

    #[test]
    fn test_sequence_threads() {
        let seq = Arc::new(Sequence::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = seq.clone();
                std::thread::spawn(move || (0..100).map(|_| seq.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(400, all.len());
        assert_eq!(400, seq.peek());
    }
}
