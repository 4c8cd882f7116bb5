//! Header-parser pooling.
//!
//! Constructing a header parser is expensive relative to a single parse, so
//! instances are reused across decode calls. The pool is shared by every
//! concurrent decode request; checkout and check-in are the only operations
//! that touch shared state, and both hold the idle-set lock.
//!
//! Checkout is scoped: [`ParserPool::obtain`] returns a [`PooledParser`]
//! guard whose `Drop` clears the parser and returns it to the idle set, so
//! release runs on success, early return, and unwind alike.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use super::HeaderParser;

/// Thread-safe pool of reusable [`HeaderParser`] instances.
///
/// The pool grows on demand and is never capped: under sustained concurrency
/// it holds as many parsers as the peak number of simultaneous decode calls.
pub struct ParserPool<P> {
    idle: Mutex<Vec<P>>,
}

impl<P: HeaderParser> ParserPool<P> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Check out a parser bound to `data`.
    ///
    /// Pops an idle instance if one exists, otherwise constructs a new one.
    /// The returned guard releases the parser back to the pool when dropped;
    /// until then the parser is bound to `data` and to no other buffer.
    pub fn obtain(&self, data: Arc<[u8]>) -> PooledParser<'_, P>
    where
        P: Default,
    {
        let mut parser = self.idle.lock().pop().unwrap_or_default();
        parser.bind(data);
        PooledParser {
            pool: self,
            parser: Some(parser),
        }
    }

    /// Number of parsers currently sitting idle.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut parser: P) {
        // Clear before the parser becomes observable to other callers, so an
        // idle parser never holds a stale buffer or parse cache.
        parser.clear();
        self.idle.lock().push(parser);
    }
}

impl<P: HeaderParser> Default for ParserPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped checkout of a pooled parser.
///
/// Dereferences to the parser. Dropping the guard clears the parser's bound
/// buffer and returns it to the pool.
pub struct PooledParser<'pool, P: HeaderParser> {
    pool: &'pool ParserPool<P>,
    parser: Option<P>,
}

impl<P: HeaderParser> Deref for PooledParser<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.parser.as_ref().expect("parser present until drop")
    }
}

impl<P: HeaderParser> DerefMut for PooledParser<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.parser.as_mut().expect("parser present until drop")
    }
}

impl<P: HeaderParser> Drop for PooledParser<'_, P> {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            self.pool.release(parser);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::decode::ContainerHeader;

    /// Parser fake that remembers its bound buffer and trips if it is ever
    /// rebound without an intervening clear. `binds` survives `clear`, so
    /// tests can tell a reused instance from a fresh one.
    #[derive(Default)]
    struct RecordingParser {
        data: Option<Arc<[u8]>>,
        binds: usize,
    }

    impl HeaderParser for RecordingParser {
        fn bind(&mut self, data: Arc<[u8]>) {
            assert!(
                self.data.is_none(),
                "parser rebound while still holding a buffer"
            );
            self.data = Some(data);
            self.binds += 1;
        }

        fn parse_header(&mut self) -> ContainerHeader {
            let data = self.data.as_ref().expect("parse on unbound parser");
            // Encode the first byte of the bound buffer into the header so
            // tests can detect cross-contamination.
            ContainerHeader {
                frame_count: u32::from(data[0]),
                width: 1,
                height: 1,
                ..ContainerHeader::default()
            }
        }

        fn clear(&mut self) {
            self.data = None;
        }
    }

    fn buffer(fill: u8) -> Arc<[u8]> {
        Arc::from(vec![fill; 64].into_boxed_slice())
    }

    #[test]
    fn test_obtain_reuses_idle_parser() {
        let pool = ParserPool::<RecordingParser>::new();

        drop(pool.obtain(buffer(1)));
        assert_eq!(pool.idle_count(), 1);

        let parser = pool.obtain(buffer(2));
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(
            parser.binds, 2,
            "second obtain should reuse the idle parser"
        );
    }

    #[test]
    fn test_release_clears_bound_buffer() {
        let pool = ParserPool::<RecordingParser>::new();
        drop(pool.obtain(buffer(7)));

        let parser = pool.obtain(buffer(9));
        // RecordingParser::bind asserts the previous buffer was cleared; also
        // check the reused parser sees only the new buffer.
        assert_eq!(parser.data.as_ref().unwrap()[0], 9);
    }

    #[test]
    fn test_release_runs_on_early_return() {
        let pool = ParserPool::<RecordingParser>::new();

        fn parse_or_bail(pool: &ParserPool<RecordingParser>, bail: bool) -> Option<u32> {
            let mut parser = pool.obtain(buffer(3));
            if bail {
                return None;
            }
            Some(parser.parse_header().frame_count)
        }

        assert_eq!(parse_or_bail(&pool, true), None);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(parse_or_bail(&pool, false), Some(3));
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_release_runs_on_unwind() {
        let pool = ParserPool::<RecordingParser>::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _parser = pool.obtain(buffer(5));
            panic!("decode blew up");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_concurrent_obtain_release_no_cross_contamination() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 200;

        let pool = Arc::new(ParserPool::<RecordingParser>::new());

        let handles: Vec<_> = (0..THREADS)
            .map(|id| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let fill = (id + 1) as u8;
                    for _ in 0..ROUNDS {
                        let mut parser = pool.obtain(buffer(fill));
                        let header = parser.parse_header();
                        // A parser bound to this thread's buffer must parse
                        // this thread's bytes, never another caller's.
                        assert_eq!(header.frame_count, u32::from(fill));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // Every checked-out parser came back.
        assert!(pool.idle_count() >= 1);
        assert!(pool.idle_count() <= THREADS);
    }
}
