use crate::error::Result;

/// Outcome of a single `produce_next` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced<T> {
    /// One chunk, ownership transfers to the caller
    Chunk(T),
    /// The source has nothing further to produce, now or ever
    EndOfData,
}

impl<T> Produced<T> {
    /// Returns true for the `EndOfData` sentinel
    pub fn is_end(&self) -> bool {
        matches!(self, Produced::EndOfData)
    }
}

/// Trait for the producing end of a pipeline.
///
/// The pipeline calls `produce_next` only while it is flowing. Once a source
/// has returned `EndOfData` (or been cancelled) every later call must keep
/// returning `EndOfData` without side effects.
pub trait ChunkSource<T>: Send + 'static {
    /// Produce the next chunk, or signal end-of-data.
    ///
    /// A returned fault is fatal to the whole pipeline.
    fn produce_next(&mut self) -> Result<Produced<T>>;

    /// Stop producing. Subsequent `produce_next` calls return `EndOfData`.
    /// Must not fail.
    fn cancel(&mut self) {}

    /// Human-readable name for diagnostics
    fn name(&self) -> &str {
        "source"
    }
}

/// A source backed by any iterator
pub struct IterSource<I> {
    iter: I,
    done: bool,
}

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter, done: false }
    }
}

impl<T, I> ChunkSource<T> for IterSource<I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    fn produce_next(&mut self) -> Result<Produced<T>> {
        if self.done {
            return Ok(Produced::EndOfData);
        }
        match self.iter.next() {
            Some(chunk) => Ok(Produced::Chunk(chunk)),
            None => {
                self.done = true;
                Ok(Produced::EndOfData)
            }
        }
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn name(&self) -> &str {
        "iter_source"
    }
}

/// A source driven by a closure, useful for fallible or stateful producers
pub struct FnSource<F> {
    producer: F,
    done: bool,
}

impl<F> FnSource<F> {
    pub fn new(producer: F) -> Self {
        Self {
            producer,
            done: false,
        }
    }
}

impl<T, F> ChunkSource<T> for FnSource<F>
where
    T: Send + 'static,
    F: FnMut() -> Result<Produced<T>> + Send + 'static,
{
    fn produce_next(&mut self) -> Result<Produced<T>> {
        if self.done {
            return Ok(Produced::EndOfData);
        }
        match (self.producer)() {
            Ok(Produced::Chunk(chunk)) => Ok(Produced::Chunk(chunk)),
            Ok(Produced::EndOfData) => {
                self.done = true;
                Ok(Produced::EndOfData)
            }
            Err(fault) => {
                // A faulted source is finished; it must not re-produce
                self.done = true;
                Err(fault)
            }
        }
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn name(&self) -> &str {
        "fn_source"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;

    #[test]
    fn iter_source_produces_in_order() {
        let mut source = IterSource::new(vec![1, 2, 3].into_iter());
        assert_eq!(source.produce_next().unwrap(), Produced::Chunk(1));
        assert_eq!(source.produce_next().unwrap(), Produced::Chunk(2));
        assert_eq!(source.produce_next().unwrap(), Produced::Chunk(3));
        assert_eq!(source.produce_next().unwrap(), Produced::EndOfData);
    }

    #[test]
    fn end_of_data_is_idempotent() {
        let mut source = IterSource::new(std::iter::empty::<u8>());
        for _ in 0..5 {
            assert!(source.produce_next().unwrap().is_end());
        }
    }

    #[test]
    fn cancel_stops_production() {
        let mut source = IterSource::new(vec![1, 2, 3].into_iter());
        assert_eq!(source.produce_next().unwrap(), Produced::Chunk(1));
        source.cancel();
        assert_eq!(source.produce_next().unwrap(), Produced::EndOfData);
    }

    #[test]
    fn fn_source_stays_ended_after_fault() {
        let mut calls = 0;
        let mut source = FnSource::new(move || {
            calls += 1;
            if calls == 1 {
                Err(Fault::source("disk on fire"))
            } else {
                Ok(Produced::Chunk(42u8))
            }
        });
        assert!(source.produce_next().is_err());
        assert_eq!(source.produce_next().unwrap(), Produced::EndOfData);
    }
}
