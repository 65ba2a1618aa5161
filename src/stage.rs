use crate::error::{Fault, Result};

/// A transform stage maps one input chunk to zero or more output chunks.
///
/// Stages are evaluated in chunk-arrival order, and every output of chunk
/// *i* is handed downstream before chunk *i+1* is looked at. A fault from
/// `transform` aborts the whole pipeline; stages never keep running past a
/// sibling's failure.
pub trait Transform<T>: Send + 'static {
    /// Map one input chunk to its outputs, in emission order
    fn transform(&mut self, chunk: T) -> Result<Vec<T>>;

    /// Called once before the first chunk arrives
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once when the run ends, whatever the outcome
    fn on_shutdown(&mut self) {}

    /// Human-readable name for diagnostics
    fn name(&self) -> &str {
        "stage"
    }
}

/// Emits every input unchanged
#[derive(Debug)]
pub struct PassthroughStage;

impl<T: Send + 'static> Transform<T> for PassthroughStage {
    fn transform(&mut self, chunk: T) -> Result<Vec<T>> {
        Ok(vec![chunk])
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Drops chunks that fail a predicate
pub struct FilterStage<F> {
    name: String,
    predicate: F,
}

impl<F> FilterStage<F> {
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<T, F> Transform<T> for FilterStage<F>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    fn transform(&mut self, chunk: T) -> Result<Vec<T>> {
        if (self.predicate)(&chunk) {
            Ok(vec![chunk])
        } else {
            Ok(vec![])
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Maps each chunk to exactly one output chunk
pub struct MapStage<F> {
    name: String,
    mapper: F,
}

impl<F> MapStage<F> {
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<T, F> Transform<T> for MapStage<F>
where
    T: Send + 'static,
    F: FnMut(T) -> Result<T> + Send + 'static,
{
    fn transform(&mut self, chunk: T) -> Result<Vec<T>> {
        match (self.mapper)(chunk) {
            Ok(out) => Ok(vec![out]),
            Err(Fault::Transform { stage, message }) => {
                Err(Fault::Transform { stage, message })
            }
            // Tag untagged mapper errors with this stage's name
            Err(other) => Err(Fault::transform(&self.name, other.to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Maps each chunk to zero or more output chunks
pub struct FlatMapStage<F> {
    name: String,
    mapper: F,
}

impl<F> FlatMapStage<F> {
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<T, F> Transform<T> for FlatMapStage<F>
where
    T: Send + 'static,
    F: FnMut(T) -> Result<Vec<T>> + Send + 'static,
{
    fn transform(&mut self, chunk: T) -> Result<Vec<T>> {
        (self.mapper)(chunk)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_emits_input_unchanged() {
        let mut stage = PassthroughStage;
        assert_eq!(stage.transform(vec![1, 2, 3]).unwrap(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn filter_drops_non_matching_chunks() {
        let mut stage = FilterStage::new("evens", |n: &u8| n % 2 == 0);
        assert!(stage.transform(3).unwrap().is_empty());
        assert_eq!(stage.transform(4).unwrap(), vec![4]);
    }

    #[test]
    fn map_applies_in_place() {
        let mut stage = MapStage::new("double", |n: u8| Ok(n * 2));
        assert_eq!(stage.transform(5).unwrap(), vec![10]);
    }

    #[test]
    fn map_fault_carries_stage_name() {
        let mut stage = MapStage::new("parse", |_n: u8| Err(Fault::source("bad digit")));
        match stage.transform(1) {
            Err(Fault::Transform { stage, .. }) => assert_eq!(stage, "parse"),
            other => panic!("expected transform fault, got {other:?}"),
        }
    }

    #[test]
    fn flat_map_emits_in_order() {
        let mut stage = FlatMapStage::new("dup", |n: u8| Ok(vec![n, n]));
        assert_eq!(stage.transform(7).unwrap(), vec![7, 7]);
    }
}
