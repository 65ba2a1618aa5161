//! A bounded-buffer producer/consumer pipeline with explicit backpressure.
//!
//! A [`Pipeline`] pulls chunks from a [`ChunkSource`], routes them through
//! zero or more [`Transform`] stages in order, and buffers them in a
//! [`BoundedSink`] that drains at whatever rate its consumer allows. When the
//! sink's buffer reaches its high-water mark, production pauses; it resumes
//! on the sink's drain notification. A fault in any component tears the whole
//! chain down exactly once and surfaces as the run's error, so no stage keeps
//! running after a sibling has failed.
//!
//! # Features
//!
//! - Pull-based flow control with a strict high-water mark (occupancy never
//!   exceeds it)
//! - Strict ordering: the sink observes the in-order flattening of every
//!   transform's outputs
//! - Centralized fault aggregation with a source/transform/sink taxonomy
//! - Cooperative cancellation that resolves as a distinct non-error outcome
//! - Per-run flow metrics: chunks produced/delivered, pause cycles, peak
//!   occupancy
//!
//! # Example
//!
//! ```
//! use flowline::{
//!     BoundedSink, CollectingConsumer, IterSource, MapStage, Outcome,
//!     PipelineBuilder,
//! };
//!
//! let consumer = CollectingConsumer::new();
//! let delivered = consumer.handle();
//!
//! let pipeline = PipelineBuilder::new()
//!     .source(IterSource::new(["a", "b", "c"].into_iter().map(String::from)))
//!     .stage(MapStage::new("upper", |s: String| Ok(s.to_uppercase())))
//!     .sink(BoundedSink::new(16, consumer))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(pipeline.run().unwrap(), Outcome::Finished);
//! assert_eq!(*delivered.lock(), vec!["A", "B", "C"]);
//! ```

pub mod backpressure;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stage;

// Re-exports for convenience
pub use backpressure::BackpressureSignal;
pub use error::{BuildError, Fault, Result};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{CancelHandle, Outcome, Pipeline, PipelineBuilder, PipelineState};
pub use sink::{BoundedSink, CollectingConsumer, Consumer};
pub use source::{ChunkSource, FnSource, IterSource, Produced};
pub use stage::{FilterStage, FlatMapStage, MapStage, PassthroughStage, Transform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
