use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Fault>;

/// A fault raised by one of the pipeline's components.
///
/// Faults are always fatal to the run: the pipeline aborts every other
/// component and surfaces the first fault to the caller. The variant tag
/// records which kind of component raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Chunk production failed (e.g. an underlying read error)
    #[error("source fault: {0}")]
    Source(String),

    /// A transform step failed
    #[error("transform fault in stage '{stage}': {message}")]
    Transform { stage: String, message: String },

    /// The sink could not consume a drained chunk
    #[error("sink fault: {0}")]
    Sink(String),
}

impl Fault {
    /// Shorthand for a source fault with the given message
    pub fn source(message: impl Into<String>) -> Self {
        Fault::Source(message.into())
    }

    /// Shorthand for a transform fault raised by the named stage
    pub fn transform(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Fault::Transform {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a sink fault with the given message
    pub fn sink(message: impl Into<String>) -> Self {
        Fault::Sink(message.into())
    }
}

/// Errors detected while assembling a pipeline, before any chunk moves
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No source was attached
    #[error("cannot build a pipeline without a source")]
    MissingSource,

    /// No sink was attached
    #[error("cannot build a pipeline without a sink")]
    MissingSink,

    /// The sink's high-water mark must be strictly positive
    #[error("high-water mark must be at least 1")]
    ZeroHighWaterMark,
}
