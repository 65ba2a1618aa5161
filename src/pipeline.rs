use crate::backpressure::{BackpressureSignal, Control};
use crate::error::{BuildError, Fault, Result};
use crate::metrics::PipelineMetrics;
use crate::sink::BoundedSink;
use crate::source::{ChunkSource, Produced};
use crate::stage::Transform;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

/// Pipeline lifecycle.
///
/// `Idle → Flowing`, then `Flowing ⇄ Paused` on backpressure, `Draining`
/// once the source ends with chunks still buffered, `Finished` when the sink
/// empties after end-of-data. `Errored` is terminal from any state and also
/// covers external cancellation (the run outcome tells the two apart).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Flowing,
    Paused,
    Draining,
    Finished,
    Errored,
}

/// How a run ended when no fault was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every produced chunk reached the sink and the sink finished
    Finished,
    /// An external caller stopped the run; not an error
    Cancelled { reason: String },
}

/// Cloneable handle for stopping a run from outside.
///
/// Cancellation is cooperative: it takes effect at the next safe boundary
/// (before the next pull or drain tick), never mid-transform. Cancelling an
/// already-terminated run is a no-op.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    control: Sender<Control>,
}

impl CancelHandle {
    pub fn cancel(&self, reason: impl Into<String>) {
        let _ = self.control.send(Control::Cancel(reason.into()));
    }
}

/// Builder for wiring a source, transform stages, and a sink
pub struct PipelineBuilder<T> {
    source: Option<Box<dyn ChunkSource<T>>>,
    stages: Vec<Box<dyn Transform<T>>>,
    sink: Option<BoundedSink<T>>,
}

impl<T: Send + 'static> PipelineBuilder<T> {
    pub fn new() -> Self {
        Self {
            source: None,
            stages: Vec::new(),
            sink: None,
        }
    }

    pub fn source(mut self, source: impl ChunkSource<T>) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Append a transform stage; stages run in the order they were added
    pub fn stage(mut self, stage: impl Transform<T>) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn sink(mut self, sink: BoundedSink<T>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> std::result::Result<Pipeline<T>, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let mut sink = self.sink.ok_or(BuildError::MissingSink)?;
        if sink.high_water_mark() == 0 {
            return Err(BuildError::ZeroHighWaterMark);
        }

        let (control, events) = unbounded();
        sink.connect(control.clone());

        Ok(Pipeline {
            source,
            stages: self.stages,
            sink,
            state: PipelineState::Idle,
            source_done: false,
            control,
            events,
            metrics: PipelineMetrics::new(),
        })
    }
}

impl<T: Send + 'static> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A wired pipeline, ready to run.
///
/// The run loop is single-threaded and cooperative: it interleaves pull
/// steps, chunk routing, and sink drain ticks on the calling thread, and
/// reacts to drain/cancel events posted through a channel. The pipeline is
/// the only component that transitions the [`PipelineState`] machine, and it
/// holds no chunk data itself.
pub struct Pipeline<T> {
    source: Box<dyn ChunkSource<T>>,
    stages: Vec<Box<dyn Transform<T>>>,
    sink: BoundedSink<T>,
    state: PipelineState,
    source_done: bool,
    control: Sender<Control>,
    events: Receiver<Control>,
    metrics: PipelineMetrics,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Handle for cancelling this run from any thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            control: self.control.clone(),
        }
    }

    /// Shared counters, valid before, during, and after the run
    pub fn metrics(&self) -> PipelineMetrics {
        self.metrics.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the pipeline to a terminal state.
    ///
    /// Resolves with [`Outcome::Finished`] once every produced chunk has been
    /// delivered and the sink finished, with [`Outcome::Cancelled`] if a
    /// cancel handle fired first, and rejects with the first [`Fault`] any
    /// component raised. On a fault, every other component is cancelled or
    /// aborted exactly once before the fault is returned.
    pub fn run(mut self) -> Result<Outcome> {
        for i in 0..self.stages.len() {
            if let Err(fault) = self.stages[i].on_start() {
                let fault = tag_stage_fault(self.stages[i].name(), fault);
                return Err(self.fail(fault));
            }
        }

        self.state = PipelineState::Flowing;
        debug!("pipeline flowing");

        loop {
            // Control events first; a queued cancel beats further progress
            while let Ok(event) = self.events.try_recv() {
                match event {
                    Control::Cancel(reason) => return Ok(self.cancel_now(reason)),
                    Control::Drained => {
                        self.metrics.record_drain_notice();
                        if self.state == PipelineState::Paused {
                            self.state = if self.source_done {
                                PipelineState::Draining
                            } else {
                                PipelineState::Flowing
                            };
                            debug!(state = ?self.state, "drain observed, resuming");
                        }
                    }
                }
            }

            match self.state {
                PipelineState::Flowing => {
                    match self.source.produce_next() {
                        Ok(Produced::Chunk(chunk)) => {
                            self.metrics.record_produced();
                            let signal =
                                route_chunk(&mut self.stages, &mut self.sink, chunk)
                                    .map_err(|fault| self.fail(fault))?;
                            self.metrics.record_occupancy(self.sink.writable_length());
                            if signal.is_pause() {
                                self.state = PipelineState::Paused;
                                self.metrics.record_pause();
                                debug!(
                                    occupancy = self.sink.writable_length(),
                                    "backpressure, production paused"
                                );
                            }
                        }
                        Ok(Produced::EndOfData) => {
                            self.source_done = true;
                            self.sink.finish();
                            self.state = PipelineState::Draining;
                            debug!("end of data, draining");
                        }
                        Err(fault) => return Err(self.fail(fault)),
                    }
                }
                PipelineState::Paused | PipelineState::Draining => {
                    if self.state == PipelineState::Draining && self.sink.is_finished() {
                        self.state = PipelineState::Finished;
                        for stage in &mut self.stages {
                            stage.on_shutdown();
                        }
                        debug!("pipeline finished");
                        return Ok(Outcome::Finished);
                    }
                    let delivered = self
                        .sink
                        .drain_tick()
                        .map_err(|fault| self.fail(fault))?;
                    self.metrics.record_delivered(delivered as u64);
                }
                PipelineState::Idle
                | PipelineState::Finished
                | PipelineState::Errored => {
                    unreachable!("terminal state inside the run loop")
                }
            }
        }
    }

    /// Transition to `Errored` and tear everything down, at most once
    fn fail(&mut self, fault: Fault) -> Fault {
        warn!(%fault, "pipeline errored");
        self.state = PipelineState::Errored;
        self.teardown(&fault.to_string());
        fault
    }

    fn cancel_now(&mut self, reason: String) -> Outcome {
        warn!(reason = %reason, "pipeline cancelled");
        self.state = PipelineState::Errored;
        self.teardown(&reason);
        Outcome::Cancelled { reason }
    }

    fn teardown(&mut self, reason: &str) {
        self.source.cancel();
        self.sink.abort(reason);
        for stage in &mut self.stages {
            stage.on_shutdown();
        }
    }
}

/// Route one chunk through the remaining stages, depth first and in order,
/// until every derived output has been accepted by the sink. Any `Pause`
/// from the sink dominates the combined signal; the in-flight chunk is still
/// routed to completion before production stops.
fn route_chunk<T: Send + 'static>(
    stages: &mut [Box<dyn Transform<T>>],
    sink: &mut BoundedSink<T>,
    chunk: T,
) -> Result<BackpressureSignal> {
    let Some((head, rest)) = stages.split_first_mut() else {
        return sink.accept(chunk);
    };
    let outputs = head
        .transform(chunk)
        .map_err(|fault| tag_stage_fault(head.name(), fault))?;
    let mut signal = BackpressureSignal::Continue;
    for output in outputs {
        signal = signal.and(route_chunk(rest, sink, output)?);
    }
    Ok(signal)
}

/// Faults escaping a stage are always reported as transform faults
fn tag_stage_fault(stage: &str, fault: Fault) -> Fault {
    match fault {
        tagged @ Fault::Transform { .. } => tagged,
        other => Fault::transform(stage, other.to_string()),
    }
}
