use crate::backpressure::{BackpressureSignal, Control, WaterMark};
use crate::error::{Fault, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// The downstream end of a sink: whatever actually takes delivery of chunks
/// once they leave the bounded buffer.
pub trait Consumer<T>: Send + 'static {
    /// Take delivery of one chunk. A fault here is fatal to the pipeline.
    fn consume(&mut self, chunk: T) -> Result<()>;
}

impl<T, F> Consumer<T> for F
where
    F: FnMut(T) -> Result<()> + Send + 'static,
{
    fn consume(&mut self, chunk: T) -> Result<()> {
        self(chunk)
    }
}

/// A consumer that gathers delivered chunks into a shared vector.
///
/// The handle stays valid after the pipeline takes ownership of the consumer,
/// so tests and embedders can inspect what actually arrived.
pub struct CollectingConsumer<T> {
    received: Arc<Mutex<Vec<T>>>,
}

impl<T> CollectingConsumer<T> {
    pub fn new() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the delivered chunks
    pub fn handle(&self) -> Arc<Mutex<Vec<T>>> {
        Arc::clone(&self.received)
    }
}

impl<T> Default for CollectingConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Consumer<T> for CollectingConsumer<T> {
    fn consume(&mut self, chunk: T) -> Result<()> {
        self.received.lock().push(chunk);
        Ok(())
    }
}

/// A capacity-bounded buffering sink.
///
/// `accept` never refuses a chunk; instead it returns a [`BackpressureSignal`]
/// telling the producer side whether to keep pulling. Buffered chunks leave in
/// FIFO order through drain ticks granted by the pipeline, at most
/// `drain_rate` chunks per tick, so a slow consumer is modeled by a low rate.
pub struct BoundedSink<T> {
    buffer: VecDeque<T>,
    mark: WaterMark,
    drain_rate: usize,
    consumer: Box<dyn Consumer<T>>,
    notifier: Option<Sender<Control>>,
    finishing: bool,
    finished: bool,
    aborted: bool,
}

impl<T: Send + 'static> BoundedSink<T> {
    /// Create a sink with the given high-water mark and terminal consumer.
    ///
    /// The high-water mark is validated by the pipeline builder; a mark of
    /// zero is rejected there before any chunk moves.
    pub fn new(high_water_mark: usize, consumer: impl Consumer<T>) -> Self {
        Self {
            buffer: VecDeque::new(),
            mark: WaterMark::new(high_water_mark),
            drain_rate: 1,
            consumer: Box::new(consumer),
            notifier: None,
            finishing: false,
            finished: false,
            aborted: false,
        }
    }

    /// Set how many chunks a single drain tick may deliver (minimum 1)
    pub fn with_drain_rate(mut self, rate: usize) -> Self {
        self.drain_rate = rate.max(1);
        self
    }

    /// The configured high-water mark
    pub fn high_water_mark(&self) -> usize {
        self.mark.high()
    }

    /// Current buffer occupancy
    pub fn writable_length(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True once `finish` was called and the buffer has fully drained
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wire the drain notifier. Called by the pipeline before the run starts.
    pub(crate) fn connect(&mut self, notifier: Sender<Control>) {
        self.notifier = Some(notifier);
    }

    /// Append a chunk to the buffer and report the resulting flow signal.
    ///
    /// The chunk is always taken; `Pause` means occupancy has reached the
    /// high-water mark and the producer must wait for a drain notification.
    pub fn accept(&mut self, chunk: T) -> Result<BackpressureSignal> {
        if self.aborted {
            return Err(Fault::sink("accept on an aborted sink"));
        }
        if self.finishing {
            return Err(Fault::sink("accept after finish"));
        }
        self.buffer.push_back(chunk);
        let signal = self.mark.assess(self.buffer.len());
        if signal.is_pause() {
            debug!(
                occupancy = self.buffer.len(),
                high_water_mark = self.mark.high(),
                "sink at capacity, signaling pause"
            );
        }
        Ok(signal)
    }

    /// Deliver up to `drain_rate` buffered chunks to the consumer.
    ///
    /// Returns the number of chunks delivered. Posts a `Drained` notice the
    /// moment occupancy falls back to zero.
    pub fn drain_tick(&mut self) -> Result<usize> {
        if self.aborted || self.buffer.is_empty() {
            return Ok(0);
        }
        let mut delivered = 0;
        while delivered < self.drain_rate {
            let Some(chunk) = self.buffer.pop_front() else {
                break;
            };
            self.consumer.consume(chunk)?;
            delivered += 1;
        }
        if self.buffer.is_empty() {
            if self.finishing {
                self.finished = true;
                debug!("sink drained after finish, now finished");
            } else if let Some(notifier) = &self.notifier {
                debug!("sink drained to zero, notifying");
                let _ = notifier.send(Control::Drained);
            }
        }
        Ok(delivered)
    }

    /// Signal that no more chunks will be accepted. The sink reports
    /// `is_finished` once the remaining buffered chunks have drained.
    pub fn finish(&mut self) {
        if self.aborted || self.finishing {
            return;
        }
        self.finishing = true;
        if self.buffer.is_empty() {
            self.finished = true;
        }
    }

    /// Discard all buffered chunks and stop draining. Idempotent; no drain
    /// notifications fire afterwards.
    pub fn abort(&mut self, reason: &str) {
        if self.aborted {
            return;
        }
        warn!(discarded = self.buffer.len(), reason, "sink aborted");
        self.aborted = true;
        self.buffer.clear();
        self.notifier = None;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting_sink(hwm: usize) -> (BoundedSink<u8>, Arc<Mutex<Vec<u8>>>) {
        let consumer = CollectingConsumer::new();
        let handle = consumer.handle();
        (BoundedSink::new(hwm, consumer), handle)
    }

    #[test]
    fn accept_signals_pause_at_the_mark() {
        let (mut sink, _) = collecting_sink(3);
        assert_eq!(sink.accept(1).unwrap(), BackpressureSignal::Continue);
        assert_eq!(sink.accept(2).unwrap(), BackpressureSignal::Continue);
        assert_eq!(sink.accept(3).unwrap(), BackpressureSignal::Pause);
        assert_eq!(sink.writable_length(), 3);
    }

    #[test]
    fn chunks_drain_in_fifo_order() {
        let (mut sink, handle) = collecting_sink(10);
        for n in 1..=4 {
            let _ = sink.accept(n).unwrap();
        }
        let mut sink = sink.with_drain_rate(2);
        assert_eq!(sink.drain_tick().unwrap(), 2);
        assert_eq!(sink.drain_tick().unwrap(), 2);
        assert_eq!(*handle.lock(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn drain_notifies_when_buffer_empties() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let (mut sink, _) = collecting_sink(2);
        sink.connect(sender);
        let _ = sink.accept(7).unwrap();
        assert_eq!(sink.drain_tick().unwrap(), 1);
        assert_eq!(receiver.try_recv().unwrap(), Control::Drained);
    }

    #[test]
    fn finish_completes_once_empty() {
        let (mut sink, _) = collecting_sink(5);
        let _ = sink.accept(1).unwrap();
        sink.finish();
        assert!(!sink.is_finished());
        assert_eq!(sink.drain_tick().unwrap(), 1);
        assert!(sink.is_finished());
    }

    #[test]
    fn finish_on_empty_buffer_is_immediate() {
        let (mut sink, _) = collecting_sink(5);
        sink.finish();
        assert!(sink.is_finished());
    }

    #[test]
    fn accept_after_finish_is_a_fault() {
        let (mut sink, _) = collecting_sink(5);
        sink.finish();
        assert!(matches!(sink.accept(1), Err(Fault::Sink(_))));
    }

    #[test]
    fn abort_discards_and_is_idempotent() {
        let (mut sink, handle) = collecting_sink(5);
        let _ = sink.accept(1).unwrap();
        let _ = sink.accept(2).unwrap();
        sink.abort("test");
        sink.abort("test again");
        assert_eq!(sink.writable_length(), 0);
        assert_eq!(sink.drain_tick().unwrap(), 0);
        assert!(handle.lock().is_empty());
    }

    #[test]
    fn consumer_fault_surfaces_from_drain() {
        let mut sink: BoundedSink<u8> =
            BoundedSink::new(5, |_chunk: u8| Err(Fault::sink("disk full")));
        let _ = sink.accept(9).unwrap();
        assert!(matches!(sink.drain_tick(), Err(Fault::Sink(_))));
    }
}
