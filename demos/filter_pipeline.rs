//! Filter and map chain under deliberate backpressure.
//!
//! Pushes 1000 numbers through an even-filter and a squaring stage into a
//! sink with a small high-water mark, then prints how often production had
//! to pause and what was delivered. Also demonstrates cancelling a run from
//! the consumer side.

use flowline::{
    BoundedSink, CancelHandle, CollectingConsumer, FilterStage, IterSource, MapStage,
    Outcome, PipelineBuilder,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Full run: evens squared, tight 4-slot buffer
    let consumer = CollectingConsumer::new();
    let delivered = consumer.handle();

    let pipeline = PipelineBuilder::new()
        .source(IterSource::new(0u64..1000))
        .stage(FilterStage::new("evens", |n: &u64| n % 2 == 0))
        .stage(MapStage::new("square", |n: u64| Ok(n * n)))
        .sink(BoundedSink::new(4, consumer))
        .build()
        .expect("pipeline build failed");

    let metrics = pipeline.metrics();
    let outcome = pipeline.run().expect("pipeline run failed");

    println!("Run outcome: {outcome:?}");
    println!("{}", metrics.snapshot().format());
    let received = delivered.lock();
    println!("First deliveries: {:?}", &received[..8.min(received.len())]);
    drop(received);

    // Cancelled run: the consumer stops the pipeline after 10 deliveries
    let handle_slot: Arc<Mutex<Option<CancelHandle>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&handle_slot);
    let mut taken = 0u32;

    let pipeline = PipelineBuilder::new()
        .source(IterSource::new(0u64..1000))
        .sink(BoundedSink::new(4, move |_chunk: u64| {
            taken += 1;
            if taken == 10 {
                if let Some(handle) = slot.lock().as_ref() {
                    handle.cancel("saw enough");
                }
            }
            Ok(())
        }))
        .build()
        .expect("pipeline build failed");
    *handle_slot.lock() = Some(pipeline.cancel_handle());

    match pipeline.run().expect("cancellation is not an error") {
        Outcome::Cancelled { reason } => println!("\nSecond run cancelled: {reason}"),
        Outcome::Finished => println!("\nSecond run finished before the cancel landed"),
    }
}
