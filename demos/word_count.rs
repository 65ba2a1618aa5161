//! Word frequency counter.
//!
//! Streams lines through a split stage and a lowercase stage into a counting
//! consumer, then prints the most frequent words together with the run's
//! flow metrics. Run with `RUST_LOG=flowline=debug` to watch the pause and
//! drain transitions.

use flowline::{BoundedSink, FlatMapStage, IterSource, MapStage, PipelineBuilder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const TEXT: &str = "\
the quick brown fox jumps over the lazy dog
the dog barks and the fox runs
a quick run beats a lazy walk
the fox and the dog call it a day";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let counts: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));
    let tally = Arc::clone(&counts);

    let pipeline = PipelineBuilder::new()
        .source(IterSource::new(TEXT.lines().map(String::from)))
        .stage(FlatMapStage::new("split_words", |line: String| {
            Ok(line.split_whitespace().map(String::from).collect())
        }))
        .stage(MapStage::new("lowercase", |word: String| {
            Ok(word.to_lowercase())
        }))
        .sink(
            BoundedSink::new(8, move |word: String| {
                *tally.lock().entry(word).or_insert(0) += 1;
                Ok(())
            })
            .with_drain_rate(2),
        )
        .build()
        .expect("pipeline build failed");

    let metrics = pipeline.metrics();
    let outcome = pipeline.run().expect("pipeline run failed");
    println!("Run outcome: {outcome:?}");
    println!("{}", metrics.snapshot().format());

    let mut ranked: Vec<(String, usize)> = counts.lock().drain().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    println!("\nTop words:");
    for (word, count) in ranked.iter().take(5) {
        println!("  {count:>3}  {word}");
    }
}
