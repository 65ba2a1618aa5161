use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flowline::{BoundedSink, FlatMapStage, IterSource, MapStage, PipelineBuilder};

fn benchmark_passthrough_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("passthrough_10k", |b| {
        b.iter(|| {
            let pipeline = PipelineBuilder::new()
                .source(IterSource::new(0u64..10_000))
                .sink(BoundedSink::new(256, |chunk: u64| {
                    black_box(chunk);
                    Ok(())
                }))
                .build()
                .expect("build failed");
            pipeline.run().expect("run failed");
        });
    });

    group.bench_function("three_stage_chain_10k", |b| {
        b.iter(|| {
            let pipeline = PipelineBuilder::new()
                .source(IterSource::new(0u64..10_000))
                .stage(MapStage::new("square", |n: u64| Ok(n.wrapping_mul(n))))
                .stage(flowline::FilterStage::new("evens", |n: &u64| n % 2 == 0))
                .stage(FlatMapStage::new("split", |n: u64| Ok(vec![n, n >> 1])))
                .sink(BoundedSink::new(256, |chunk: u64| {
                    black_box(chunk);
                    Ok(())
                }))
                .build()
                .expect("build failed");
            pipeline.run().expect("run failed");
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_passthrough_throughput);
criterion_main!(benches);
