use crosschart::chart::compile_filters;
use crosschart::core::{Filter, Key, LinearScale};
use crosschart::data::{GroupAll, MemoryCrossfilter};
use crosschart::{ChartRegistry, EventCoalescer};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::rc::Rc;
use std::time::Duration;

fn bench_linear_scale_round_trip(c: &mut Criterion) {
    let mut scale = LinearScale::new(0.0, 10_000.0).expect("valid scale");
    scale.set_range(0.0, 1_920.0);

    c.bench_function("linear_scale_round_trip", |b| {
        b.iter(|| {
            let px = scale.scale(black_box(4_321.123));
            let _ = scale.invert(px);
        })
    });
}

fn bench_compiled_predicate_10k(c: &mut Criterion) {
    let filters: Vec<Filter> = (0..8)
        .map(|i| Filter::ranged(f64::from(i) * 100.0, f64::from(i) * 100.0 + 25.0))
        .chain(["Mon", "Wed", "Fri"].into_iter().map(Filter::single))
        .collect();
    let compiled = compile_filters(&filters);
    let keys: Vec<Key> = (0..10_000).map(|i| Key::number(f64::from(i % 1_000))).collect();

    c.bench_function("compiled_predicate_10k", |b| {
        b.iter(|| keys.iter().filter(|key| compiled.matches(black_box(key))).count())
    });
}

fn bench_coalescer_burst_1k(c: &mut Criterion) {
    c.bench_function("coalescer_burst_1k", |b| {
        b.iter(|| {
            let mut events = EventCoalescer::new();
            for i in 0..1_000u64 {
                let _ = events.trigger_in("group", black_box(i), Duration::from_millis(40));
                let _ = events.advance(Duration::from_millis(5));
            }
            events.advance(Duration::from_millis(40))
        })
    });
}

fn bench_group_all_after_filter_10k(c: &mut Criterion) {
    let engine = MemoryCrossfilter::new((0..10_000).map(f64::from).collect::<Vec<_>>());
    let chart = crosschart::BaseChart::with_registry(Rc::new(ChartRegistry::new()));
    let value = engine.dimension(|value: &f64| Key::number(*value));
    chart.set_dimension(Rc::new(value));
    let selected = engine.group_all_count();

    c.bench_function("group_all_after_filter_10k", |b| {
        b.iter(|| {
            chart
                .replace_filter(Some(Filter::ranged(2_000.0, 7_500.0)))
                .expect("filter");
            black_box(selected.value())
        })
    });
}

criterion_group!(
    benches,
    bench_linear_scale_round_trip,
    bench_compiled_predicate_10k,
    bench_coalescer_burst_1k,
    bench_group_all_after_filter_10k
);
criterion_main!(benches);
