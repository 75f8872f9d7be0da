use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tickline::{Clock, Measures, Meter, Tempo, measures_to_ticks};

/// Benchmark duration conversion (runs on every schedule registration)
fn bench_measures_to_ticks(c: &mut Criterion) {
    let tempo = Tempo::default();
    let meter = Meter::new(11, 8);

    c.bench_function("measures_to_ticks_fraction", |b| {
        b.iter(|| black_box(measures_to_ticks(black_box(4.25), &meter, &tempo)));
    });

    c.bench_function("measures_to_ticks_pair", |b| {
        b.iter(|| {
            black_box(measures_to_ticks(
                black_box(Measures::WithBeats(2, 1.5)),
                &meter,
                &tempo,
            ))
        });
    });
}

/// Benchmark pumping a clock carrying a realistic trigger load
fn bench_clock_pump(c: &mut Criterion) {
    c.bench_function("pump_64_schedules_one_measure", |b| {
        b.iter_batched(
            || {
                let clock = Clock::new(Tempo::default());
                for voice in 0..64u64 {
                    clock
                        .schedule(move || {
                            black_box(voice);
                        })
                        .start_later((voice % 8) as f64 / 8.0, 0.125);
                }
                clock
            },
            |clock| {
                clock.run_ticks(96);
                black_box(clock.ticks());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_measures_to_ticks, bench_clock_pump);
criterion_main!(benches);
