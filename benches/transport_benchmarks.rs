use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ringbuf::traits::{Consumer, Producer};
use scoreclock::clock::{BeatGenerator, ClockControl, link};
use scoreclock::{
    EventBus, EventScheduler, LoopRegion, Position, SchedulerConfig, ScheduledEvent, Tick,
    TimeAuthority, TransportCommand, TransportConfig,
};
use std::sync::Arc;

/// Benchmark the generator hot path (runs inside the audio callback)
fn bench_generator_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator");

    for frames in [64usize, 256, 512] {
        let (clock, mut authority) = link(256, 8);
        let mut generator = BeatGenerator::new(clock, 10.0);
        let _ = authority
            .control
            .try_push(ClockControl::Start { epoch: 1, bpm: 120.0 });

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            b.iter(|| {
                generator.advance_frames(black_box(frames), 48_000);
                // Keep the ring from filling so every iteration takes the push path
                for message in authority.beats.pop_iter() {
                    black_box(message);
                }
            });
        });
    }
    group.finish();
}

/// Benchmark sorted insertion with interleaved trigger ticks
fn bench_scheduler_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_insert");

    for count in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || EventScheduler::new(SchedulerConfig::default(), |_: &ScheduledEvent<u64>| Ok(())),
                |mut scheduler| {
                    for i in 0..count {
                        // Reverse-ish order exercises the binary search
                        scheduler.schedule((count - i) * 7 % 1920, i);
                    }
                    scheduler
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark dispatching a bar of events tick by tick
fn bench_scheduler_dispatch(c: &mut Criterion) {
    c.bench_function("scheduler_dispatch_bar", |b| {
        b.iter_batched(
            || {
                let mut scheduler =
                    EventScheduler::new(SchedulerConfig::default(), |event: &ScheduledEvent<u64>| {
                        black_box(event.payload());
                        Ok(())
                    });
                for i in 0..1920u64 {
                    scheduler.schedule(i, i);
                }
                scheduler
            },
            |mut scheduler| {
                for tick in (0..1920u64).step_by(10) {
                    black_box(scheduler.advance_to(tick));
                }
                scheduler
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark tick fan-out to a growing number of subscribers
fn bench_bus_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("bus_publish");

    for subscribers in [1usize, 8, 32] {
        let bus = EventBus::new();
        let subscriptions: Vec<_> = (0..subscribers)
            .map(|_| {
                bus.subscribe_ticks(|tick| {
                    black_box(tick.absolute_tick);
                })
            })
            .collect();
        let tick = Tick {
            position: Position::new(1, 3, 0),
            absolute_tick: 960,
            tempo: 120.0,
            is_playing: true,
            loop_region: LoopRegion::default(),
            timestamp: 0.5,
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| bus.publish_tick(black_box(&tick)));
            },
        );

        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }
    group.finish();
}

/// Benchmark one coordination step: a 10 ms callback followed by a pump
fn bench_authority_pump(c: &mut Criterion) {
    let config = TransportConfig::default();
    let bus = Arc::new(EventBus::new());
    let (clock, endpoint) = link(config.clock.beat_capacity, config.clock.control_capacity);
    let mut generator = BeatGenerator::new(clock, config.clock.emit_interval_ms);
    let Ok(mut authority) = TimeAuthority::new(&config, bus.clone(), endpoint) else {
        return;
    };
    let _subscription = bus.subscribe_ticks(|tick| {
        black_box(tick);
    });

    bus.publish_command(TransportCommand::SetLoop {
        start: 0,
        end: 1920,
        enabled: true,
    });
    bus.publish_command(TransportCommand::Play);

    c.bench_function("authority_pump", |b| {
        b.iter(|| {
            generator.advance_frames(480, 48_000);
            black_box(authority.pump());
        });
    });
}

criterion_group!(
    benches,
    bench_generator_advance,
    bench_scheduler_insert,
    bench_scheduler_dispatch,
    bench_bus_publish,
    bench_authority_pump
);
criterion_main!(benches);
