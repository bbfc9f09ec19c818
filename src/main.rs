// scoreclock - Composition root
//
// Usage: scoreclock [config.ron] [seconds]
//
// Builds the clock → authority → bus → scheduler pipeline, loops a one-bar
// click pattern and logs each click as it is dispatched.

use scoreclock::bus::validate_tick;
use scoreclock::clock::{self, AudioClockSource, BeatGenerator, ClockSource, TimerClockSource};
use scoreclock::{
    AtomicMetrics, Diagnostics, EventBus, EventScheduler, ScheduledEvent, TimeAuthority,
    TransportCommand, TransportConfig, TransportResult, logging,
};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How often the authority drains commands and beats
const PUMP_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_RUN_SECONDS: u64 = 8;

/// Metronome click kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickType {
    /// First beat of the bar
    Accent,
    Regular,
}

/// Whichever clock is currently driving the transport
enum ActiveClock {
    Audio(AudioClockSource),
    Timer(TimerClockSource),
}

impl ActiveClock {
    /// Start the audio clock, degrading to the timer clock if it fails
    fn acquire(mut audio: AudioClockSource) -> TransportResult<Self> {
        match audio.start() {
            Ok(()) => Ok(ActiveClock::Audio(audio)),
            Err(e) => {
                tracing::warn!("{e}; falling back to timer clock");
                let mut timer = audio.degrade();
                timer.start()?;
                Ok(ActiveClock::Timer(timer))
            }
        }
    }

    fn restart(self) -> TransportResult<Self> {
        match self {
            ActiveClock::Audio(mut audio) => {
                audio.stop();
                Self::acquire(audio)
            }
            ActiveClock::Timer(mut timer) => {
                timer.stop();
                timer.start()?;
                Ok(ActiveClock::Timer(timer))
            }
        }
    }

    fn source(&mut self) -> &mut dyn ClockSource {
        match self {
            ActiveClock::Audio(audio) => audio,
            ActiveClock::Timer(timer) => timer,
        }
    }
}

fn main() -> ExitCode {
    logging::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => TransportConfig::load(&path),
        None => TransportConfig::load_or_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let run_for = Duration::from_secs(
        args.next()
            .and_then(|arg| arg.parse().ok())
            .unwrap_or(DEFAULT_RUN_SECONDS),
    );

    match run(&config, run_for) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &TransportConfig, run_for: Duration) -> TransportResult<()> {
    tracing::info!(
        ppq = config.ppq,
        tempo = config.initial_tempo,
        time_signature = %config.time_signature,
        "scoreclock starting"
    );

    let bus = Arc::new(EventBus::new());
    bus.ticks().set_validator(validate_tick);
    let metrics = AtomicMetrics::new();

    let (clock_end, authority_end) =
        clock::link(config.clock.beat_capacity, config.clock.control_capacity);
    let generator = BeatGenerator::new(clock_end, config.clock.emit_interval_ms);
    let timer_interval = Duration::from_millis(config.clock.timer_interval_ms);
    let mut clock = ActiveClock::acquire(AudioClockSource::new(generator, timer_interval))?;

    let mut authority =
        TimeAuthority::with_observer(config, bus.clone(), authority_end, Arc::new(metrics.clone()))?;

    let scheduler = Arc::new(Mutex::new(EventScheduler::with_observer(
        config.scheduler.clone(),
        |event: &ScheduledEvent<ClickType>| {
            tracing::info!(tick = event.trigger_tick(), click = ?event.payload(), "click");
            Ok(())
        },
        Arc::new(metrics.clone()),
    )));

    let beat_ticks = config.time_signature.ticks_per_beat(config.ppq);
    let bar_ticks = config.time_signature.ticks_per_measure(config.ppq);
    let beats_per_bar = u64::from(config.time_signature.numerator);
    let arm_bar = move |scheduler: &mut EventScheduler<ClickType>| {
        for beat in 0..beats_per_bar {
            let click = if beat == 0 {
                ClickType::Accent
            } else {
                ClickType::Regular
            };
            scheduler.schedule(beat * beat_ticks, click);
        }
    };

    if let Ok(mut scheduler) = scheduler.lock() {
        arm_bar(&mut *scheduler);
    }

    // Re-arm the bar on every loop wrap; subscribed before the scheduler so
    // the new lap's events are queued before the wrap tick is dispatched
    let rearm = {
        let scheduler = Arc::clone(&scheduler);
        let previous = Mutex::new(None::<u64>);
        bus.subscribe_ticks(move |tick| {
            if !tick.is_playing {
                return;
            }
            let Ok(mut previous) = previous.lock() else {
                return;
            };
            if previous.is_some_and(|last| tick.absolute_tick < last) {
                if let Ok(mut scheduler) = scheduler.lock() {
                    scheduler.clear();
                    arm_bar(&mut *scheduler);
                }
            }
            *previous = Some(tick.absolute_tick);
        })
    };
    let dispatch = EventScheduler::attach(&scheduler, &bus);

    bus.publish_command(TransportCommand::SetLoop {
        start: 0,
        end: bar_ticks,
        enabled: true,
    });
    bus.publish_command(TransportCommand::Play);

    let stale_after = Duration::from_millis(config.stale_after_ms);
    let started = Instant::now();
    let mut last_restart: Option<Instant> = None;

    while started.elapsed() < run_for {
        authority.pump();

        let cooling_down = last_restart.is_some_and(|at| at.elapsed() < stale_after);
        if authority.liveness().is_stale && !cooling_down {
            let source = clock.source();
            tracing::warn!(
                clock = source.name(),
                status = ?source.status(),
                "no ticks from clock, restarting"
            );
            clock = clock.restart()?;
            last_restart = Some(Instant::now());
        }

        thread::sleep(PUMP_INTERVAL);
    }

    let snapshot = authority.snapshot();
    tracing::info!(position = %snapshot.position, tick = snapshot.absolute_tick, "run finished");

    let scheduler_stats = match scheduler.lock() {
        Ok(scheduler) => scheduler.diagnostics(),
        Err(poisoned) => poisoned.into_inner().diagnostics(),
    };
    let diagnostics = Diagnostics::gather(
        &bus.stats(),
        &scheduler_stats,
        clock.source().beat_overruns(),
    );
    match diagnostics.to_json() {
        Ok(json) => tracing::info!(diagnostics = %json, "pipeline diagnostics"),
        Err(e) => tracing::warn!("diagnostics serialization failed: {e}"),
    }
    tracing::debug!(metrics = ?metrics.snapshot(), "observer counters");

    dispatch.unsubscribe();
    rearm.unsubscribe();
    authority.dispose();
    clock.source().stop();
    Ok(())
}
