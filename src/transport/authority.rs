// Time authority - Single owner of transport state
//
// Converts clock beats into absolute ticks and runs the command state
// machine. Everything happens inside `pump()` (or the direct control
// methods), so the owner's thread is the one serialized processing context.

use super::command::TransportCommand;
use super::tick::{Tick, TransportSnapshot, TransportState};
use super::timeline::{LoopRegion, Position, Tempo, TimeSignature};
use crate::bus::{EventBus, Subscription};
use crate::clock::{AuthorityEndpoint, BeatMessage, BeatSample, ClockControl};
use crate::config::{BeatPolicy, StopPolicy, TransportConfig};
use crate::diagnostics::{NoopObserver, TransportObserver};
use crate::error::{TransportError, TransportResult};
use crossbeam_channel::{Receiver, unbounded};
use ringbuf::traits::{Consumer, Producer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Work done by one `pump()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpReport {
    pub commands: usize,
    pub rejected: usize,
    pub beats: usize,
    pub stale_beats: usize,
    pub ticks_published: usize,
}

/// Liveness signal for recovery layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    /// When the last beat-driven tick was published
    pub last_tick_at: Option<Instant>,
    pub is_playing: bool,
    /// Playing, yet no tick for longer than the configured threshold
    pub is_stale: bool,
}

pub struct TimeAuthority {
    ppq: u32,
    time_signature: TimeSignature,
    stop_policy: StopPolicy,
    beat_policy: BeatPolicy,
    stale_after: Duration,

    bus: Arc<EventBus>,
    subscription: Subscription,
    commands: Receiver<TransportCommand>,
    clock: AuthorityEndpoint,
    observer: Arc<dyn TransportObserver>,

    state: TransportState,
    tempo: Tempo,
    absolute_tick: u64,
    loop_region: LoopRegion,

    epoch: u32,
    /// Tick the current clock run maps beat 0 to; may go negative after a
    /// loop wrap rebases it
    play_start_offset: i64,
    last_beat_ticks: u64,
    last_sample_time: Option<f64>,
    pending_ms: f64,
    last_timestamp: f64,

    last_tick_at: Option<Instant>,
    playing_since: Option<Instant>,
}

impl TimeAuthority {
    pub fn new(
        config: &TransportConfig,
        bus: Arc<EventBus>,
        clock: AuthorityEndpoint,
    ) -> TransportResult<Self> {
        Self::with_observer(config, bus, clock, Arc::new(NoopObserver))
    }

    /// Subscribes to the bus Command channel; commands queue until `pump()`
    pub fn with_observer(
        config: &TransportConfig,
        bus: Arc<EventBus>,
        clock: AuthorityEndpoint,
        observer: Arc<dyn TransportObserver>,
    ) -> TransportResult<Self> {
        let tempo = Tempo::try_new(config.initial_tempo)?;
        config.time_signature.validate()?;
        if config.ppq == 0 {
            return Err(TransportError::InvalidCommand("ppq must be > 0".into()));
        }

        let (sender, commands) = unbounded();
        let subscription = bus.subscribe_commands(move |command| {
            if sender.send(*command).is_err() {
                tracing::trace!("authority gone, command ignored");
            }
        });

        Ok(Self {
            ppq: config.ppq,
            time_signature: config.time_signature,
            stop_policy: config.stop_policy,
            beat_policy: config.beat_policy,
            stale_after: Duration::from_millis(config.stale_after_ms),
            bus,
            subscription,
            commands,
            clock,
            observer,
            state: TransportState::Stopped,
            tempo,
            absolute_tick: 0,
            loop_region: LoopRegion::default(),
            epoch: 0,
            play_start_offset: 0,
            last_beat_ticks: 0,
            last_sample_time: None,
            pending_ms: 0.0,
            last_timestamp: 0.0,
            last_tick_at: None,
            playing_since: None,
        })
    }

    // ---------- processing ----------

    /// Apply queued commands in publish order, then convert pending beats
    ///
    /// Never fails: rejected commands and stale beats are logged and counted.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        if self.state.is_disposed() {
            return report;
        }

        while let Ok(command) = self.commands.try_recv() {
            report.commands += 1;
            if self.apply(command).is_err() {
                report.rejected += 1;
            }
        }

        while let Some(message) = self.clock.beats.try_pop() {
            report.beats += 1;
            self.process_beat(message, &mut report);
        }

        report
    }

    /// Run one command now, bypassing the bus queue
    pub fn apply(&mut self, command: TransportCommand) -> TransportResult<()> {
        tracing::debug!(command = command.name(), "applying command");
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.pause(),
            TransportCommand::Stop => self.stop(),
            TransportCommand::Toggle => self.toggle(),
            TransportCommand::Seek { tick } => self.seek(tick),
            TransportCommand::SetTempo { bpm } => return self.set_tempo(bpm),
            TransportCommand::SetLoop { start, end, enabled } => {
                return self.set_loop(start, end, enabled);
            }
        }
        Ok(())
    }

    fn process_beat(&mut self, message: BeatMessage, report: &mut PumpReport) {
        if message.epoch != self.epoch {
            report.stale_beats += 1;
            self.observer.stale_beat_discarded();
            tracing::trace!(
                epoch = message.epoch,
                current = self.epoch,
                "stale beat discarded"
            );
            return;
        }
        if !self.state.is_playing() {
            return;
        }

        let advanced = match (self.beat_policy, message.sample) {
            (BeatPolicy::PreferBeatData, sample @ BeatSample::HasBeatData { .. }) => {
                self.advance_from_beat(sample);
                true
            }
            (_, sample) => self.advance_from_delta(sample.current_time()),
        };

        if advanced {
            self.last_timestamp = message.sample.current_time();
            self.last_tick_at = Some(Instant::now());
            self.publish_tick();
            report.ticks_published += 1;
        }
    }

    /// `tick = round((beat + fraction) * ppq) + play_start_offset`, wrapped
    fn advance_from_beat(&mut self, sample: BeatSample) {
        let beat_ticks = sample.ticks_since_start(self.ppq).unwrap_or(0);
        self.last_beat_ticks = beat_ticks;
        self.last_sample_time = Some(sample.current_time());

        let raw = (beat_ticks as i64 + self.play_start_offset).max(0) as u64;
        let wrapped = self.loop_region.wrap(raw);
        if wrapped != raw {
            // Keep following beats relative to the wrapped position
            self.play_start_offset = wrapped as i64 - beat_ticks as i64;
            tracing::trace!(from = raw, to = wrapped, "loop wrap");
        }
        self.absolute_tick = wrapped;
    }

    /// Millisecond fallback; returns true once at least one tick elapsed
    ///
    /// Whole ticks are consumed from the accumulator, the fraction carries
    /// over to the next sample.
    fn advance_from_delta(&mut self, current_time: f64) -> bool {
        let Some(previous) = self.last_sample_time.replace(current_time) else {
            // First sample of the run only anchors the clock
            return false;
        };

        self.pending_ms += ((current_time - previous) * 1000.0).max(0.0);
        let ticks = self.tempo.ticks_for_millis(self.pending_ms, self.ppq).round();
        if ticks < 1.0 {
            return false;
        }
        // Keep the rounding remainder so the tick rate matches the tempo
        self.pending_ms -= ticks / self.tempo.ticks_for_millis(1.0, self.ppq);

        let raw = self.absolute_tick.saturating_add(ticks as u64);
        self.absolute_tick = self.loop_region.wrap(raw);
        self.play_start_offset = self.absolute_tick as i64 - self.last_beat_ticks as i64;
        true
    }

    // ---------- commands ----------

    /// Stopped/Paused → Playing; no-op when already playing
    pub fn play(&mut self) {
        if self.state.is_disposed() || self.state.is_playing() {
            return;
        }

        self.state = TransportState::Playing;
        self.play_start_offset = self.absolute_tick as i64;
        self.last_beat_ticks = 0;
        self.reset_delta();
        self.epoch = self.epoch.wrapping_add(1);
        self.playing_since = Some(Instant::now());
        self.send_control(ClockControl::Start {
            epoch: self.epoch,
            bpm: self.tempo.bpm(),
        });
        tracing::info!(tick = self.absolute_tick, epoch = self.epoch, "transport playing");
    }

    /// Playing → Paused; position kept
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }

        self.state = TransportState::Paused;
        self.playing_since = None;
        self.send_control(ClockControl::Stop);
        tracing::info!(tick = self.absolute_tick, "transport paused");
        self.publish_tick();
    }

    /// Any live state → Stopped; position reset or kept per `StopPolicy`
    pub fn stop(&mut self) {
        if self.state.is_disposed() {
            return;
        }

        if self.state != TransportState::Stopped {
            self.send_control(ClockControl::Stop);
        }
        self.state = TransportState::Stopped;
        self.playing_since = None;
        if self.stop_policy == StopPolicy::Reset {
            self.absolute_tick = 0;
        }
        tracing::info!(tick = self.absolute_tick, "transport stopped");
        self.publish_tick();
    }

    pub fn toggle(&mut self) {
        if self.state.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead; while playing the next beat continues from `tick`
    pub fn seek(&mut self, tick: u64) {
        if self.state.is_disposed() {
            return;
        }

        let target = self.loop_region.wrap(tick);
        self.absolute_tick = target;
        if self.state.is_playing() {
            self.play_start_offset = target as i64 - self.last_beat_ticks as i64;
            self.pending_ms = 0.0;
        } else {
            self.publish_tick();
        }
        tracing::debug!(tick = target, "seek");
    }

    pub fn set_tempo(&mut self, bpm: f64) -> TransportResult<()> {
        if self.state.is_disposed() {
            return Ok(());
        }

        let tempo = Tempo::try_new(bpm).map_err(|e| self.reject(e))?;
        self.tempo = tempo;
        if self.state.is_playing() {
            self.send_control(ClockControl::SetTempo(bpm));
        } else {
            self.publish_tick();
        }
        tracing::debug!(bpm, "tempo changed");
        Ok(())
    }

    /// Rejects `end <= start` without touching the current loop
    pub fn set_loop(&mut self, start: u64, end: u64, enabled: bool) -> TransportResult<()> {
        if self.state.is_disposed() {
            return Ok(());
        }

        let region = LoopRegion::try_new(start, end, enabled).map_err(|e| self.reject(e))?;
        self.loop_region = region;
        if !self.state.is_playing() {
            self.publish_tick();
        }
        tracing::debug!(start, end, enabled, "loop changed");
        Ok(())
    }

    /// Terminal and idempotent; later calls on this authority do nothing
    pub fn dispose(&mut self) {
        if self.state.is_disposed() {
            return;
        }

        if self.state != TransportState::Stopped {
            self.send_control(ClockControl::Stop);
        }
        self.subscription.unsubscribe();
        while self.commands.try_recv().is_ok() {}
        self.state = TransportState::Disposed;
        self.playing_since = None;
        tracing::info!("time authority disposed");
    }

    // ---------- queries ----------

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.state,
            tempo: self.tempo.bpm(),
            absolute_tick: self.absolute_tick,
            position: self.position(),
            loop_region: self.loop_region,
            time_signature: self.time_signature,
            ppq: self.ppq,
            epoch: self.epoch,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn absolute_tick(&self) -> u64 {
        self.absolute_tick
    }

    pub fn position(&self) -> Position {
        Position::from_absolute(self.absolute_tick, self.ppq, &self.time_signature)
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// Clock run counter, bumped by every `play()` from a non-playing state
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness_at(Instant::now())
    }

    pub fn liveness_at(&self, now: Instant) -> Liveness {
        let is_playing = self.state.is_playing();
        let reference = self.last_tick_at.max(self.playing_since);
        let is_stale = is_playing
            && reference.is_some_and(|at| now.saturating_duration_since(at) > self.stale_after);

        Liveness {
            last_tick_at: self.last_tick_at,
            is_playing,
            is_stale,
        }
    }

    // ---------- helpers ----------

    fn reset_delta(&mut self) {
        self.last_sample_time = None;
        self.pending_ms = 0.0;
    }

    fn reject(&self, error: TransportError) -> TransportError {
        tracing::warn!("{error}");
        self.observer.command_rejected(&error);
        error
    }

    fn send_control(&mut self, control: ClockControl) {
        if let Err(control) = self.clock.control.try_push(control) {
            tracing::warn!(?control, "clock control ring full, message dropped");
        }
    }

    fn current_tick(&self) -> Tick {
        Tick {
            position: self.position(),
            absolute_tick: self.absolute_tick,
            tempo: self.tempo.bpm(),
            is_playing: self.state.is_playing(),
            loop_region: self.loop_region,
            timestamp: self.last_timestamp,
        }
    }

    fn publish_tick(&self) {
        let tick = self.current_tick();
        self.observer.tick_published(&tick);
        self.bus.publish_tick(&tick);
    }
}

impl Drop for TimeAuthority {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{BeatGenerator, ClockEndpoint, link};
    use crate::diagnostics::AtomicMetrics;
    use std::sync::Mutex;

    struct Harness {
        authority: TimeAuthority,
        clock: ClockEndpoint,
        bus: Arc<EventBus>,
        ticks: Arc<Mutex<Vec<Tick>>>,
        metrics: AtomicMetrics,
    }

    fn harness_with(config: TransportConfig) -> Harness {
        let bus = Arc::new(EventBus::new());
        let (clock, endpoint) = link(64, 64);
        let metrics = AtomicMetrics::new();
        let authority = TimeAuthority::with_observer(
            &config,
            bus.clone(),
            endpoint,
            Arc::new(metrics.clone()),
        )
        .unwrap();

        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();
        bus.subscribe_ticks(move |tick| sink.lock().unwrap().push(*tick));

        Harness {
            authority,
            clock,
            bus,
            ticks,
            metrics,
        }
    }

    fn harness() -> Harness {
        harness_with(TransportConfig::default())
    }

    impl Harness {
        fn beat(&mut self, beats: f64) {
            self.push(BeatSample::from_beats(beats * 0.5, beats));
        }

        fn push(&mut self, sample: BeatSample) {
            let epoch = self.authority.epoch();
            self.push_epoch(epoch, sample);
        }

        fn push_epoch(&mut self, epoch: u32, sample: BeatSample) {
            self.clock.beats.try_push(BeatMessage { epoch, sample }).unwrap();
        }

        fn controls(&mut self) -> Vec<ClockControl> {
            self.clock.control.pop_iter().collect()
        }

        fn playing_ticks(&self) -> Vec<u64> {
            self.ticks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.is_playing)
                .map(|t| t.absolute_tick)
                .collect()
        }
    }

    #[test]
    fn test_beat_position_to_ticks() {
        let mut h = harness();
        h.authority.play();
        h.beat(2.5);
        h.authority.pump();

        assert_eq!(h.authority.absolute_tick(), 1200);
        assert_eq!(h.authority.position(), Position::new(1, 3, 240));
    }

    #[test]
    fn test_ticks_monotonic_without_loop() {
        let mut h = harness();
        h.authority.play();
        for i in 0..200 {
            h.beat(i as f64 * 0.037);
        }
        h.authority.pump();

        let ticks = h.playing_ticks();
        assert_eq!(ticks.len(), 200);
        assert!(ticks.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_loop_wrap() {
        let mut h = harness();
        h.authority.set_loop(0, 960, true).unwrap();
        h.authority.play();
        h.beat(1000.0 / 480.0);
        h.authority.pump();

        assert_eq!(h.authority.absolute_tick(), 40);
    }

    #[test]
    fn test_loop_wrap_keeps_counting_from_wrapped_position() {
        let mut h = harness();
        h.authority.set_loop(0, 960, true).unwrap();
        h.authority.play();
        h.beat(1000.0 / 480.0);
        h.beat(1100.0 / 480.0);
        h.authority.pump();
        assert_eq!(h.authority.absolute_tick(), 140);

        // Disabling the loop continues from the wrapped position
        h.authority.set_loop(0, 960, false).unwrap();
        h.beat(1200.0 / 480.0);
        h.authority.pump();
        assert_eq!(h.authority.absolute_tick(), 240);
    }

    #[test]
    fn test_stop_seek_play_starts_at_seek_position() {
        let mut h = harness();
        h.authority.play();
        h.beat(4.0);
        h.authority.pump();

        h.authority.stop();
        assert_eq!(h.authority.absolute_tick(), 0);
        h.authority.seek(500);
        h.authority.play();
        h.beat(0.0);
        h.beat(1.0);
        h.authority.pump();

        let ticks = h.playing_ticks();
        assert_eq!(&ticks[ticks.len() - 2..], &[500, 980]);
    }

    #[test]
    fn test_play_is_idempotent() {
        let mut h = harness();
        h.authority.play();
        let epoch = h.authority.epoch();
        let snapshot = h.authority.snapshot();

        h.authority.play();

        assert_eq!(h.authority.epoch(), epoch);
        assert_eq!(h.authority.snapshot(), snapshot);
        assert_eq!(
            h.controls(),
            vec![ClockControl::Start { epoch, bpm: 120.0 }]
        );
        assert_eq!(h.bus.stats().command_subscribers, 1);
    }

    #[test]
    fn test_pause_keeps_position_and_stops_clock() {
        let mut h = harness();
        h.authority.play();
        h.beat(1.0);
        h.authority.pump();
        h.controls();

        h.authority.pause();
        assert_eq!(h.authority.state(), TransportState::Paused);
        assert_eq!(h.authority.absolute_tick(), 480);
        assert_eq!(h.controls(), vec![ClockControl::Stop]);

        let last = *h.ticks.lock().unwrap().last().unwrap();
        assert!(!last.is_playing);
        assert_eq!(last.absolute_tick, 480);

        // Resume continues from the paused tick
        h.authority.play();
        h.beat(0.5);
        h.authority.pump();
        assert_eq!(h.authority.absolute_tick(), 720);
    }

    #[test]
    fn test_stop_preserve_policy() {
        let config = TransportConfig {
            stop_policy: StopPolicy::Preserve,
            ..TransportConfig::default()
        };
        let mut h = harness_with(config);
        h.authority.play();
        h.beat(2.0);
        h.authority.pump();
        h.authority.stop();

        assert_eq!(h.authority.state(), TransportState::Stopped);
        assert_eq!(h.authority.absolute_tick(), 960);
    }

    #[test]
    fn test_toggle() {
        let mut h = harness();
        h.authority.toggle();
        assert!(h.authority.snapshot().is_playing());
        h.authority.toggle();
        assert_eq!(h.authority.state(), TransportState::Paused);
    }

    #[test]
    fn test_seek_while_playing_rebases() {
        let mut h = harness();
        h.authority.play();
        h.beat(1.0);
        h.authority.pump();

        h.authority.seek(3000);
        h.beat(1.5);
        h.authority.pump();

        assert_eq!(h.authority.absolute_tick(), 3240);
    }

    #[test]
    fn test_seek_past_loop_end_wraps() {
        let mut h = harness();
        h.authority.set_loop(960, 1920, true).unwrap();
        h.authority.seek(2000);
        assert_eq!(h.authority.absolute_tick(), 1040);
    }

    #[test]
    fn test_invalid_loop_rejected_without_mutation() {
        let mut h = harness();
        h.authority.set_loop(0, 960, true).unwrap();

        let result = h.authority.set_loop(960, 960, true);
        assert!(matches!(result, Err(TransportError::InvalidCommand(_))));
        assert_eq!(
            h.authority.snapshot().loop_region,
            LoopRegion {
                enabled: true,
                start_tick: 0,
                end_tick: 960
            }
        );
        assert_eq!(h.metrics.snapshot().commands_rejected, 1);
    }

    #[test]
    fn test_set_tempo() {
        let mut h = harness();
        assert!(h.authority.set_tempo(5.0).is_err());
        assert_eq!(h.authority.snapshot().tempo, 120.0);

        h.authority.play();
        h.controls();
        h.authority.set_tempo(90.0).unwrap();
        assert_eq!(h.controls(), vec![ClockControl::SetTempo(90.0)]);
        assert_eq!(h.authority.snapshot().tempo, 90.0);
    }

    #[test]
    fn test_stale_epoch_discarded() {
        let mut h = harness();
        h.authority.play();
        let old_epoch = h.authority.epoch();
        h.authority.pause();
        h.authority.play();

        h.push_epoch(old_epoch, BeatSample::from_beats(0.0, 10.0));
        let report = h.authority.pump();

        assert_eq!(report.stale_beats, 1);
        assert_eq!(report.ticks_published, 0);
        assert_eq!(h.authority.absolute_tick(), 0);
        assert_eq!(h.metrics.snapshot().stale_beats, 1);
    }

    #[test]
    fn test_beats_ignored_while_stopped() {
        let mut h = harness();
        h.beat(3.0);
        let report = h.authority.pump();
        assert_eq!(report.beats, 1);
        assert_eq!(report.ticks_published, 0);
        assert_eq!(h.authority.absolute_tick(), 0);
    }

    #[test]
    fn test_delta_fallback_accumulates() {
        let mut h = harness();
        h.authority.play();

        // Anchor, then half a millisecond (under one tick)
        h.push(BeatSample::TimeDeltaOnly { current_time: 0.0 });
        h.push(BeatSample::TimeDeltaOnly { current_time: 0.0005 });
        let report = h.authority.pump();
        assert_eq!(report.ticks_published, 0);
        assert_eq!(h.authority.absolute_tick(), 0);

        // 250 ms at 120 bpm, 480 ppq: 240 ticks
        h.push(BeatSample::TimeDeltaOnly { current_time: 0.25 });
        let report = h.authority.pump();
        assert_eq!(report.ticks_published, 1);
        assert_eq!(h.authority.absolute_tick(), 240);
    }

    fn run_delta_steps(ppq: u32, step_ms: f64, steps: u32) -> u64 {
        let config = TransportConfig {
            ppq,
            ..TransportConfig::default()
        };
        let mut h = harness_with(config);
        h.authority.play();

        for i in 0..=steps {
            h.push(BeatSample::TimeDeltaOnly {
                current_time: f64::from(i) * step_ms / 1000.0,
            });
            h.authority.pump();
        }
        h.authority.absolute_tick()
    }

    #[test]
    fn test_delta_fallback_keeps_fractional_ticks() {
        // 1000 steps of 16.1 ms at 120 bpm: 16100 ms of transport time
        let tempo = Tempo::default();
        for ppq in [480, 24] {
            let expected = tempo.ticks_for_millis(16_100.0, ppq);
            let tick = run_delta_steps(ppq, 16.1, 1000);
            assert!(
                (tick as f64 - expected).abs() <= 1.0,
                "ppq {ppq}: tick {tick}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_delta_only_policy_ignores_beat_data() {
        let config = TransportConfig {
            beat_policy: BeatPolicy::DeltaOnly,
            ..TransportConfig::default()
        };
        let mut h = harness_with(config);
        h.authority.play();

        h.push(BeatSample::HasBeatData {
            current_time: 0.0,
            beat: 50.0,
            fraction: 0.0,
        });
        h.push(BeatSample::HasBeatData {
            current_time: 0.5,
            beat: 51.0,
            fraction: 0.0,
        });
        h.authority.pump();

        // 500 ms at 120 bpm is one beat
        assert_eq!(h.authority.absolute_tick(), 480);
    }

    #[test]
    fn test_commands_applied_in_publish_order_on_pump() {
        let mut h = harness();
        h.bus.publish_command(TransportCommand::Seek { tick: 100 });
        h.bus.publish_command(TransportCommand::Seek { tick: 200 });
        assert_eq!(h.authority.absolute_tick(), 0);

        let report = h.authority.pump();
        assert_eq!(report.commands, 2);
        assert_eq!(h.authority.absolute_tick(), 200);
    }

    #[test]
    fn test_rejected_command_does_not_block_queue() {
        let mut h = harness();
        h.bus.publish_command(TransportCommand::SetLoop {
            start: 10,
            end: 5,
            enabled: true,
        });
        h.bus.publish_command(TransportCommand::Play);

        let report = h.authority.pump();
        assert_eq!(report.rejected, 1);
        assert!(h.authority.snapshot().is_playing());
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let mut h = harness();
        h.authority.play();
        h.authority.dispose();
        h.authority.dispose();

        assert_eq!(h.authority.state(), TransportState::Disposed);
        assert_eq!(h.bus.stats().command_subscribers, 0);

        h.authority.play();
        h.authority.seek(100);
        assert!(h.authority.set_tempo(1.0).is_ok());
        h.bus.publish_command(TransportCommand::Play);
        assert_eq!(h.authority.pump(), PumpReport::default());
        assert_eq!(h.authority.state(), TransportState::Disposed);
        assert_eq!(h.authority.absolute_tick(), 0);
    }

    #[test]
    fn test_liveness() {
        let mut h = harness();
        let now = Instant::now();
        assert!(!h.authority.liveness_at(now).is_stale);

        h.authority.play();
        let later = Instant::now() + Duration::from_secs(2);
        assert!(h.authority.liveness_at(later).is_stale);

        h.beat(0.0);
        h.authority.pump();
        let liveness = h.authority.liveness();
        assert!(liveness.is_playing);
        assert!(!liveness.is_stale);
        assert!(liveness.last_tick_at.is_some());

        h.authority.pause();
        assert!(!h.authority.liveness_at(later).is_stale);
    }

    #[test]
    fn test_generator_end_to_end() {
        let bus = Arc::new(EventBus::new());
        let (clock, endpoint) = link(64, 64);
        let mut generator = BeatGenerator::new(clock, 10.0);
        let mut authority =
            TimeAuthority::new(&TransportConfig::default(), bus.clone(), endpoint).unwrap();

        authority.play();
        generator.advance(0.0);
        generator.advance(1.25);
        authority.pump();
        assert_eq!(authority.absolute_tick(), 1200);

        // Beats still in flight from the paused run never land
        generator.advance(0.25);
        authority.pause();
        authority.play();
        authority.pump();
        assert_eq!(authority.absolute_tick(), 1200);

        generator.advance(0.0);
        generator.advance(0.5);
        authority.pump();
        assert_eq!(authority.absolute_tick(), 1680);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bus = Arc::new(EventBus::new());
        let (_clock, endpoint) = link(4, 4);
        let config = TransportConfig {
            initial_tempo: 0.0,
            ..TransportConfig::default()
        };
        assert!(TimeAuthority::new(&config, bus, endpoint).is_err());
    }
}
