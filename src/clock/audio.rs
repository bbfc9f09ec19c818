// Audio clock - Beats paced by the output device callback
//
// The stream renders silence; its only purpose is the callback cadence,
// which keeps running whatever load the coordination thread is under.

use super::generator::BeatGenerator;
use super::status::{AtomicClockStatus, ClockStatus};
use super::timer::TimerClockSource;
use super::ClockSource;
use crate::error::{TransportError, TransportResult};
use crate::sync::lock_or_recover;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct AudioClockSource {
    generator: Arc<Mutex<BeatGenerator>>,
    status: AtomicClockStatus,
    stream: Option<Stream>,
    sample_rate: Option<u32>,
    timer_interval: Duration,
}

impl AudioClockSource {
    /// `timer_interval` is only used if the clock later degrades
    pub fn new(generator: BeatGenerator, timer_interval: Duration) -> Self {
        Self {
            generator: Arc::new(Mutex::new(generator)),
            status: AtomicClockStatus::new(ClockStatus::Idle),
            stream: None,
            sample_rate: None,
            timer_interval,
        }
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn generator(&self) -> Arc<Mutex<BeatGenerator>> {
        Arc::clone(&self.generator)
    }

    /// Give up on the device and keep the same generator running from a timer
    pub fn degrade(mut self) -> TimerClockSource {
        self.stop();
        TimerClockSource::from_shared(Arc::clone(&self.generator), self.timer_interval)
    }

    fn open_stream(&self) -> TransportResult<(Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TransportError::AcquisitionFailure("no output device".into()))?;

        let supported_config = device.default_output_config().map_err(|e| {
            TransportError::AcquisitionFailure(format!("device configuration: {e}"))
        })?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        tracing::debug!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels,
            ?sample_format,
            "opening clock stream"
        );

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&device, &config, channels, sample_rate),
            SampleFormat::I16 => self.build_stream::<i16>(&device, &config, channels, sample_rate),
            SampleFormat::U16 => self.build_stream::<u16>(&device, &config, channels, sample_rate),
            other => Err(TransportError::AcquisitionFailure(format!(
                "unsupported sample format {other:?}, expected F32, I16 or U16"
            ))),
        }?;

        stream
            .play()
            .map_err(|e| TransportError::AcquisitionFailure(format!("stream start: {e}")))?;

        Ok((stream, sample_rate))
    }

    fn build_stream<T>(
        &self,
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        sample_rate: u32,
    ) -> TransportResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let generator = Arc::clone(&self.generator);
        let status = self.status.clone();
        let channels = channels.max(1);

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocation, no I/O, no blocking lock
                    if let Ok(mut generator) = generator.try_lock() {
                        generator.advance_frames(data.len() / channels, sample_rate);
                    }
                    for sample in data.iter_mut() {
                        *sample = Sample::from_sample::<f32>(0.0);
                    }
                },
                move |err| {
                    tracing::error!("clock stream error: {err}");
                    status.set(ClockStatus::Error);
                },
                None,
            )
            .map_err(|e| TransportError::AcquisitionFailure(format!("stream creation: {e}")))
    }
}

impl ClockSource for AudioClockSource {
    fn start(&mut self) -> TransportResult<()> {
        if self.stream.is_some() && self.status.get() == ClockStatus::Realtime {
            return Ok(());
        }
        // A stream that reported an error is rebuilt from scratch
        self.stream = None;
        self.status.set(ClockStatus::Starting);

        match self.open_stream() {
            Ok((stream, sample_rate)) => {
                self.stream = Some(stream);
                self.sample_rate = Some(sample_rate);
                self.status.set(ClockStatus::Realtime);
                tracing::info!(sample_rate, "audio clock started");
                Ok(())
            }
            Err(e) => {
                self.status.set(ClockStatus::Error);
                tracing::warn!("{e}");
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("audio clock stopped");
        }
        self.status.set(ClockStatus::Idle);
    }

    fn status(&self) -> ClockStatus {
        self.status.get()
    }

    fn name(&self) -> &'static str {
        "audio"
    }

    fn beat_overruns(&self) -> u64 {
        lock_or_recover(&self.generator).counters().overruns()
    }
}
