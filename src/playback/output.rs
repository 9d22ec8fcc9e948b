//! cpal-backed audio output.
//!
//! The render callback pulls mono samples from a shared queue, duplicating
//! each one across the device's channels, and counts the frames it has
//! rendered; that counter is the session's monotonic clock. An empty queue
//! renders silence while the clock keeps advancing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;

use crate::error::{TtsError, TtsResult};

use super::scheduler::AudioSink;
use super::types::{AudioFormat, OUTPUT_CHANNELS, PLAYBACK_SAMPLE_RATE};

struct Shared {
    /// Mono samples at the device rate; one entry per output frame.
    queue: Mutex<VecDeque<f32>>,
    /// Frames rendered since the stream started, silence included.
    frames_rendered: AtomicU64,
}

pub struct CpalSink {
    shared: Arc<Shared>,
    stream: Option<Stream>,
    device_rate: u32,
    /// Device frames per source sample (48 kHz out of 24 kHz in = 2).
    expand: usize,
}

impl CpalSink {
    /// Open the default output device at the fixed playback rate.
    pub fn open(format: &AudioFormat) -> TtsResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TtsError::AudioOutput("no output device available".into()))?;
        let sample_format = device
            .default_output_config()
            .map_err(|err| TtsError::AudioOutput(err.to_string()))?
            .sample_format();

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            frames_rendered: AtomicU64::new(0),
        });
        // Stereo at 48 kHz is what devices reliably accept; the 24 kHz mono
        // stream is expanded on the way into the queue and across channels
        // in the callback.
        let config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: PLAYBACK_SAMPLE_RATE,
            buffer_size: cpal::BufferSize::Default,
        };
        let stream = match sample_format {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, shared.clone()),
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, shared.clone()),
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, shared.clone()),
            other => Err(TtsError::AudioOutput(format!(
                "unsupported sample format: {other:?}"
            ))),
        }?;
        stream
            .play()
            .map_err(|err| TtsError::AudioOutput(err.to_string()))?;

        Ok(Self {
            shared,
            stream: Some(stream),
            device_rate: PLAYBACK_SAMPLE_RATE,
            expand: (PLAYBACK_SAMPLE_RATE / format.sample_rate) as usize,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        shared: Arc<Shared>,
    ) -> TtsResult<Stream> {
        let channels = config.channels as usize;
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // The frame counter is updated under the queue lock so a
                    // concurrent `start_at` sees a consistent tail position.
                    let mut queue = shared.queue.lock();
                    for frame in data.chunks_mut(channels) {
                        let sample = queue.pop_front().unwrap_or(0.0);
                        for slot in frame.iter_mut() {
                            *slot = T::from_sample(sample);
                        }
                    }
                    shared
                        .frames_rendered
                        .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                },
                |err| tracing::error!("audio output stream error: {err}"),
                None,
            )
            .map_err(|err| TtsError::AudioOutput(err.to_string()))
    }

    fn seconds_rendered(&self) -> f64 {
        self.shared.frames_rendered.load(Ordering::Relaxed) as f64 / self.device_rate as f64
    }
}

impl AudioSink for CpalSink {
    fn clock(&self) -> f64 {
        self.seconds_rendered()
    }

    fn start_at(&mut self, when: f64, samples: &[f32]) -> TtsResult<()> {
        let mut queue = self.shared.queue.lock();
        // Tail position is read under the lock so the callback cannot
        // consume frames between the padding decision and the append.
        let tail = self.seconds_rendered() + queue.len() as f64 / self.device_rate as f64;
        if when > tail {
            let silence = ((when - tail) * self.device_rate as f64).round() as usize;
            let new_len = queue.len() + silence;
            queue.resize(new_len, 0.0);
        }
        for &sample in samples {
            for _ in 0..self.expand {
                queue.push_back(sample);
            }
        }
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.shared.queue.lock().is_empty()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.shared.queue.lock().clear();
    }
}
