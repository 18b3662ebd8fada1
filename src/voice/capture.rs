//! Microphone capture
//!
//! Prefers mono 16kHz; otherwise takes the device's default input config and
//! down-mixes to mono in the callback. Downstream buffers carry the actual
//! rate, so no resampling happens here.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::audio::SAMPLE_RATE;
use crate::{Error, Result};

/// Mono f32 samples from the default input device
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    pending: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it reports no usable config
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let config = Self::pick_config(&device)?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            pending: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    fn pick_config(device: &Device) -> Result<StreamConfig> {
        let speech_rate = SampleRate(SAMPLE_RATE);
        let mono_16k = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.sample_format() == cpal::SampleFormat::F32
                    && (c.min_sample_rate()..=c.max_sample_rate()).contains(&speech_rate)
            });

        if let Some(range) = mono_16k {
            return Ok(range.with_sample_rate(speech_rate).config());
        }

        let fallback = device
            .default_input_config()
            .map_err(|e| Error::Audio(e.to_string()))?;
        if fallback.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::Audio(format!(
                "unsupported input sample format: {:?}",
                fallback.sample_format()
            )));
        }
        Ok(fallback.config())
    }

    /// Start capturing; no-op if already running
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let pending = Arc::clone(&self.pending);
        let channels = usize::from(self.config.channels.max(1));
        let scale = 1.0 / f32::from(self.config.channels.max(1));

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let Ok(mut buf) = pending.lock() else {
                        return;
                    };
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        buf.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() * scale),
                        );
                    }
                },
                |err| {
                    tracing::error!(error = %err, "microphone stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("microphone capture started");
        Ok(())
    }

    /// Stop capturing and release the input stream
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("microphone capture stopped");
        }
    }

    /// Drain the samples captured since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.pending
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Rate of the samples returned by [`Self::take_buffer`]
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
