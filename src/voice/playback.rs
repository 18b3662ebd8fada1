//! Audio playback to speakers
//!
//! A single [`Playback`] owns the process-wide output slot. Starting a new
//! stream always stops and releases the previous one first, so two streams
//! never play at once.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Default interval between busy checks
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Preferred output sample rate (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// An in-flight playback stream
pub trait PlaybackHandle: Send {
    /// Stop the stream and release the device
    fn stop(&mut self);

    /// True while audio is still playing
    fn is_busy(&self) -> bool;
}

/// Audio output device
pub trait AudioSink: Send + Sync {
    /// Start playing compressed audio, returning immediately
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or the device fails
    fn start(&self, audio: &[u8]) -> Result<Box<dyn PlaybackHandle>>;
}

/// How a playback request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The audio played to the end
    Finished,
    /// A newer request stopped this one
    Superseded,
}

struct Slot {
    generation: u64,
    handle: Option<Box<dyn PlaybackHandle>>,
}

/// Exclusive owner of the audio output
#[derive(Clone)]
pub struct Playback {
    sink: Arc<dyn AudioSink>,
    slot: Arc<Mutex<Slot>>,
    poll_interval: Duration,
}

impl Playback {
    /// Wrap an audio sink
    #[must_use]
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                handle: None,
            })),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the busy-poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Play audio, waiting until it finishes or is superseded
    ///
    /// # Errors
    ///
    /// Returns error if the sink cannot start the stream
    pub async fn play(&self, audio: &[u8]) -> Result<PlaybackOutcome> {
        let generation = {
            let mut slot = self.lock_slot()?;
            if let Some(mut previous) = slot.handle.take() {
                tracing::debug!("stopping previous playback");
                previous.stop();
            }
            slot.generation += 1;
            // Start under the lock so no other request can interleave
            slot.handle = Some(self.sink.start(audio)?);
            slot.generation
        };

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let mut slot = self.lock_slot()?;
            if slot.generation != generation {
                tracing::debug!("playback superseded");
                return Ok(PlaybackOutcome::Superseded);
            }

            let busy = slot.handle.as_ref().is_some_and(|h| h.is_busy());
            if !busy {
                if let Some(mut handle) = slot.handle.take() {
                    handle.stop();
                }
                tracing::debug!("playback complete");
                return Ok(PlaybackOutcome::Finished);
            }
        }
    }

    /// Stop whatever is playing
    pub fn stop(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.generation += 1;
            if let Some(mut handle) = slot.handle.take() {
                handle.stop();
            }
        }
    }

    /// True if a stream currently holds the output
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.handle.as_ref().is_some_and(|h| h.is_busy()))
            .unwrap_or(false)
    }

    fn lock_slot(&self) -> Result<std::sync::MutexGuard<'_, Slot>> {
        self.slot
            .lock()
            .map_err(|_| Error::Audio("playback slot poisoned".to_string()))
    }
}

/// Default output device via cpal
pub struct CpalSink {
    config: StreamConfig,
}

impl CpalSink {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }
}

impl AudioSink for CpalSink {
    fn start(&self, audio: &[u8]) -> Result<Box<dyn PlaybackHandle>> {
        let (samples, rate) = decode_mp3(audio)?;
        self.start_pcm(samples, rate)
    }
}

impl CpalSink {
    /// Start playing mono f32 samples at the given rate
    ///
    /// # Errors
    ///
    /// Returns error if resampling fails or the playback thread cannot spawn
    pub fn start_pcm(&self, samples: Vec<f32>, rate: u32) -> Result<Box<dyn PlaybackHandle>> {
        let samples = if rate == PLAYBACK_SAMPLE_RATE {
            samples
        } else {
            resample(&samples, rate, PLAYBACK_SAMPLE_RATE)?
        };

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(samples.is_empty()));
        let config = self.config.clone();

        // cpal streams are not Send, so a dedicated thread owns the stream
        let thread = {
            let stop = Arc::clone(&stop);
            let finished = Arc::clone(&finished);
            std::thread::Builder::new()
                .name("tutor-playback".to_string())
                .spawn(move || {
                    if let Err(e) = run_stream(&config, samples, &stop, &finished) {
                        tracing::error!(error = %e, "audio playback error");
                    }
                    finished.store(true, Ordering::SeqCst);
                })?
        };

        Ok(Box::new(CpalHandle {
            stop,
            finished,
            thread: Some(thread),
        }))
    }
}

struct CpalHandle {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle for CpalHandle {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn is_busy(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Play samples on the current thread until done or stopped
fn run_stream(
    config: &StreamConfig,
    samples: Vec<f32>,
    stop: &AtomicBool,
    finished: &Arc<AtomicBool>,
) -> Result<()> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let position = Arc::new(AtomicU64::new(0));
    let done = Arc::clone(finished);
    let pos = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                #[allow(clippy::cast_possible_truncation)]
                let mut p = pos.load(Ordering::Relaxed) as usize;
                for frame in data.chunks_mut(channels) {
                    let sample = samples.get(p).copied().unwrap_or(0.0);
                    frame.fill(sample);
                    if p < samples.len() {
                        p += 1;
                    }
                }
                pos.store(p as u64, Ordering::Relaxed);
                if p >= samples.len() {
                    done.store(true, Ordering::SeqCst);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    while !stop.load(Ordering::SeqCst) && !finished.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
    }

    drop(stream);
    tracing::trace!(
        samples = position.load(Ordering::Relaxed),
        stopped = stop.load(Ordering::SeqCst),
        "output stream closed"
    );
    Ok(())
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate as u32;
                }
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Resample mono audio using rubato
#[allow(clippy::cast_possible_truncation)]
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let chunk_size = 1024;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let mut output = Vec::with_capacity(samples.len() * to_rate as usize / from_rate as usize);

    for chunk in samples.chunks(chunk_size) {
        // Zero-pad the tail so the final partial chunk is not lost
        let mut input: Vec<f64> = chunk.iter().map(|&s| f64::from(s)).collect();
        input.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[input], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_garbage_is_empty_or_error() {
        // minimp3 skips non-frame bytes; no frames means no samples
        match decode_mp3(&[0u8; 64]) {
            Ok((samples, _)) => assert!(samples.is_empty()),
            Err(Error::Audio(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_resample_changes_length() {
        let input = vec![0.0_f32; 16000];
        let output = resample(&input, 16000, 24000).unwrap();
        // Padding may add up to one chunk of output
        assert!(output.len() >= 23000);
        assert!(output.len() <= 24000 + 1536 + 1);
    }
}
