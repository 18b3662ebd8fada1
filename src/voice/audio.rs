//! Canonical waveform handling
//!
//! Every audio input shape is normalized to a PCM16 mono [`AudioBuffer`]
//! before it reaches a recognizer.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Sample rate used when the input does not carry one (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum RMS energy (on a 0.0..=1.0 scale) to consider audio as speech
pub const ENERGY_THRESHOLD: f32 = 0.03;

/// Accepted audio input shapes
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Path to an existing audio file
    File(PathBuf),
    /// Sample rate plus PCM16 samples
    Samples { sample_rate: u32, samples: Vec<i16> },
    /// Raw little-endian PCM16 bytes, sample rate optional
    Raw {
        bytes: Vec<u8>,
        sample_rate: Option<u32>,
    },
}

/// PCM16 mono audio with an explicit sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Mono channel count of every buffer
    pub const CHANNELS: u16 = 1;

    /// Wrap PCM16 samples
    #[must_use]
    pub const fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode raw little-endian PCM16 bytes; a trailing odd byte is dropped
    #[must_use]
    pub fn from_pcm_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Convert f32 samples in [-1.0, 1.0] to PCM16
    #[must_use]
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = samples
            .iter()
            .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
            .collect();
        Self::new(pcm, sample_rate)
    }

    /// Read a WAV file, down-mixing to mono
    ///
    /// # Errors
    ///
    /// Returns error if the file is not a readable PCM WAV
    pub fn read_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
        Self::from_wav_reader(reader)
    }

    /// Parse WAV bytes, down-mixing to mono
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a PCM WAV
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Audio(e.to_string()))?;
        Self::from_wav_reader(reader)
    }

    fn from_wav_reader<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?,
            (hound::SampleFormat::Float, 32) => {
                let floats: Vec<f32> = reader
                    .into_samples::<f32>()
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Audio(e.to_string()))?;
                Self::from_f32(&floats, spec.sample_rate).samples
            }
            (format, bits) => {
                return Err(Error::Audio(format!(
                    "unsupported WAV format: {format:?} {bits}-bit"
                )));
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect()
        };

        Ok(Self::new(samples, spec.sample_rate))
    }

    /// PCM16 samples
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// RMS energy normalized to 0.0..=1.0
    #[must_use]
    pub fn energy(&self) -> f32 {
        let normalized: Vec<f32> = self
            .samples
            .iter()
            .map(|&s| f32::from(s) / 32768.0)
            .collect();
        calculate_energy(&normalized)
    }

    /// True if the buffer is too quiet to contain speech
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.energy() < ENERGY_THRESHOLD
    }

    /// Encode as a 16-bit mono WAV
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_wav(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write as a 16-bit mono WAV to any writer
    ///
    /// # Errors
    ///
    /// Returns error if encoding or writing fails
    pub fn write_wav<W: std::io::Write + std::io::Seek>(&self, out: W) -> Result<()> {
        let mut writer =
            hound::WavWriter::new(out, self.wav_spec()).map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in &self.samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))
    }

    const fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: Self::CHANNELS,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

/// Input resolved at the adapter boundary
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Existing file, used in place
    File(PathBuf),
    /// In-memory canonical waveform
    Buffer(AudioBuffer),
}

impl AudioInput {
    /// Resolve the input shape once; in-memory shapes become a canonical buffer
    #[must_use]
    pub fn resolve(self, default_rate: u32) -> Resolved {
        match self {
            Self::File(path) => Resolved::File(path),
            Self::Samples {
                sample_rate,
                samples,
            } => Resolved::Buffer(AudioBuffer::new(samples, sample_rate)),
            Self::Raw { bytes, sample_rate } => Resolved::Buffer(AudioBuffer::from_pcm_bytes(
                &bytes,
                sample_rate.unwrap_or(default_rate),
            )),
        }
    }

    /// Short label for log fields
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Samples { .. } => "samples",
            Self::Raw { .. } => "raw",
        }
    }
}

/// Calculate RMS energy of f32 samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pcm_bytes_little_endian() {
        let buffer = AudioBuffer::from_pcm_bytes(&[0x01, 0x00, 0xff, 0x7f, 0x00], 8000);
        assert_eq!(buffer.samples(), &[1, i16::MAX]);
        assert_eq!(buffer.sample_rate(), 8000);
    }

    #[test]
    fn test_raw_input_uses_default_rate() {
        let input = AudioInput::Raw {
            bytes: vec![0; 8],
            sample_rate: None,
        };
        let Resolved::Buffer(buffer) = input.resolve(SAMPLE_RATE) else {
            panic!("raw input must resolve to a buffer");
        };
        assert_eq!(buffer.sample_rate(), SAMPLE_RATE);
        assert_eq!(buffer.samples().len(), 4);

        assert!(matches!(
            AudioInput::File(PathBuf::from("a.wav")).resolve(SAMPLE_RATE),
            Resolved::File(_)
        ));
    }

    #[test]
    fn test_silence_detection() {
        let silent = AudioBuffer::new(vec![0; 1600], SAMPLE_RATE);
        assert!(silent.is_silent());

        let loud = AudioBuffer::from_f32(&vec![0.5; 1600], SAMPLE_RATE);
        assert!(!loud.is_silent());

        assert!(AudioBuffer::new(Vec::new(), SAMPLE_RATE).is_silent());
    }

    #[test]
    fn test_wav_header_and_reparse() {
        let buffer = AudioBuffer::new(vec![0, 100, -100, i16::MAX, i16::MIN], 22050);
        let wav = buffer.to_wav_bytes().unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let parsed = AudioBuffer::from_wav_bytes(&wav).unwrap();
        assert_eq!(parsed, buffer);
    }

    #[test]
    fn test_stereo_wav_downmixed() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for (l, r) in [(100_i16, 300_i16), (-200, 0)] {
                writer.write_sample(l).unwrap();
                writer.write_sample(r).unwrap();
            }
            writer.finalize().unwrap();
        }

        let parsed = AudioBuffer::from_wav_bytes(&cursor.into_inner()).unwrap();
        assert_eq!(parsed.samples(), &[200, -100]);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0; 8000], SAMPLE_RATE);
        assert!((buffer.duration_secs() - 0.5).abs() < f32::EPSILON);
    }
}
