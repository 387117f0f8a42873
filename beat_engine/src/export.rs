//! Recording export: encoders, format negotiation and the finished artifact.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

/// Prefix of every downloaded recording.
pub const FILE_PREFIX: &str = "beat-genius";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportBitDepth {
    Int16,
    Int24,
    Float32,
}

/// Turns captured mono samples into one encoded file.
pub trait ChunkEncoder: Send {
    fn mime_type(&self) -> &str;
    fn extension(&self) -> &str;
    fn encode(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>>;
}

/// In-memory WAV writer. Integer depths are TPDF dithered.
#[derive(Debug, Clone)]
pub struct WavEncoder {
    pub bit_depth: ExportBitDepth,
    pub dither: bool,
}

impl WavEncoder {
    pub fn new(bit_depth: ExportBitDepth) -> Self {
        Self { bit_depth, dither: true }
    }
}

impl ChunkEncoder for WavEncoder {
    fn mime_type(&self) -> &str {
        "audio/wav"
    }

    fn extension(&self) -> &str {
        "wav"
    }

    fn encode(&self, samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
        let (bits_per_sample, sample_format) = match self.bit_depth {
            ExportBitDepth::Int16 => (16, SampleFormat::Int),
            ExportBitDepth::Int24 => (24, SampleFormat::Int),
            ExportBitDepth::Float32 => (32, SampleFormat::Float),
        };
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        let mut dither_state: u32 = 0xDEADBEEF;

        match self.bit_depth {
            ExportBitDepth::Float32 => {
                for &sample in samples {
                    writer.write_sample(sample)?;
                }
            }
            ExportBitDepth::Int16 | ExportBitDepth::Int24 => {
                let bits = bits_per_sample as u32;
                let scale = (1u32 << (bits - 1)) as f32 - 1.0;
                for &sample in samples {
                    let mut s = sample;
                    if self.dither {
                        s += tpdf_dither(&mut dither_state, bits);
                    }
                    let quantized = (s * scale).round().clamp(-(scale + 1.0), scale) as i32;
                    if bits == 16 {
                        writer.write_sample(quantized as i16)?;
                    } else {
                        writer.write_sample(quantized)?;
                    }
                }
            }
        }

        writer.finalize()?;
        Ok(cursor.into_inner())
    }
}

#[inline]
fn tpdf_dither(state: &mut u32, bits: u32) -> f32 {
    let r1 = lcg_next(state);
    let r2 = lcg_next(state);
    let lsb = 1.0 / (1u64 << (bits - 1)) as f32;
    (r1 - r2) * lsb * 0.5
}

#[inline]
fn lcg_next(state: &mut u32) -> f32 {
    *state = state.wrapping_mul(1103515245).wrapping_add(12345);
    (*state as f32) / (u32::MAX as f32)
}

/// Encoders available on this build, in registration order.
#[derive(Default)]
pub struct EncoderRegistry {
    encoders: Vec<Box<dyn ChunkEncoder>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// WAV is always available.
    pub fn with_defaults(bit_depth: ExportBitDepth) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WavEncoder::new(bit_depth)));
        registry
    }

    pub fn register(&mut self, encoder: Box<dyn ChunkEncoder>) {
        self.encoders.push(encoder);
    }

    pub fn supports(&self, mime_type: &str) -> bool {
        self.encoders.iter().any(|e| e.mime_type().eq_ignore_ascii_case(mime_type))
    }

    /// First preference with a registered encoder, otherwise the first
    /// registered encoder. `None` only when nothing is registered.
    pub fn negotiate(&self, preferences: &[String]) -> Option<&dyn ChunkEncoder> {
        preferences
            .iter()
            .find_map(|mime| {
                self.encoders
                    .iter()
                    .find(|e| e.mime_type().eq_ignore_ascii_case(mime))
            })
            .or_else(|| self.encoders.first())
            .map(|e| e.as_ref())
    }
}

/// A finished recording ready to hand to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl RecordingArtifact {
    pub fn encode(
        encoder: &dyn ChunkEncoder,
        samples: &[f32],
        sample_rate: u32,
        recorded_at: DateTime<Local>,
    ) -> anyhow::Result<Self> {
        let bytes = encoder.encode(samples, sample_rate)?;
        Ok(Self {
            bytes,
            mime_type: encoder.mime_type().to_string(),
            file_name: file_name(recorded_at, encoder.extension()),
        })
    }

    /// Write into `dir` under the artifact's file name.
    pub fn save_in(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `beat-genius-YYYY-MM-DD_HH-MM-SS.<ext>`
pub fn file_name(at: DateTime<Local>, extension: &str) -> String {
    format!("{}-{}.{}", FILE_PREFIX, at.format("%Y-%m-%d_%H-%M-%S"), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FakeOpus;

    impl ChunkEncoder for FakeOpus {
        fn mime_type(&self) -> &str {
            "audio/webm;codecs=opus"
        }
        fn extension(&self) -> &str {
            "webm"
        }
        fn encode(&self, samples: &[f32], _sample_rate: u32) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0; samples.len()])
        }
    }

    fn prefs() -> Vec<String> {
        crate::config::RecordingConfig::default().preferred_formats
    }

    #[test]
    fn test_negotiation_falls_through_to_wav() {
        let registry = EncoderRegistry::with_defaults(ExportBitDepth::Int16);
        assert_eq!(registry.negotiate(&prefs()).unwrap().mime_type(), "audio/wav");
    }

    #[test]
    fn test_negotiation_prefers_earlier_format() {
        let mut registry = EncoderRegistry::with_defaults(ExportBitDepth::Int16);
        registry.register(Box::new(FakeOpus));
        assert!(registry.supports("audio/webm;codecs=opus"));
        assert_eq!(registry.negotiate(&prefs()).unwrap().extension(), "webm");
    }

    #[test]
    fn test_negotiation_without_match_uses_first_registered() {
        let mut registry = EncoderRegistry::new();
        assert!(registry.negotiate(&prefs()).is_none());
        registry.register(Box::new(FakeOpus));
        registry.register(Box::new(WavEncoder::new(ExportBitDepth::Int16)));
        let only_flac = vec!["audio/flac".to_string()];
        assert_eq!(registry.negotiate(&only_flac).unwrap().mime_type(), "audio/webm;codecs=opus");
    }

    #[test]
    fn test_wav_round_trip_through_hound() {
        let samples: Vec<f32> = (0..480).map(|i| (i as f32 / 480.0 * 6.28).sin() * 0.5).collect();
        for depth in [ExportBitDepth::Int16, ExportBitDepth::Int24, ExportBitDepth::Float32] {
            let bytes = WavEncoder::new(depth).encode(&samples, 48_000).unwrap();
            let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
            let spec = reader.spec();
            assert_eq!(spec.channels, 1);
            assert_eq!(spec.sample_rate, 48_000);
            assert_eq!(reader.len(), 480);
        }
    }

    #[test]
    fn test_int16_quantization_stays_close() {
        let samples = [0.0f32, 0.25, -0.5, 1.5];
        let bytes = WavEncoder::new(ExportBitDepth::Int16).encode(&samples, 8_000).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert!(decoded[0].abs() <= 1);
        assert!((decoded[1] - 8191).abs() <= 1);
        assert!((decoded[2] + 16383).abs() <= 1);
        assert_eq!(decoded[3], i16::MAX);
    }

    #[test]
    fn test_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(file_name(at, "wav"), "beat-genius-2024-03-09_07-05-01.wav");
    }

    #[test]
    fn test_save_in_writes_bytes() {
        let dir = std::env::temp_dir().join(format!("beat-genius-test-{}", std::process::id()));
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let artifact = RecordingArtifact::encode(&FakeOpus, &[0.1; 10], 48_000, at).unwrap();
        let path = artifact.save_in(&dir).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 10);
        assert!(path.ends_with("beat-genius-2024-01-02_03-04-05.webm"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
