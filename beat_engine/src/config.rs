use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::export::ExportBitDepth;
use crate::scheduler::SchedulerConfig;

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "BEATGENIUS_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerSettings,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub lookahead_ms: u64,
    pub schedule_ahead_secs: f64,
    pub start_offset_secs: f64,
    pub min_step_fraction: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            lookahead_ms: 25,
            schedule_ahead_secs: 0.1,
            start_offset_secs: 0.05,
            min_step_fraction: 0.05,
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(s: &SchedulerSettings) -> Self {
        SchedulerConfig {
            lookahead: Duration::from_millis(s.lookahead_ms.max(1)),
            schedule_ahead: s.schedule_ahead_secs.max(0.0),
            start_offset: s.start_offset_secs.max(0.0),
            min_step_fraction: s.min_step_fraction.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub buffer_size: u32,
    pub max_voices: usize,
    pub master_volume: f32,
    pub reverb_wet: f32,
    pub volume_ramp_ms: f32,
    pub reverb_ramp_ms: f32,
    pub tap_capacity_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_size: 512,
            max_voices: 64,
            master_volume: 0.8,
            reverb_wet: 0.3,
            volume_ramp_ms: 20.0,
            reverb_ramp_ms: 100.0,
            tap_capacity_secs: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// MIME types in order of preference.
    pub preferred_formats: Vec<String>,
    pub bit_depth: ExportBitDepth,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            preferred_formats: vec![
                "audio/webm;codecs=opus".to_string(),
                "audio/mp4".to_string(),
                "audio/wav".to_string(),
            ],
            bit_depth: ExportBitDepth::Int16,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml_str(&text)
    }

    /// Config from the file named by `BEATGENIUS_CONFIG`, defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let config = Self::load(Path::new(&path))?;
                log::info!("[Config] Loaded {}", Path::new(&path).display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::from(&self.scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [scheduler]
            lookahead_ms = 10

            [audio]
            master_volume = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.lookahead_ms, 10);
        assert_eq!(config.scheduler.schedule_ahead_secs, 0.1);
        assert_eq!(config.audio.master_volume, 0.5);
        assert_eq!(config.audio.max_voices, 64);
        assert_eq!(config.recording, RecordingConfig::default());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = EngineConfig::default();
        config.recording.bit_depth = ExportBitDepth::Float32;
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("bit_depth = \"float32\""));
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(EngineConfig::from_toml_str("[audio]\nmax_voices = \"many\"").is_err());
    }

    #[test]
    fn test_scheduler_config_conversion() {
        let config = EngineConfig::default().scheduler_config();
        assert_eq!(config.lookahead, Duration::from_millis(25));
        assert_eq!(config.start_offset, 0.05);
    }
}
