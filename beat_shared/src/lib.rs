pub mod generator;
pub mod kit;
pub mod pattern;
pub mod preset;

pub use generator::{GenerateError, PatternGenerator};
pub use kit::{InstrumentType, Kit, Scale, SynthWaveform};
pub use pattern::{PatternData, PatternError, PatternStore, Step, Track};
pub use preset::Preset;

/// Steps per track in a freshly created pattern (sixteenth-note bar).
pub const DEFAULT_GRID_LENGTH: usize = 16;

pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 200.0;
pub const DEFAULT_BPM: f32 = 120.0;

pub const MAX_SWING: f32 = 0.5;

/// Pitch handed to the renderer when a step carries none (A4).
pub const DEFAULT_PITCH_HZ: f32 = 440.0;

/// Clamp a tempo into the supported range. NaN falls back to the default.
pub fn clamp_bpm(bpm: f32) -> f32 {
    if bpm.is_nan() {
        return DEFAULT_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Clamp a swing amount into `[0, MAX_SWING]`. NaN means straight time.
pub fn clamp_swing(swing: f32) -> f32 {
    if swing.is_nan() {
        return 0.0;
    }
    swing.clamp(0.0, MAX_SWING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bpm() {
        assert_eq!(clamp_bpm(20.0), MIN_BPM);
        assert_eq!(clamp_bpm(500.0), MAX_BPM);
        assert_eq!(clamp_bpm(f32::NAN), DEFAULT_BPM);
        assert_eq!(clamp_bpm(133.0), 133.0);
    }

    #[test]
    fn test_clamp_swing() {
        assert_eq!(clamp_swing(-1.0), 0.0);
        assert_eq!(clamp_swing(0.9), MAX_SWING);
        assert_eq!(clamp_swing(f32::NAN), 0.0);
    }
}
