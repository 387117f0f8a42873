use serde::{Deserialize, Serialize};

/// The four lanes every pattern is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Kick,
    Snare,
    Hihat,
    Synth,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 4] = [
        InstrumentType::Kick,
        InstrumentType::Snare,
        InstrumentType::Hihat,
        InstrumentType::Synth,
    ];

    /// Melodic instruments carry a pitch per step.
    pub fn is_melodic(&self) -> bool {
        matches!(self, InstrumentType::Synth)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstrumentType::Kick => "Kick",
            InstrumentType::Snare => "Snare",
            InstrumentType::Hihat => "HiHat",
            InstrumentType::Synth => "Synth",
        }
    }
}

/// Named palette selecting which voicing each instrument uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kit {
    #[serde(rename = "default")]
    Standard,
    Amapiano,
    Afro,
    Trap,
    Lofi,
    Electronic,
    Phonk,
}

impl Default for Kit {
    fn default() -> Self {
        Self::Standard
    }
}

impl Kit {
    /// Display order used by kit pickers.
    pub const ALL: [Kit; 7] = [
        Kit::Standard,
        Kit::Phonk,
        Kit::Amapiano,
        Kit::Afro,
        Kit::Trap,
        Kit::Lofi,
        Kit::Electronic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Kit::Standard => "default",
            Kit::Amapiano => "amapiano",
            Kit::Afro => "afro",
            Kit::Trap => "trap",
            Kit::Lofi => "lofi",
            Kit::Electronic => "electronic",
            Kit::Phonk => "phonk",
        }
    }

    pub fn from_name(name: &str) -> Option<Kit> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Scale used when a melodic step is switched on under this kit.
    pub fn scale(&self) -> Scale {
        match self {
            Kit::Amapiano => Scale::LogDrum,
            Kit::Phonk => Scale::Phonk,
            _ => Scale::Pentatonic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthWaveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Default for SynthWaveform {
    fn default() -> Self {
        Self::Sine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// C major pentatonic, C4 to E5
    Pentatonic,
    /// Deep bass notes for log drums
    LogDrum,
    /// High tension cowbell notes, C5 to C6
    Phonk,
}

impl Scale {
    pub fn frequencies(&self) -> &'static [f32] {
        match self {
            Scale::Pentatonic => &[261.63, 293.66, 329.63, 392.00, 440.00, 523.25, 587.33, 659.25],
            Scale::LogDrum => &[65.41, 73.42, 82.41, 87.31, 98.00, 110.00, 123.47],
            Scale::Phonk => &[523.25, 622.25, 698.46, 783.99, 880.00, 1046.50],
        }
    }

    /// Uniform pick from the scale.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> f32 {
        let notes = self.frequencies();
        notes[rng.usize(..notes.len())]
    }
}
