use beat_shared::SynthWaveform;
use ringbuf::HeapProd;

use crate::render::Hit;

/// Messages from the session thread to the audio callback.
pub enum EngineCommand {
    Trigger(Hit),
    SetMasterVolume(f32),
    SetReverb(bool),
    SetWaveform(SynthWaveform),
    // Recording tap on the master output
    OpenTap(HeapProd<f32>),
    CloseTap,
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::Trigger(hit) => f.debug_tuple("Trigger").field(hit).finish(),
            EngineCommand::SetMasterVolume(v) => f.debug_tuple("SetMasterVolume").field(v).finish(),
            EngineCommand::SetReverb(on) => f.debug_tuple("SetReverb").field(on).finish(),
            EngineCommand::SetWaveform(w) => f.debug_tuple("SetWaveform").field(w).finish(),
            EngineCommand::OpenTap(_) => f.write_str("OpenTap"),
            EngineCommand::CloseTap => f.write_str("CloseTap"),
        }
    }
}
