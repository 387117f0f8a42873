//! Play/stop/record state machine around the scheduler.

use beat_shared::generator::GenerateError;
use beat_shared::{
    InstrumentType, Kit, PatternData, PatternError, PatternStore, Preset, SynthWaveform, Track,
};
use chrono::Local;

use crate::backend::AudioBackend;
use crate::config::{EngineConfig, RecordingConfig};
use crate::export::{EncoderRegistry, RecordingArtifact};
use crate::recorder::Recorder;
use crate::scheduler::LookAheadScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// Snapshot published to the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub is_playing: bool,
    pub is_recording: bool,
    pub bpm: f32,
    pub swing: f32,
    pub current_step: usize,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_recording: false,
            bpm: beat_shared::DEFAULT_BPM,
            swing: 0.0,
            current_step: 0,
        }
    }
}

pub struct Transport<B: AudioBackend> {
    backend: B,
    store: PatternStore,
    scheduler: LookAheadScheduler,
    play_state: PlayState,
    recorder: Option<Recorder>,
    encoders: EncoderRegistry,
    recording: RecordingConfig,
    master_volume: f32,
    reverb: bool,
    waveform: SynthWaveform,
    selected_preset: Option<&'static str>,
}

impl<B: AudioBackend> Transport<B> {
    pub fn new(backend: B, store: PatternStore, config: &EngineConfig) -> Self {
        Self {
            backend,
            store,
            scheduler: LookAheadScheduler::new(config.scheduler_config()),
            play_state: PlayState::Stopped,
            recorder: None,
            encoders: EncoderRegistry::with_defaults(config.recording.bit_depth),
            recording: config.recording.clone(),
            master_volume: config.audio.master_volume.clamp(0.0, 1.0),
            reverb: false,
            waveform: SynthWaveform::default(),
            selected_preset: None,
        }
    }

    /// Replace the encoder set used when a recording is finalized.
    pub fn with_encoders(mut self, encoders: EncoderRegistry) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn state(&self) -> TransportState {
        TransportState {
            is_playing: self.is_playing(),
            is_recording: self.is_recording(),
            bpm: self.scheduler.bpm(),
            swing: self.scheduler.swing(),
            current_step: self.scheduler.current_step(),
        }
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub fn scheduler(&self) -> &LookAheadScheduler {
        &self.scheduler
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn selected_preset(&self) -> Option<&'static str> {
        self.selected_preset
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn reverb(&self) -> bool {
        self.reverb
    }

    pub fn waveform(&self) -> SynthWaveform {
        self.waveform
    }

    /// Start playback. Returns whether the transport is now playing; a device
    /// that cannot be acquired leaves it stopped.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return true;
        }
        if let Err(e) = self.backend.resume() {
            log::debug!("[Transport] Audio unavailable, staying stopped: {}", e);
            return false;
        }
        self.backend.set_master_volume(self.master_volume);
        self.backend.set_reverb(self.reverb);
        self.backend.set_waveform(self.waveform);

        self.scheduler.start(self.backend.now());
        self.play_state = PlayState::Playing;
        log::info!(
            "[Transport] Playing at {} BPM from step {}",
            self.scheduler.bpm(),
            self.scheduler.current_step()
        );
        self.tick();
        true
    }

    /// Stop playback, keeping the cursor. A running recording is finalized
    /// first and its artifact returned.
    pub fn stop(&mut self) -> Option<RecordingArtifact> {
        let artifact = self.stop_recording();
        if self.is_playing() {
            self.scheduler.stop();
            self.play_state = PlayState::Stopped;
            log::info!("[Transport] Stopped at step {}", self.scheduler.current_step());
        }
        artifact
    }

    /// One timer period: schedule due steps and collect tapped audio.
    pub fn tick(&mut self) -> usize {
        let mut scheduled = 0;
        if self.is_playing() {
            let now = self.backend.now();
            scheduled = self.scheduler.tick(now, &self.store, &mut self.backend);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.drain();
        }
        scheduled
    }

    /// Start recording when idle, finish it when running.
    pub fn toggle_recording(&mut self) -> Option<RecordingArtifact> {
        if self.is_recording() {
            self.stop_recording()
        } else {
            self.start_recording();
            None
        }
    }

    /// Plays first when stopped. Returns whether a recording is running.
    pub fn start_recording(&mut self) -> bool {
        if self.is_recording() {
            return true;
        }
        if !self.play() {
            return false;
        }
        match self.backend.open_tap() {
            Some(tap) => {
                self.recorder = Some(Recorder::new(tap));
                log::info!("[Transport] Recording");
                true
            }
            None => {
                log::warn!("[Transport] Master output tap unavailable, not recording");
                false
            }
        }
    }

    /// Close the tap and encode what was captured. `None` when no recording
    /// was running, nothing was captured or encoding failed.
    pub fn stop_recording(&mut self) -> Option<RecordingArtifact> {
        let recorder = self.recorder.take()?;
        self.backend.close_tap();
        let (samples, sample_rate) = recorder.finish()?;

        let Some(encoder) = self.encoders.negotiate(&self.recording.preferred_formats) else {
            log::error!("[Recorder] No encoder registered");
            return None;
        };
        match RecordingArtifact::encode(encoder, &samples, sample_rate, Local::now()) {
            Ok(artifact) => {
                log::info!(
                    "[Recorder] {} ({}, {} bytes)",
                    artifact.file_name,
                    artifact.mime_type,
                    artifact.bytes.len()
                );
                Some(artifact)
            }
            Err(e) => {
                log::error!("[Recorder] Encoding failed: {}", e);
                None
            }
        }
    }

    pub fn set_bpm(&mut self, bpm: f32) -> f32 {
        self.scheduler.set_bpm(bpm)
    }

    pub fn set_swing(&mut self, swing: f32) -> f32 {
        self.scheduler.set_swing(swing)
    }

    pub fn set_kit(&mut self, kit: Kit) {
        self.store.set_kit(kit);
    }

    pub fn set_master_volume(&mut self, volume: f32) -> f32 {
        self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.backend.set_master_volume(self.master_volume);
        self.master_volume
    }

    pub fn set_reverb(&mut self, enabled: bool) {
        self.reverb = enabled;
        self.backend.set_reverb(enabled);
    }

    pub fn set_waveform(&mut self, waveform: SynthWaveform) {
        self.waveform = waveform;
        self.backend.set_waveform(waveform);
    }

    pub fn toggle_step(&mut self, track_id: &str, index: usize) -> Result<bool, PatternError> {
        self.store.toggle_step(track_id, index)
    }

    pub fn set_track_volume(&mut self, track_id: &str, volume: f32) -> Result<f32, PatternError> {
        self.store.set_track_volume(track_id, volume)
    }

    pub fn toggle_mute(&mut self, track_id: &str) -> Result<bool, PatternError> {
        self.store.toggle_mute(track_id)
    }

    pub fn add_track(&mut self, track: Track) -> Result<(), PatternError> {
        self.store.add_track(track)
    }

    /// Silence every step. The pattern no longer matches any preset.
    pub fn clear_pattern(&mut self) {
        self.store.clear_pattern();
        self.selected_preset = None;
    }

    /// Steps, kit and tempo in one go, between two ticks.
    pub fn load_preset(&mut self, preset: &'static Preset) -> Vec<InstrumentType> {
        let malformed = self.store.load_preset(preset);
        self.scheduler.set_bpm(preset.bpm);
        self.selected_preset = Some(preset.id);
        log::info!("[Transport] Loaded preset {} ({} BPM, {} kit)", preset.id, preset.bpm, preset.kit.name());
        malformed
    }

    /// Look a preset up by id. Unknown ids change nothing.
    pub fn load_preset_by_id(&mut self, id: &str) -> bool {
        match beat_shared::preset::find(id) {
            Some(preset) => {
                self.load_preset(preset);
                true
            }
            None => {
                log::warn!("[Transport] Unknown preset {}", id);
                false
            }
        }
    }

    pub fn apply_pattern_data(&mut self, data: &PatternData) -> Vec<InstrumentType> {
        self.selected_preset = None;
        self.store.apply_pattern_data(data)
    }

    /// Apply a generator result. Failures leave the pattern untouched.
    pub fn apply_generated(&mut self, result: Result<PatternData, GenerateError>) -> Result<(), GenerateError> {
        match result {
            Ok(data) => {
                self.apply_pattern_data(&data);
                log::info!("[Transport] Applied generated pattern");
                Ok(())
            }
            Err(e) => {
                log::warn!("[Transport] Pattern generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Stop and release the audio device.
    pub fn shutdown(&mut self) -> Option<RecordingArtifact> {
        let artifact = self.stop();
        self.backend.teardown();
        log::info!("[Transport] Shut down");
        artifact
    }
}
