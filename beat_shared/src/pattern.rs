use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kit::{InstrumentType, Kit};
use crate::preset::Preset;
use crate::DEFAULT_GRID_LENGTH;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("no track with id '{0}'")]
    UnknownTrack(String),
    #[error("step {index} is outside a grid of {grid_length} steps")]
    StepOutOfRange { index: usize, grid_length: usize },
    #[error("a track with id '{0}' already exists")]
    DuplicateTrack(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub active: bool,
    /// Frequency in Hz, only meaningful for melodic tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
}

impl Step {
    pub fn on() -> Self {
        Self { active: true, pitch: None }
    }

    pub fn with_pitch(pitch: f32) -> Self {
        Self { active: true, pitch: Some(pitch) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub instrument: InstrumentType,
    pub steps: Vec<Step>,
    pub muted: bool,
    pub volume: f32,
}

impl Track {
    pub fn new(id: impl Into<String>, instrument: InstrumentType, grid_length: usize) -> Self {
        Self {
            id: id.into(),
            name: instrument.name().to_string(),
            instrument,
            steps: vec![Step::default(); grid_length],
            muted: false,
            volume: 1.0,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Step at `index`; steps past the end of a short track read as silent.
    pub fn step(&self, index: usize) -> Step {
        self.steps.get(index).copied().unwrap_or_default()
    }
}

/// Fixed-shape pattern exchanged with presets and the pattern generator.
/// Synth entries are frequencies in Hz, anything not strictly positive is a rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    #[serde(default)]
    pub kick: Vec<bool>,
    #[serde(default)]
    pub snare: Vec<bool>,
    #[serde(default)]
    pub hihat: Vec<bool>,
    #[serde(default)]
    pub synth: Vec<f32>,
}

impl PatternData {
    pub fn lane_len(&self, instrument: InstrumentType) -> usize {
        match instrument {
            InstrumentType::Kick => self.kick.len(),
            InstrumentType::Snare => self.snare.len(),
            InstrumentType::Hihat => self.hihat.len(),
            InstrumentType::Synth => self.synth.len(),
        }
    }

    /// Instruments whose lane length differs from `grid_length`.
    pub fn malformed_lanes(&self, grid_length: usize) -> Vec<InstrumentType> {
        InstrumentType::ALL
            .into_iter()
            .filter(|&i| self.lane_len(i) != grid_length)
            .collect()
    }

    /// Step for one lane position, missing entries are inactive.
    pub fn step(&self, instrument: InstrumentType, index: usize) -> Step {
        let drum = |lane: &[bool]| Step {
            active: lane.get(index).copied().unwrap_or(false),
            pitch: None,
        };
        match instrument {
            InstrumentType::Kick => drum(&self.kick),
            InstrumentType::Snare => drum(&self.snare),
            InstrumentType::Hihat => drum(&self.hihat),
            InstrumentType::Synth => match self.synth.get(index).copied() {
                Some(hz) if hz.is_finite() && hz > 0.0 => Step::with_pitch(hz),
                _ => Step::default(),
            },
        }
    }
}

/// The mutable grid: ordered tracks plus the selected kit.
#[derive(Debug, Clone)]
pub struct PatternStore {
    tracks: Vec<Track>,
    grid_length: usize,
    kit: Kit,
    rng: fastrand::Rng,
}

impl PatternStore {
    /// Empty store with no tracks.
    pub fn new(grid_length: usize) -> Self {
        Self {
            tracks: Vec::new(),
            grid_length: grid_length.max(1),
            kit: Kit::default(),
            rng: fastrand::Rng::new(),
        }
    }

    /// Four-track starter beat: four-on-the-floor kick and eighth-note hats.
    pub fn with_default_pattern() -> Self {
        let len = DEFAULT_GRID_LENGTH;
        let mut kick = Track::new("kick", InstrumentType::Kick, len).with_volume(0.8);
        for i in (0..len).step_by(4) {
            kick.steps[i] = Step::on();
        }
        let snare = Track::new("snare", InstrumentType::Snare, len).with_volume(0.75);
        let mut hihat = Track::new("hihat", InstrumentType::Hihat, len).with_volume(0.6);
        for i in (0..len).step_by(2) {
            hihat.steps[i] = Step::on();
        }
        let synth = Track::new("synth", InstrumentType::Synth, len).with_volume(0.7);

        let mut store = Self::new(len);
        store.tracks = vec![kick, snare, hihat, synth];
        store
    }

    /// Reseed the pitch picker, for reproducible tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn grid_length(&self) -> usize {
        self.grid_length
    }

    pub fn kit(&self) -> Kit {
        self.kit
    }

    pub fn set_kit(&mut self, kit: Kit) {
        self.kit = kit;
    }

    pub fn add_track(&mut self, mut track: Track) -> Result<(), PatternError> {
        if self.track(&track.id).is_some() {
            return Err(PatternError::DuplicateTrack(track.id));
        }
        track.steps.resize(self.grid_length, Step::default());
        self.tracks.push(track);
        Ok(())
    }

    fn track_mut(&mut self, id: &str) -> Result<&mut Track, PatternError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PatternError::UnknownTrack(id.to_string()))
    }

    /// Flip a step. Melodic steps switched on get a random note from the kit's
    /// scale; switched off they lose their pitch. Returns the new state.
    pub fn toggle_step(&mut self, track_id: &str, index: usize) -> Result<bool, PatternError> {
        let grid_length = self.grid_length;
        if index >= grid_length {
            return Err(PatternError::StepOutOfRange { index, grid_length });
        }
        let scale = self.kit.scale();
        let pitch = scale.pick(&mut self.rng);

        let track = self.track_mut(track_id)?;
        if track.steps.len() < grid_length {
            track.steps.resize(grid_length, Step::default());
        }
        let melodic = track.instrument.is_melodic();
        let step = &mut track.steps[index];
        step.active = !step.active;
        step.pitch = if step.active && melodic { Some(pitch) } else { None };
        Ok(step.active)
    }

    /// Returns the volume actually stored after clamping.
    pub fn set_track_volume(&mut self, track_id: &str, volume: f32) -> Result<f32, PatternError> {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.track_mut(track_id)?.volume = volume;
        Ok(volume)
    }

    /// Returns the new mute state.
    pub fn toggle_mute(&mut self, track_id: &str) -> Result<bool, PatternError> {
        let track = self.track_mut(track_id)?;
        track.muted = !track.muted;
        Ok(track.muted)
    }

    pub fn clear_pattern(&mut self) {
        for track in &mut self.tracks {
            for step in &mut track.steps {
                *step = Step::default();
            }
        }
    }

    /// Replace every track's steps from `data`, matching lanes by instrument.
    /// Lanes of the wrong length are applied best-effort and reported back.
    pub fn apply_pattern_data(&mut self, data: &PatternData) -> Vec<InstrumentType> {
        let grid_length = self.grid_length;
        let malformed = data.malformed_lanes(grid_length);
        for instrument in &malformed {
            log::warn!(
                "[Pattern] {} lane has {} steps, expected {}; missing steps left silent",
                instrument.name(),
                data.lane_len(*instrument),
                grid_length
            );
        }

        for track in &mut self.tracks {
            track.steps = (0..grid_length)
                .map(|i| data.step(track.instrument, i))
                .collect();
        }
        malformed
    }

    /// Steps and kit from a preset. Tempo is the transport's business.
    pub fn load_preset(&mut self, preset: &Preset) -> Vec<InstrumentType> {
        self.kit = preset.kit;
        self.apply_pattern_data(&preset.pattern)
    }

    /// Copy of the steps as a `PatternData`, first track per instrument wins.
    pub fn to_pattern_data(&self) -> PatternData {
        let lane = |instrument: InstrumentType| {
            self.tracks.iter().find(|t| t.instrument == instrument)
        };
        let bools = |instrument| -> Vec<bool> {
            lane(instrument)
                .map(|t| (0..self.grid_length).map(|i| t.step(i).active).collect())
                .unwrap_or_default()
        };
        PatternData {
            kick: bools(InstrumentType::Kick),
            snare: bools(InstrumentType::Snare),
            hihat: bools(InstrumentType::Hihat),
            synth: lane(InstrumentType::Synth)
                .map(|t| {
                    (0..self.grid_length)
                        .map(|i| {
                            let step = t.step(i);
                            if step.active { step.pitch.unwrap_or(crate::DEFAULT_PITCH_HZ) } else { 0.0 }
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::with_default_pattern()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::Scale;

    fn active_indices(store: &PatternStore, id: &str) -> Vec<usize> {
        let track = store.track(id).unwrap();
        (0..store.grid_length()).filter(|&i| track.step(i).active).collect()
    }

    #[test]
    fn test_default_pattern() {
        let store = PatternStore::with_default_pattern();
        let ids: Vec<&str> = store.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["kick", "snare", "hihat", "synth"]);
        assert_eq!(active_indices(&store, "kick"), vec![0, 4, 8, 12]);
        assert_eq!(active_indices(&store, "hihat"), vec![0, 2, 4, 6, 8, 10, 12, 14]);
        assert!(active_indices(&store, "snare").is_empty());
    }

    #[test]
    fn test_toggle_drum_step_has_no_pitch() {
        let mut store = PatternStore::with_default_pattern();
        assert_eq!(store.toggle_step("snare", 4), Ok(true));
        assert_eq!(store.track("snare").unwrap().step(4), Step::on());
        assert_eq!(store.toggle_step("snare", 4), Ok(false));
        assert_eq!(store.track("snare").unwrap().step(4), Step::default());
    }

    #[test]
    fn test_toggle_synth_under_amapiano_picks_log_drum_note() {
        let mut store = PatternStore::with_default_pattern().with_seed(42);
        store.set_kit(Kit::Amapiano);
        for i in 0..store.grid_length() {
            store.toggle_step("synth", i).unwrap();
            let pitch = store.track("synth").unwrap().step(i).pitch.unwrap();
            assert!(Scale::LogDrum.frequencies().contains(&pitch), "{pitch} not in log drum scale");
        }
    }

    #[test]
    fn test_toggle_synth_off_clears_pitch() {
        let mut store = PatternStore::with_default_pattern();
        store.toggle_step("synth", 3).unwrap();
        store.toggle_step("synth", 3).unwrap();
        assert_eq!(store.track("synth").unwrap().step(3).pitch, None);
    }

    #[test]
    fn test_toggle_errors() {
        let mut store = PatternStore::with_default_pattern();
        assert_eq!(
            store.toggle_step("cowbell", 0),
            Err(PatternError::UnknownTrack("cowbell".into()))
        );
        assert_eq!(
            store.toggle_step("kick", 16),
            Err(PatternError::StepOutOfRange { index: 16, grid_length: 16 })
        );
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut store = PatternStore::with_default_pattern();
        assert_eq!(store.set_track_volume("kick", 1.7), Ok(1.0));
        assert_eq!(store.set_track_volume("kick", -0.2), Ok(0.0));
        assert_eq!(store.set_track_volume("kick", 0.35), Ok(0.35));
        assert_eq!(store.track("kick").unwrap().volume, 0.35);
    }

    #[test]
    fn test_mute_keeps_steps() {
        let mut store = PatternStore::with_default_pattern();
        assert_eq!(store.toggle_mute("kick"), Ok(true));
        assert_eq!(active_indices(&store, "kick"), vec![0, 4, 8, 12]);
        assert_eq!(store.toggle_mute("kick"), Ok(false));
    }

    #[test]
    fn test_clear_is_idempotent_and_keeps_mix() {
        let mut store = PatternStore::with_default_pattern();
        store.toggle_mute("hihat").unwrap();
        store.set_track_volume("kick", 0.3).unwrap();

        store.clear_pattern();
        let once: Vec<Track> = store.tracks().to_vec();
        store.clear_pattern();
        assert_eq!(store.tracks(), once.as_slice());

        assert!(store.tracks().iter().all(|t| t.steps.iter().all(|s| !s.active)));
        assert!(store.track("hihat").unwrap().muted);
        assert_eq!(store.track("kick").unwrap().volume, 0.3);
    }

    #[test]
    fn test_apply_pattern_data_short_lane_is_best_effort() {
        let mut store = PatternStore::with_default_pattern();
        let data = PatternData {
            kick: vec![true, false, true],
            snare: vec![false; 16],
            hihat: vec![true; 20],
            synth: vec![0.0, 110.0, -3.0, f32::NAN],
        };
        let malformed = store.apply_pattern_data(&data);
        assert_eq!(
            malformed,
            vec![InstrumentType::Kick, InstrumentType::Hihat, InstrumentType::Synth]
        );
        assert_eq!(active_indices(&store, "kick"), vec![0, 2]);
        assert_eq!(active_indices(&store, "hihat").len(), 16);
        let synth = store.track("synth").unwrap();
        assert_eq!(synth.step(1), Step::with_pitch(110.0));
        assert!(!synth.step(2).active);
        assert!(!synth.step(3).active);
        assert_eq!(synth.steps.len(), 16);
    }

    #[test]
    fn test_add_track_rejects_duplicate_id() {
        let mut store = PatternStore::with_default_pattern();
        let dup = Track::new("kick", InstrumentType::Kick, 16);
        assert_eq!(store.add_track(dup), Err(PatternError::DuplicateTrack("kick".into())));

        let extra = Track::new("perc", InstrumentType::Hihat, 4);
        store.add_track(extra).unwrap();
        assert_eq!(store.track("perc").unwrap().steps.len(), 16);
        assert_eq!(store.tracks().last().unwrap().id, "perc");
    }

    #[test]
    fn test_load_preset_sets_kit_and_pitches() {
        let mut store = PatternStore::with_default_pattern();
        let preset = crate::preset::find("amapiano-deep-log").unwrap();
        assert!(store.load_preset(preset).is_empty());
        assert_eq!(store.kit(), Kit::Amapiano);
        assert_eq!(active_indices(&store, "kick"), vec![0, 4, 7, 10, 12]);
        assert_eq!(store.track("synth").unwrap().step(1).pitch, Some(80.0));
    }

    #[test]
    fn test_to_pattern_data_round_trips_default() {
        let store = PatternStore::with_default_pattern();
        let data = store.to_pattern_data();
        assert_eq!(data.kick.len(), 16);
        assert!(data.malformed_lanes(16).is_empty());
        let mut other = PatternStore::with_default_pattern();
        other.clear_pattern();
        other.apply_pattern_data(&data);
        assert_eq!(other.tracks(), store.tracks());
    }
}
