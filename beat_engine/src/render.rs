use beat_shared::{DEFAULT_PITCH_HZ, InstrumentType, Kit, PatternStore};

/// One instrument hit at an absolute audio-clock time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub kit: Kit,
    pub instrument: InstrumentType,
    /// Seconds on the audio clock.
    pub at: f64,
    pub pitch_hz: f32,
    pub volume: f32,
}

/// Fire-and-forget sink for hits. Must not block: a hit in the past sounds
/// immediately, a future one at its exact frame.
pub trait SoundRenderer {
    fn render(&mut self, hit: &Hit);
}

/// Hits for one step, tracks in display order. Muted tracks and inactive or
/// missing steps produce nothing.
pub fn hits_for_step(store: &PatternStore, step: usize, at: f64) -> impl Iterator<Item = Hit> + '_ {
    let kit = store.kit();
    store
        .tracks()
        .iter()
        .filter(|track| !track.muted)
        .filter_map(move |track| {
            let s = track.step(step);
            s.active.then(|| Hit {
                kit,
                instrument: track.instrument,
                at,
                pitch_hz: s.pitch.unwrap_or(DEFAULT_PITCH_HZ),
                volume: track.volume,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_muted_and_inactive_tracks_are_skipped() {
        let mut store = PatternStore::with_default_pattern();
        store.toggle_mute("hihat").unwrap();
        let hits: Vec<Hit> = hits_for_step(&store, 0, 1.5).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].instrument, InstrumentType::Kick);
        assert_eq!(hits[0].at, 1.5);
        assert_eq!(hits[0].volume, 0.8);

        assert_eq!(hits_for_step(&store, 1, 1.5).count(), 0);
    }

    #[test]
    fn test_synth_without_pitch_uses_default() {
        let mut store = PatternStore::with_default_pattern();
        store.clear_pattern();
        store.apply_pattern_data(&beat_shared::PatternData {
            synth: vec![196.0],
            ..Default::default()
        });
        let hit = hits_for_step(&store, 0, 0.0).next().unwrap();
        assert_eq!(hit.pitch_hz, 196.0);

        let mut drums = PatternStore::with_default_pattern();
        let kick = hits_for_step(&drums, 0, 0.0).next().unwrap();
        assert_eq!(kick.pitch_hz, DEFAULT_PITCH_HZ);
        drums.set_kit(Kit::Trap);
        assert_eq!(hits_for_step(&drums, 0, 0.0).next().unwrap().kit, Kit::Trap);
    }

    #[test]
    fn test_step_past_short_track_is_silent() {
        let store = PatternStore::with_default_pattern();
        assert_eq!(hits_for_step(&store, 99, 0.0).count(), 0);
    }
}
