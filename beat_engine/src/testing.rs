//! In-process stand-in for the audio device.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use beat_shared::SynthWaveform;
use ringbuf::HeapProd;
use ringbuf::traits::Producer;

use crate::backend::{AudioBackend, TapReader};
use crate::clock::{AudioClock, ManualClock};
use crate::render::{Hit, SoundRenderer};

/// Samples pushed into an open tap for every rendered hit.
pub const SAMPLES_PER_HIT: usize = 64;

enum FakeTime {
    Manual(ManualClock),
    Wall(Instant),
}

/// Records hits instead of playing them. A hit writes a short block of
/// nonzero samples into the tap so recordings have content.
pub struct FakeBackend {
    time: FakeTime,
    pub hits: Arc<Mutex<Vec<Hit>>>,
    pub sample_rate: u32,
    pub fail_resume: bool,
    pub resumes: usize,
    pub torn_down: bool,
    pub master_volume: f32,
    pub reverb: bool,
    pub waveform: SynthWaveform,
    tap: Option<HeapProd<f32>>,
}

impl FakeBackend {
    pub fn manual(clock: ManualClock) -> Self {
        Self::with_time(FakeTime::Manual(clock))
    }

    /// Time runs from construction, like a real device.
    pub fn wall_clock() -> Self {
        Self::with_time(FakeTime::Wall(Instant::now()))
    }

    fn with_time(time: FakeTime) -> Self {
        Self {
            time,
            hits: Arc::new(Mutex::new(Vec::new())),
            sample_rate: 8_000,
            fail_resume: false,
            resumes: 0,
            torn_down: false,
            master_volume: 0.8,
            reverb: false,
            waveform: SynthWaveform::default(),
            tap: None,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_resume = true;
        self
    }

    pub fn recorded(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }
}

impl SoundRenderer for FakeBackend {
    fn render(&mut self, hit: &Hit) {
        self.hits.lock().unwrap().push(*hit);
        if let Some(tap) = self.tap.as_mut() {
            tap.push_slice(&[hit.volume.max(0.01); SAMPLES_PER_HIT]);
        }
    }
}

impl AudioBackend for FakeBackend {
    fn resume(&mut self) -> anyhow::Result<()> {
        if self.fail_resume {
            anyhow::bail!("No output device available");
        }
        self.resumes += 1;
        self.torn_down = false;
        Ok(())
    }

    fn now(&self) -> f64 {
        match &self.time {
            FakeTime::Manual(clock) => clock.now(),
            FakeTime::Wall(started) => started.elapsed().as_secs_f64(),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume;
    }

    fn set_reverb(&mut self, enabled: bool) {
        self.reverb = enabled;
    }

    fn set_waveform(&mut self, waveform: SynthWaveform) {
        self.waveform = waveform;
    }

    fn open_tap(&mut self) -> Option<TapReader> {
        let (prod, reader) = TapReader::with_capacity(4.0, self.sample_rate);
        self.tap = Some(prod);
        Some(reader)
    }

    fn close_tap(&mut self) {
        self.tap = None;
    }

    /// Like a real device, the next acquisition counts time from zero.
    fn teardown(&mut self) {
        self.tap = None;
        self.torn_down = true;
        match &mut self.time {
            FakeTime::Manual(clock) => clock.set(0.0),
            FakeTime::Wall(started) => *started = Instant::now(),
        }
    }
}
