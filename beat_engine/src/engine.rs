use beat_shared::SynthWaveform;
use ringbuf::HeapProd;
use ringbuf::traits::Producer;

use crate::clock::secs_to_frame;
use crate::commands::EngineCommand;
use crate::config::AudioConfig;
use crate::mixer::MasterBus;
use crate::render::Hit;
use crate::synth::{Voice, Voicing};

/// Audio-thread state: the voice pool, master bus and recording tap.
///
/// Lives inside the device callback. Everything it needs is allocated up
/// front; blocks larger than the configured buffer size grow the scratch
/// buffers once.
pub struct SynthEngine {
    sample_rate: f32,
    voices: Vec<Option<Voice>>,
    waveform: SynthWaveform,
    bus: MasterBus,
    noise: fastrand::Rng,
    voice_buf: Vec<f32>,
    dry: Vec<f32>,
    send: Vec<f32>,
    master: Vec<f32>,
    tap: Option<HeapProd<f32>>,
}

impl SynthEngine {
    pub fn new(sample_rate: u32, config: &AudioConfig) -> Self {
        let sr = sample_rate.max(1) as f32;
        let block = config.buffer_size.max(64) as usize;
        Self {
            sample_rate: sr,
            voices: vec![None; config.max_voices.max(1)],
            waveform: SynthWaveform::default(),
            bus: MasterBus::new(sr, config),
            noise: fastrand::Rng::new(),
            voice_buf: vec![0.0; block],
            dry: vec![0.0; block],
            send: vec![0.0; block],
            master: vec![0.0; block],
            tap: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn handle(&mut self, cmd: EngineCommand, block_start: u64) {
        match cmd {
            EngineCommand::Trigger(hit) => self.trigger(&hit, block_start),
            EngineCommand::SetMasterVolume(v) => self.bus.set_volume(v),
            EngineCommand::SetReverb(on) => self.bus.set_reverb(on),
            EngineCommand::SetWaveform(w) => self.waveform = w,
            EngineCommand::OpenTap(prod) => self.tap = Some(prod),
            EngineCommand::CloseTap => self.tap = None,
        }
    }

    /// Start a voice for `hit`. Hits already in the past start at `block_start`.
    pub fn trigger(&mut self, hit: &Hit, block_start: u64) {
        let voicing = Voicing::select(hit.kit, hit.instrument, hit.pitch_hz, self.waveform);
        let recipe = voicing.recipe(hit.pitch_hz, hit.volume);
        let start = secs_to_frame(hit.at, self.sample_rate as u32).max(block_start);
        let voice = Voice::new(&recipe, start, self.sample_rate);

        let slot = match self.voices.iter().position(Option::is_none) {
            Some(free) => free,
            // Pool full: steal the oldest voice.
            None => self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.as_ref().map_or(0, Voice::start_frame))
                .map_or(0, |(i, _)| i),
        };
        self.voices[slot] = Some(voice);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().flatten().count()
    }

    pub fn waveform(&self) -> SynthWaveform {
        self.waveform
    }

    pub fn bus(&self) -> &MasterBus {
        &self.bus
    }

    /// Render `frames` mono samples of master output starting at `block_start`.
    pub fn process(&mut self, block_start: u64, frames: usize) -> &[f32] {
        if self.master.len() < frames {
            for buf in [&mut self.voice_buf, &mut self.dry, &mut self.send, &mut self.master] {
                buf.resize(frames, 0.0);
            }
        }
        self.dry[..frames].fill(0.0);
        self.send[..frames].fill(0.0);

        for slot in self.voices.iter_mut() {
            let Some(voice) = slot.as_mut() else { continue };
            let buf = &mut self.voice_buf[..frames];
            buf.fill(0.0);
            let alive = voice.render_into(buf, block_start, self.sample_rate, &mut self.noise);
            for (d, &s) in self.dry[..frames].iter_mut().zip(buf.iter()) {
                *d += s;
            }
            if voice.reverb_send() {
                for (w, &s) in self.send[..frames].iter_mut().zip(buf.iter()) {
                    *w += s;
                }
            }
            if !alive {
                *slot = None;
            }
        }

        self.bus
            .mix(&self.dry[..frames], &self.send[..frames], &mut self.master[..frames]);

        if let Some(tap) = self.tap.as_mut() {
            // Overflow drops samples rather than blocking the callback.
            tap.push_slice(&self.master[..frames]);
        }
        &self.master[..frames]
    }
}
