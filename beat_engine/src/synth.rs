//! Voicings and the per-voice DSP that plays them.
//!
//! A hit is resolved to a `Voicing` from its (kit, instrument) pair, the
//! voicing expands to a `Recipe` of at most two layers, and a `Voice` plays
//! the recipe sample by sample. Everything here is `Copy` so the audio thread
//! never allocates while starting a voice.

use std::f32::consts::{PI, TAU};

use beat_shared::{InstrumentType, Kit, SynthWaveform};

/// Level every decay ramps towards before the voice is cut.
const DECAY_FLOOR: f32 = 0.01;

/// Synthesis strategy for one (kit, instrument) pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Voicing {
    Kick,
    DeepKick,
    Kick808,
    PhonkKick,
    Snare,
    TrapSnare,
    PhonkSnare,
    Rimshot,
    Shaker { soft: bool },
    HiHat,
    TrapHiHat,
    Synth(SynthWaveform),
    LogDrum,
    PhonkBass,
    Cowbell,
    Kalimba,
    DarkSynth,
}

impl Voicing {
    pub fn select(kit: Kit, instrument: InstrumentType, pitch_hz: f32, waveform: SynthWaveform) -> Self {
        use InstrumentType as I;
        match (instrument, kit) {
            (I::Kick, Kit::Phonk) => Voicing::PhonkKick,
            (I::Kick, Kit::Trap) => Voicing::Kick808,
            (I::Kick, Kit::Amapiano) => Voicing::DeepKick,
            (I::Kick, _) => Voicing::Kick,

            (I::Snare, Kit::Amapiano) => Voicing::Shaker { soft: false },
            (I::Snare, Kit::Afro) => Voicing::Rimshot,
            (I::Snare, Kit::Trap) => Voicing::TrapSnare,
            (I::Snare, Kit::Phonk) => Voicing::PhonkSnare,
            (I::Snare, _) => Voicing::Snare,

            (I::Hihat, Kit::Amapiano | Kit::Afro) => Voicing::Shaker { soft: true },
            (I::Hihat, Kit::Trap | Kit::Phonk) => Voicing::TrapHiHat,
            (I::Hihat, _) => Voicing::HiHat,

            // Phonk splits the melodic lane: low notes are bass, the rest cowbell.
            (I::Synth, Kit::Phonk) if pitch_hz > 0.0 && pitch_hz < 200.0 => Voicing::PhonkBass,
            (I::Synth, Kit::Phonk) => Voicing::Cowbell,
            (I::Synth, Kit::Amapiano) => Voicing::LogDrum,
            (I::Synth, Kit::Afro) => Voicing::Kalimba,
            (I::Synth, Kit::Trap) => Voicing::DarkSynth,
            (I::Synth, _) => Voicing::Synth(waveform),
        }
    }

    /// Kicks and log drums stay out of the reverb.
    pub fn is_dry(&self) -> bool {
        matches!(
            self,
            Voicing::Kick | Voicing::DeepKick | Voicing::Kick808 | Voicing::PhonkKick | Voicing::LogDrum
        )
    }

    pub fn recipe(&self, pitch_hz: f32, volume: f32) -> Recipe {
        let v = volume.clamp(0.0, 1.0);
        let (first, second) = match *self {
            Voicing::Kick => (Layer::tone(SynthWaveform::Sine, 150.0).sweep(0.01, 0.5).env(v, 0.5), None),
            Voicing::DeepKick => (Layer::tone(SynthWaveform::Sine, 100.0).sweep(30.0, 0.3).env(0.9 * v, 0.4), None),
            Voicing::Kick808 => (
                Layer::tone(SynthWaveform::Sine, 150.0).sweep(40.0, 0.1).drive(50.0).env(v, 1.2),
                None,
            ),
            Voicing::PhonkKick => (
                Layer::tone(SynthWaveform::Sine, 180.0).sweep(50.0, 0.08).drive(400.0).env(v, 0.6),
                None,
            ),
            Voicing::Snare => (
                Layer::noise().filter(FilterKind::HighPass, 1000.0).env(0.8 * v, 0.2),
                Some(Layer::tone(SynthWaveform::Triangle, 100.0).env(0.5 * v, 0.1)),
            ),
            Voicing::TrapSnare => (
                Layer::noise().filter(FilterKind::BandPass, 2000.0).env(v, 0.15),
                Some(Layer::tone(SynthWaveform::Triangle, 300.0).sweep(100.0, 0.1).env(0.4 * v, 0.1)),
            ),
            Voicing::PhonkSnare => (
                Layer::noise().filter(FilterKind::HighPass, 1500.0).drive(150.0).env(1.2 * v, 0.12),
                Some(Layer::tone(SynthWaveform::Triangle, 220.0).sweep(100.0, 0.08).env(0.9 * v, 0.08)),
            ),
            Voicing::Rimshot => (
                Layer::tone(SynthWaveform::Triangle, 800.0).env(0.6 * v, 0.08),
                Some(Layer::noise().filter(FilterKind::BandPass, 1500.0).env(0.4 * v, 0.05)),
            ),
            Voicing::Shaker { soft } => {
                let peak = if soft { 0.3 } else { 0.5 };
                (Layer::noise().filter(FilterKind::HighPass, 5000.0).env(peak * v, 0.05), None)
            }
            Voicing::HiHat => (Layer::noise().filter(FilterKind::HighPass, 7000.0).env(0.6 * v, 0.05), None),
            Voicing::TrapHiHat => (Layer::noise().filter(FilterKind::HighPass, 9000.0).env(0.7 * v, 0.03), None),
            Voicing::Synth(wave) => (Layer::tone(wave, pitch_hz).attack(0.05).env(0.4 * v, 0.4), None),
            Voicing::LogDrum => {
                let mut hz = pitch_hz.max(1.0);
                while hz > 150.0 {
                    hz /= 2.0;
                }
                (
                    Layer::tone(SynthWaveform::Sine, hz)
                        .partial(SynthWaveform::Triangle, 2.0, 0.0, 0.2)
                        .attack(0.02)
                        .env(0.8 * v, 0.6),
                    None,
                )
            }
            Voicing::PhonkBass => (
                Layer::tone(SynthWaveform::Sawtooth, pitch_hz)
                    .partial(SynthWaveform::Sawtooth, 1.0, 15.0, 1.0)
                    .filter(FilterKind::LowPass, 800.0)
                    .drive(100.0)
                    .env(0.8 * v, 0.5),
                None,
            ),
            Voicing::Cowbell => (
                Layer::tone(SynthWaveform::Square, pitch_hz)
                    .partial(SynthWaveform::Square, 1.5, 10.0, 1.0)
                    .filter(FilterKind::BandPass, pitch_hz * 2.0)
                    .resonance(2.0)
                    .env(v, 0.2),
                None,
            ),
            Voicing::Kalimba => (Layer::tone(SynthWaveform::Sine, pitch_hz).attack(0.01).env(0.5 * v, 0.3), None),
            Voicing::DarkSynth => (
                Layer::tone(SynthWaveform::Sawtooth, pitch_hz)
                    .filter(FilterKind::LowPass, 800.0)
                    .filter_sweep(200.0, 0.5)
                    .hold(0.1)
                    .env(0.3 * v, 0.5),
                None,
            ),
        };
        Recipe {
            layers: [Some(first), second],
            reverb_send: !self.is_dry(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recipe {
    pub layers: [Option<Layer>; 2],
    pub reverb_send: bool,
}

impl Recipe {
    /// Seconds until every layer has been cut.
    pub fn duration(&self) -> f32 {
        self.layers
            .iter()
            .flatten()
            .map(|l| l.envelope.end)
            .fold(0.0, f32::max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Source {
    Tone {
        wave: SynthWaveform,
        start_hz: f32,
        end_hz: f32,
        sweep_secs: f32,
        partial: Option<Partial>,
    },
    Noise,
}

/// Second oscillator following the main one at a fixed ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Partial {
    pub wave: SynthWaveform,
    pub ratio: f32,
    pub cents: f32,
    pub gain: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub start_hz: f32,
    pub end_hz: f32,
    pub sweep_secs: f32,
    pub q: f32,
}

/// Gain envelope: linear attack to `peak`, flat until `hold`, then an
/// exponential ramp that reaches the decay floor at `end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub peak: f32,
    pub attack: f32,
    pub hold: f32,
    pub end: f32,
}

impl Envelope {
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 || t >= self.end || self.peak <= 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * t / self.attack;
        }
        let decay_start = self.attack.max(self.hold);
        if t < decay_start {
            return self.peak;
        }
        // A quiet hit never swells toward the floor.
        let floor = DECAY_FLOOR.min(self.peak);
        let span = (self.end - decay_start).max(1e-6);
        self.peak * (floor / self.peak).powf((t - decay_start) / span)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layer {
    pub source: Source,
    pub filter: Option<FilterSpec>,
    /// Waveshaper amount, `None` for a clean signal.
    pub drive: Option<f32>,
    pub envelope: Envelope,
}

// Builder helpers keep the voicing table readable.
impl Layer {
    fn tone(wave: SynthWaveform, hz: f32) -> Self {
        Self::with_source(Source::Tone {
            wave,
            start_hz: hz,
            end_hz: hz,
            sweep_secs: 0.0,
            partial: None,
        })
    }

    fn noise() -> Self {
        Self::with_source(Source::Noise)
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            filter: None,
            drive: None,
            envelope: Envelope { peak: 0.0, attack: 0.0, hold: 0.0, end: 0.0 },
        }
    }

    fn sweep(mut self, to_hz: f32, secs: f32) -> Self {
        if let Source::Tone { end_hz, sweep_secs, .. } = &mut self.source {
            *end_hz = to_hz;
            *sweep_secs = secs;
        }
        self
    }

    fn partial(mut self, wave: SynthWaveform, ratio: f32, cents: f32, gain: f32) -> Self {
        if let Source::Tone { partial, .. } = &mut self.source {
            *partial = Some(Partial { wave, ratio, cents, gain });
        }
        self
    }

    fn filter(mut self, kind: FilterKind, hz: f32) -> Self {
        self.filter = Some(FilterSpec { kind, start_hz: hz, end_hz: hz, sweep_secs: 0.0, q: 1.0 });
        self
    }

    fn filter_sweep(mut self, to_hz: f32, secs: f32) -> Self {
        if let Some(f) = &mut self.filter {
            f.end_hz = to_hz;
            f.sweep_secs = secs;
        }
        self
    }

    fn resonance(mut self, q: f32) -> Self {
        if let Some(f) = &mut self.filter {
            f.q = q;
        }
        self
    }

    fn drive(mut self, amount: f32) -> Self {
        self.drive = Some(amount);
        self
    }

    fn attack(mut self, secs: f32) -> Self {
        self.envelope.attack = secs;
        self
    }

    fn hold(mut self, secs: f32) -> Self {
        self.envelope.hold = secs;
        self
    }

    fn env(mut self, peak: f32, end: f32) -> Self {
        self.envelope.peak = peak;
        self.envelope.end = end;
        self
    }
}

/// Exponential glide from `from` to `to` over `secs`, then flat.
fn glide(from: f32, to: f32, secs: f32, t: f32) -> f32 {
    if secs <= 0.0 || from <= 0.0 || to <= 0.0 {
        return if t < secs { from } else { to };
    }
    if t >= secs {
        return to;
    }
    from * (to / from).powf(t / secs)
}

/// Soft-clipping curve, `x` in [-1, 1].
pub fn waveshape(x: f32, k: f32) -> f32 {
    let x = x.clamp(-1.0, 1.0);
    let deg = PI / 180.0;
    (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())
}

fn oscillator(wave: SynthWaveform, phase: f32) -> f32 {
    match wave {
        SynthWaveform::Sine => (phase * TAU).sin(),
        SynthWaveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        SynthWaveform::Sawtooth => 2.0 * phase - 1.0,
        SynthWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

fn advance_phase(phase: &mut f32, hz: f32, sample_rate: f32) {
    *phase += hz / sample_rate;
    *phase -= phase.floor();
}

/// Topology-preserving state variable filter.
#[derive(Clone, Copy, Debug, Default)]
struct Svf {
    ic1: f32,
    ic2: f32,
}

impl Svf {
    fn process(&mut self, kind: FilterKind, x: f32, cutoff: f32, q: f32, sample_rate: f32) -> f32 {
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.49);
        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / q.max(0.05);
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;

        let v3 = x - self.ic2;
        let v1 = a1 * self.ic1 + a2 * v3;
        let v2 = self.ic2 + a2 * self.ic1 + a3 * v3;
        self.ic1 = 2.0 * v1 - self.ic1;
        self.ic2 = 2.0 * v2 - self.ic2;

        match kind {
            FilterKind::LowPass => v2,
            FilterKind::BandPass => v1,
            FilterKind::HighPass => x - k * v1 - v2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LayerState {
    layer: Layer,
    phase: f32,
    partial_phase: f32,
    filter: Svf,
}

impl LayerState {
    fn new(layer: Layer) -> Self {
        Self { layer, phase: 0.0, partial_phase: 0.0, filter: Svf::default() }
    }

    fn next(&mut self, t: f32, sample_rate: f32, rng: &mut fastrand::Rng) -> f32 {
        let gain = self.layer.envelope.gain_at(t);
        if gain == 0.0 && t >= self.layer.envelope.end {
            return 0.0;
        }

        let mut x = match self.layer.source {
            Source::Noise => rng.f32() * 2.0 - 1.0,
            Source::Tone { wave, start_hz, end_hz, sweep_secs, partial } => {
                let hz = glide(start_hz, end_hz, sweep_secs, t);
                let mut s = oscillator(wave, self.phase);
                advance_phase(&mut self.phase, hz, sample_rate);
                if let Some(p) = partial {
                    let p_hz = hz * p.ratio * 2f32.powf(p.cents / 1200.0);
                    s += p.gain * oscillator(p.wave, self.partial_phase);
                    advance_phase(&mut self.partial_phase, p_hz, sample_rate);
                }
                s
            }
        };

        if let Some(f) = self.layer.filter {
            let cutoff = glide(f.start_hz, f.end_hz, f.sweep_secs, t);
            x = self.filter.process(f.kind, x, cutoff, f.q, sample_rate);
        }
        if let Some(k) = self.layer.drive {
            x = waveshape(x, k);
        }
        x * gain
    }
}

/// One sounding (or pending) hit.
#[derive(Clone, Copy, Debug)]
pub struct Voice {
    layers: [Option<LayerState>; 2],
    start_frame: u64,
    length_frames: u64,
    reverb_send: bool,
}

impl Voice {
    pub fn new(recipe: &Recipe, start_frame: u64, sample_rate: f32) -> Self {
        Self {
            layers: recipe.layers.map(|l| l.map(LayerState::new)),
            start_frame,
            length_frames: (recipe.duration() * sample_rate).ceil() as u64,
            reverb_send: recipe.reverb_send,
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn reverb_send(&self) -> bool {
        self.reverb_send
    }

    /// True once the voice has played out at `frame`.
    pub fn finished_at(&self, frame: u64) -> bool {
        frame >= self.start_frame + self.length_frames
    }

    /// Add this voice into `out`, whose first sample is `block_start`.
    /// Returns false when the voice has finished.
    pub fn render_into(
        &mut self,
        out: &mut [f32],
        block_start: u64,
        sample_rate: f32,
        rng: &mut fastrand::Rng,
    ) -> bool {
        let end_frame = self.start_frame + self.length_frames;
        let first = self.start_frame.saturating_sub(block_start) as usize;
        for (i, sample) in out.iter_mut().enumerate().skip(first) {
            let frame = block_start + i as u64;
            if frame >= end_frame {
                break;
            }
            let t = (frame - self.start_frame) as f32 / sample_rate;
            for layer in self.layers.iter_mut().flatten() {
                *sample += layer.next(t, sample_rate, rng);
            }
        }
        !self.finished_at(block_start + out.len() as u64)
    }
}
