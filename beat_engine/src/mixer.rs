use crate::delay::{Allpass, Comb};

/// One-pole parameter smoother.
///
/// `current += coeff * (target - current)` per sample, with
/// `coeff = 1 - exp(-1 / (time_constant * sample_rate))`.
#[derive(Debug, Clone)]
pub struct Smoothed {
    current: f32,
    target: f32,
    coeff: f32,
}

impl Smoothed {
    pub fn new(initial: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let samples = (time_constant_ms / 1000.0 * sample_rate).max(1.0);
        Self {
            current: initial,
            target: initial,
            coeff: 1.0 - (-1.0 / samples).exp(),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        if (self.current - self.target).abs() < 1e-6 {
            self.current = self.target;
        }
        self.current
    }
}

// Freeverb tunings at 44.1 kHz, rescaled to the device rate.
const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNING: [usize; 2] = [556, 441];

/// Small mono Schroeder reverb, about a second and a half of tail.
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let scaled = |n: usize| ((n as f32 * scale) as usize).max(1);
        Self {
            combs: COMB_TUNING.iter().map(|&n| Comb::new(scaled(n), 0.8, 0.3)).collect(),
            allpasses: ALLPASS_TUNING.iter().map(|&n| Allpass::new(scaled(n), 0.5)).collect(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input);
        }
        out *= 1.0 / self.combs.len() as f32;
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }
}

/// Master volume and reverb return, both smoothed.
pub struct MasterBus {
    volume: Smoothed,
    wet: Smoothed,
    wet_level: f32,
    reverb: Reverb,
}

impl MasterBus {
    pub fn new(sample_rate: f32, settings: &crate::config::AudioConfig) -> Self {
        Self {
            volume: Smoothed::new(settings.master_volume.clamp(0.0, 1.0), settings.volume_ramp_ms, sample_rate),
            wet: Smoothed::new(0.0, settings.reverb_ramp_ms, sample_rate),
            wet_level: settings.reverb_wet,
            reverb: Reverb::new(sample_rate),
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume.set_target(volume.clamp(0.0, 1.0));
    }

    pub fn set_reverb(&mut self, enabled: bool) {
        self.wet.set_target(if enabled { self.wet_level } else { 0.0 });
    }

    pub fn volume(&self) -> f32 {
        self.volume.current()
    }

    pub fn wet(&self) -> f32 {
        self.wet.current()
    }

    /// `out = volume * (dry + wet * reverb(send))`.
    pub fn mix(&mut self, dry: &[f32], send: &[f32], out: &mut [f32]) {
        for ((o, &d), &s) in out.iter_mut().zip(dry).zip(send) {
            let tail = self.reverb.process(s);
            let wet = self.wet.next_value();
            let gain = self.volume.next_value();
            *o = gain * (d + wet * tail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use approx::assert_relative_eq;

    const SR: f32 = 48_000.0;

    #[test]
    fn test_smoothed_reaches_target_after_time_constant() {
        let mut s = Smoothed::new(0.0, 20.0, SR);
        s.set_target(1.0);
        // 20 ms at 48 kHz is 960 samples, one time constant gets ~63%.
        for _ in 0..960 {
            s.next_value();
        }
        assert_relative_eq!(s.current(), 1.0 - (-1.0f32).exp(), epsilon = 0.01);
        for _ in 0..960 * 20 {
            s.next_value();
        }
        assert_eq!(s.current(), 1.0);
    }

    #[test]
    fn test_master_gain_ramps_instead_of_jumping() {
        let config = AudioConfig::default();
        let mut bus = MasterBus::new(SR, &config);
        let dry = vec![1.0; 64];
        let send = vec![0.0; 64];
        let mut out = vec![0.0; 64];

        bus.mix(&dry, &send, &mut out);
        assert_relative_eq!(out[63], config.master_volume, epsilon = 1e-6);

        bus.set_volume(0.0);
        bus.mix(&dry, &send, &mut out);
        assert!(out[0] < config.master_volume && out[0] > 0.7);
        assert!(out.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_reverb_is_silent_until_enabled() {
        let mut bus = MasterBus::new(SR, &AudioConfig::default());
        let dry = vec![0.0; 4800];
        let mut send = vec![0.0; 4800];
        send[0] = 1.0;
        let mut out = vec![0.0; 4800];
        bus.mix(&dry, &send, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        bus.set_reverb(true);
        let silence = vec![0.0; 4800];
        bus.mix(&dry, &silence, &mut out);
        assert!(out.iter().any(|&s| s.abs() > 0.0), "tail should be audible once wet");
        assert!(bus.wet() > 0.0 && bus.wet() <= 0.3);
    }
}
