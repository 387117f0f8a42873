use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic audio time in seconds.
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Clock driven by the number of frames the device callback has rendered.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Called from the audio thread once a block has been rendered.
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }

    /// Frame index at which a time in seconds falls. Negative times map to 0.
    pub fn frame_at(&self, secs: f64) -> u64 {
        secs_to_frame(secs, self.sample_rate)
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

pub fn secs_to_frame(secs: f64, sample_rate: u32) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * sample_rate as f64).round() as u64
    } else {
        0
    }
}

/// Clock that only moves when told to. Shared between clones.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    secs_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    pub fn set(&self, secs: f64) {
        self.secs_bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        self.set(self.now() + secs);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.secs_bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_clock_tracks_rendered_frames() {
        let clock = FrameClock::new(48_000);
        assert_eq!(clock.now(), 0.0);
        clock.advance(24_000);
        assert_relative_eq!(clock.now(), 0.5);
        assert_eq!(clock.frame_at(1.25), 60_000);
        assert_eq!(clock.frame_at(-3.0), 0);
    }

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(1.0);
        let other = clock.clone();
        other.advance(0.025);
        assert_relative_eq!(clock.now(), 1.025);
    }
}
