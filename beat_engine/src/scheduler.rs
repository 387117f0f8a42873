//! Look-ahead step scheduler.
//!
//! A coarse host timer calls `tick` every `lookahead`; each tick renders every
//! step whose start falls before `now + schedule_ahead`, stamping each hit with
//! its exact audio-clock time. Timer jitter therefore never reaches the audio.

use std::time::Duration;

use beat_shared::{DEFAULT_BPM, PatternStore, clamp_bpm, clamp_swing};

use crate::render::{SoundRenderer, hits_for_step};

/// Base step length in beats (a sixteenth note).
const BASE_STEP_FRACTION: f64 = 0.25;
/// How far swing shifts a step, in beats, at swing 1.0.
const SWING_SHIFT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Timer period.
    pub lookahead: Duration,
    /// Seconds past `now` that each tick fills.
    pub schedule_ahead: f64,
    /// Delay before the first step after a (re)start.
    pub start_offset: f64,
    pub min_step_fraction: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_millis(25),
            schedule_ahead: 0.1,
            start_offset: 0.05,
            min_step_fraction: 0.05,
        }
    }
}

pub struct LookAheadScheduler {
    config: SchedulerConfig,
    running: bool,
    next_event_time: f64,
    current_step: usize,
    bpm: f32,
    swing: f32,
}

impl LookAheadScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            running: false,
            next_event_time: 0.0,
            current_step: 0,
            bpm: DEFAULT_BPM,
            swing: 0.0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Next step to be scheduled.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    /// Takes effect from the next step scheduled.
    pub fn set_bpm(&mut self, bpm: f32) -> f32 {
        self.bpm = clamp_bpm(bpm);
        self.bpm
    }

    pub fn set_swing(&mut self, swing: f32) -> f32 {
        self.swing = clamp_swing(swing);
        self.swing
    }

    /// Seconds from the start of `step` to the start of the next one.
    pub fn step_duration(&self, step: usize) -> f64 {
        let shift = self.swing as f64 * SWING_SHIFT;
        let fraction = if step % 2 == 0 {
            BASE_STEP_FRACTION + shift
        } else {
            BASE_STEP_FRACTION - shift
        };
        60.0 / self.bpm as f64 * fraction.max(self.config.min_step_fraction)
    }

    /// Length of one pass over the grid at the current tempo.
    pub fn cycle_duration(&self, grid_length: usize) -> f64 {
        (0..grid_length.max(1)).map(|s| self.step_duration(s)).sum()
    }

    /// Begin scheduling. A stale timestamp restarts from step 0 shortly after
    /// `now`; a fresh one (stop and play inside the look-ahead window)
    /// continues where the cursor left off. A timestamp further ahead than
    /// any tick could have reached belongs to an earlier clock (the device was
    /// released and acquired again) and restarts too.
    pub fn start(&mut self, now: f64) {
        let stale = self.next_event_time <= now;
        let longest_step = self.step_duration(0).max(self.step_duration(1));
        let reach = self.config.schedule_ahead + self.config.start_offset + longest_step;
        let from_earlier_clock = self.next_event_time > now + reach;
        if stale || from_earlier_clock {
            self.next_event_time = now + self.config.start_offset;
            self.current_step = 0;
        }
        self.running = true;
        log::debug!(
            "[Scheduler] Started at {:.3}s, first step {} at {:.3}s",
            now,
            self.current_step,
            self.next_event_time
        );
    }

    /// Stop scheduling. The cursor and timestamp are kept.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Render every step due before `now + schedule_ahead`. Returns the number
    /// of steps scheduled.
    pub fn tick(&mut self, now: f64, store: &PatternStore, renderer: &mut dyn SoundRenderer) -> usize {
        if !self.running {
            return 0;
        }
        let grid_length = store.grid_length().max(1);
        self.current_step %= grid_length;

        let behind = now - self.next_event_time;
        if behind > self.cycle_duration(grid_length) {
            log::warn!(
                "[Scheduler] {:.3}s behind the audio clock, resyncing at step {}",
                behind,
                self.current_step
            );
            self.next_event_time = now + self.config.start_offset;
        }

        let horizon = now + self.config.schedule_ahead;
        let max_steps = grid_length * 2;
        let mut scheduled = 0;
        while self.next_event_time < horizon {
            if scheduled >= max_steps {
                log::warn!("[Scheduler] Scheduled {} steps in one tick, resyncing", scheduled);
                self.next_event_time = self.next_event_time.max(now + self.config.start_offset);
                break;
            }
            for hit in hits_for_step(store, self.current_step, self.next_event_time) {
                renderer.render(&hit);
            }
            let duration = self.step_duration(self.current_step);
            self.current_step = (self.current_step + 1) % grid_length;
            self.next_event_time += duration;
            scheduled += 1;
        }

        if scheduled > 0 {
            log::debug!(
                "[Scheduler] Tick at {:.3}s scheduled {} steps, next {} at {:.3}s",
                now,
                scheduled,
                self.current_step,
                self.next_event_time
            );
        }
        scheduled
    }
}
