/// Circular delay buffer with a single write head.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_delay_samples.max(1) + 1],
            write_pos: 0,
        }
    }

    /// Sample written `delay` pushes ago, clamped to the buffer length.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Feedback comb with a one-pole lowpass in the loop.
pub struct Comb {
    line: DelayLine,
    delay: usize,
    feedback: f32,
    damping: f32,
    store: f32,
}

impl Comb {
    pub fn new(delay: usize, feedback: f32, damping: f32) -> Self {
        Self {
            line: DelayLine::new(delay),
            delay,
            feedback,
            damping,
            store: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.line.read(self.delay);
        self.store = out * (1.0 - self.damping) + self.store * self.damping;
        self.line.write(input + self.store * self.feedback);
        out
    }
}

/// Schroeder allpass diffuser.
pub struct Allpass {
    line: DelayLine,
    delay: usize,
    gain: f32,
}

impl Allpass {
    pub fn new(delay: usize, gain: f32) -> Self {
        Self { line: DelayLine::new(delay), delay, gain }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read(self.delay);
        let w = input + delayed * self.gain;
        self.line.write(w);
        delayed - w * self.gain
    }
}
