use crate::backend::TapReader;

/// Collects master output from the tap while a recording is running.
///
/// Drained from the session thread on every scheduler tick, so the tap only
/// has to hold a few look-ahead periods worth of audio.
pub struct Recorder {
    tap: TapReader,
    chunks: Vec<Vec<f32>>,
}

impl Recorder {
    pub fn new(tap: TapReader) -> Self {
        log::info!("[Recorder] Started");
        Self { tap, chunks: Vec::new() }
    }

    pub fn sample_rate(&self) -> u32 {
        self.tap.sample_rate()
    }

    /// Move whatever the tap holds into a new chunk.
    pub fn drain(&mut self) -> usize {
        let mut chunk = Vec::with_capacity(self.tap.available());
        let n = self.tap.drain_into(&mut chunk);
        if n > 0 {
            self.chunks.push(chunk);
        }
        n
    }

    pub fn captured_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Final drain, then join the chunks. `None` when nothing was captured.
    pub fn finish(mut self) -> Option<(Vec<f32>, u32)> {
        self.drain();
        let sample_rate = self.tap.sample_rate();
        let samples: Vec<f32> = self.chunks.concat();

        let mut max_val = 0.0_f32;
        let mut non_zero = 0;
        for &s in &samples {
            if s.abs() > 0.0001 {
                non_zero += 1;
            }
            max_val = max_val.max(s.abs());
        }
        log::info!(
            "[Recorder] Stopped. Chunks={}, Len={}, MaxVal={:.4}, NonZeroSamples={}",
            self.chunks.len(),
            samples.len(),
            max_val,
            non_zero
        );

        if samples.is_empty() { None } else { Some((samples, sample_rate)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Producer;

    #[test]
    fn test_chunks_are_joined_in_order() {
        let (mut prod, tap) = TapReader::with_capacity(1.0, 8_000);
        let mut recorder = Recorder::new(tap);
        prod.push_slice(&[0.1, 0.2]);
        assert_eq!(recorder.drain(), 2);
        assert_eq!(recorder.drain(), 0);
        prod.push_slice(&[0.3]);
        recorder.drain();
        prod.push_slice(&[0.4, 0.5]);
        assert_eq!(recorder.captured_samples(), 3);

        let (samples, sr) = recorder.finish().unwrap();
        assert_eq!(samples, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(sr, 8_000);
    }

    #[test]
    fn test_nothing_captured_is_none() {
        let (_prod, tap) = TapReader::with_capacity(1.0, 8_000);
        assert!(Recorder::new(tap).finish().is_none());
    }
}
