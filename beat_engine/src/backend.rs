use beat_shared::SynthWaveform;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::{HeapCons, HeapRb};

use crate::clock::{AudioClock, FrameClock};
use crate::commands::EngineCommand;
use crate::config::AudioConfig;
use crate::engine::SynthEngine;
use crate::render::{Hit, SoundRenderer};

/// Capacity of the command queue into the audio callback.
const COMMAND_QUEUE: usize = 1024;

/// Everything the transport needs from an audio output.
pub trait AudioBackend: SoundRenderer {
    /// Acquire the device on first use, otherwise resume it.
    fn resume(&mut self) -> anyhow::Result<()>;
    /// Audio-clock time in seconds.
    fn now(&self) -> f64;
    fn sample_rate(&self) -> u32;
    fn set_master_volume(&mut self, volume: f32);
    fn set_reverb(&mut self, enabled: bool);
    fn set_waveform(&mut self, waveform: SynthWaveform);
    /// Start copying master output into a fresh ring buffer.
    fn open_tap(&mut self) -> Option<TapReader>;
    fn close_tap(&mut self);
    /// Release the device. A later `resume` acquires it again.
    fn teardown(&mut self);
}

/// Consumer side of the master-output tap.
pub struct TapReader {
    consumer: HeapCons<f32>,
    sample_rate: u32,
}

impl TapReader {
    pub fn new(consumer: HeapCons<f32>, sample_rate: u32) -> Self {
        Self { consumer, sample_rate }
    }

    /// Ring buffer pair sized for `secs` of audio.
    pub fn with_capacity(secs: f32, sample_rate: u32) -> (ringbuf::HeapProd<f32>, Self) {
        let capacity = ((secs.max(0.1) * sample_rate as f32) as usize).max(1024);
        let (prod, cons) = HeapRb::<f32>::new(capacity).split();
        (prod, Self::new(cons, sample_rate))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Move everything currently buffered into `out`. Returns the count.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) -> usize {
        let n = self.consumer.occupied_len();
        if n == 0 {
            return 0;
        }
        let start = out.len();
        out.resize(start + n, 0.0);
        let read = self.consumer.pop_slice(&mut out[start..]);
        out.truncate(start + read);
        read
    }
}

struct LiveStream {
    stream: cpal::Stream,
    command_tx: Sender<EngineCommand>,
    clock: FrameClock,
}

/// `cpal` output device, opened lazily on the first `resume`.
pub struct CpalBackend {
    config: AudioConfig,
    live: Option<LiveStream>,
    master_volume: f32,
    reverb: bool,
    waveform: SynthWaveform,
    dropped_hits: u64,
}

impl CpalBackend {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            master_volume: config.master_volume,
            config,
            live: None,
            reverb: false,
            waveform: SynthWaveform::default(),
            dropped_hits: 0,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.live.is_some()
    }

    fn open(&self) -> anyhow::Result<LiveStream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(anyhow::anyhow!("No output device available"))?;
        let supported = device.default_output_config()?;

        let sample_rate = supported.sample_rate();
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();

        if let cpal::SupportedBufferSize::Range { min, max } = supported.buffer_size() {
            log::debug!("[AudioEngine] Device buffer range: {}-{}", min, max);
        }

        let mut stream_config: cpal::StreamConfig = supported.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(self.config.buffer_size);
        log::info!("[AudioEngine] Using config: {:?}", stream_config);

        let (command_tx, command_rx) = crossbeam_channel::bounded::<EngineCommand>(COMMAND_QUEUE);
        let clock = FrameClock::new(sample_rate);
        let callback_clock = clock.clone();

        let mut engine = SynthEngine::new(sample_rate, &self.config);
        engine.handle(EngineCommand::SetMasterVolume(self.master_volume), 0);
        engine.handle(EngineCommand::SetReverb(self.reverb), 0);
        engine.handle(EngineCommand::SetWaveform(self.waveform), 0);

        let err_fn = |err: cpal::StreamError| {
            let s = err.to_string();
            // Under/overruns are routine; keep the log quiet about them.
            if !s.contains("underrun") && !s.contains("overrun") {
                log::error!("[AudioEngine] Stream error: {}", s);
            }
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let block_start = callback_clock.frames();
                    while let Ok(cmd) = command_rx.try_recv() {
                        engine.handle(cmd, block_start);
                    }

                    let frames = data.len() / channels.max(1);
                    let mono = engine.process(block_start, frames);
                    for (frame, &sample) in data.chunks_mut(channels.max(1)).zip(mono) {
                        frame.fill(sample);
                    }
                    callback_clock.advance(frames as u64);
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow::anyhow!("Unsupported sample format {:?}", other)),
        };

        Ok(LiveStream { stream, command_tx, clock })
    }

    fn send(&mut self, cmd: EngineCommand) {
        let Some(live) = self.live.as_ref() else { return };
        match live.command_tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(EngineCommand::Trigger(_))) => {
                self.dropped_hits += 1;
                if self.dropped_hits.is_power_of_two() {
                    log::warn!("[AudioEngine] Command queue full, {} hits dropped", self.dropped_hits);
                }
            }
            Err(TrySendError::Full(cmd)) => log::warn!("[AudioEngine] Command queue full, dropped {:?}", cmd),
            Err(TrySendError::Disconnected(_)) => log::error!("[AudioEngine] Audio callback is gone"),
        }
    }
}

impl SoundRenderer for CpalBackend {
    fn render(&mut self, hit: &Hit) {
        self.send(EngineCommand::Trigger(*hit));
    }
}

impl AudioBackend for CpalBackend {
    fn resume(&mut self) -> anyhow::Result<()> {
        if self.live.is_none() {
            let live = self.open()?;
            log::info!("[AudioEngine] Output device acquired at {} Hz", live.clock.sample_rate());
            self.live = Some(live);
        }
        if let Some(live) = self.live.as_ref() {
            live.stream.play()?;
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        self.live.as_ref().map_or(0.0, |live| live.clock.now())
    }

    fn sample_rate(&self) -> u32 {
        self.live.as_ref().map_or(0, |live| live.clock.sample_rate())
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        self.send(EngineCommand::SetMasterVolume(self.master_volume));
    }

    fn set_reverb(&mut self, enabled: bool) {
        self.reverb = enabled;
        self.send(EngineCommand::SetReverb(enabled));
    }

    fn set_waveform(&mut self, waveform: SynthWaveform) {
        self.waveform = waveform;
        self.send(EngineCommand::SetWaveform(waveform));
    }

    fn open_tap(&mut self) -> Option<TapReader> {
        let sample_rate = self.live.as_ref()?.clock.sample_rate();
        let (prod, reader) = TapReader::with_capacity(self.config.tap_capacity_secs, sample_rate);
        self.send(EngineCommand::OpenTap(prod));
        Some(reader)
    }

    fn close_tap(&mut self) {
        self.send(EngineCommand::CloseTap);
    }

    fn teardown(&mut self) {
        if let Some(live) = self.live.take() {
            if let Err(e) = live.stream.pause() {
                log::debug!("[AudioEngine] Pause on teardown failed: {}", e);
            }
            log::info!("[AudioEngine] Output device released");
        }
    }
}
