//! The session thread: one loop that owns the transport and runs every UI
//! command and timer tick to completion, one at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use beat_shared::generator::{self, GenerateError, PatternGenerator};
use beat_shared::{Kit, PatternData, PatternStore, SynthWaveform, Track};
use crossbeam_channel::{Receiver, Sender, never, select, tick, unbounded};

use crate::backend::AudioBackend;
use crate::config::EngineConfig;
use crate::export::RecordingArtifact;
use crate::transport::{Transport, TransportState};

pub enum SessionCommand {
    Play,
    Stop,
    ToggleRecording,
    SetBpm(f32),
    SetSwing(f32),
    SetKit(Kit),
    SetMasterVolume(f32),
    SetReverb(bool),
    SetWaveform(SynthWaveform),
    ToggleStep { track_id: String, index: usize },
    SetTrackVolume { track_id: String, volume: f32 },
    ToggleMute(String),
    AddTrack(Track),
    ClearPattern,
    LoadPreset(String),
    ApplyPattern(PatternData),
    ApplyGenerated(Result<PatternData, GenerateError>),
    GetTracks(Sender<Vec<Track>>),
    Shutdown,
}

/// Things the session reports back to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RecordingReady(RecordingArtifact),
    Notice(String),
}

/// Transport snapshot, written by the session thread after every command
/// and tick.
#[derive(Debug, Default)]
struct PublishedState {
    is_playing: AtomicBool,
    is_recording: AtomicBool,
    bpm: AtomicU32,
    swing: AtomicU32,
    current_step: AtomicUsize,
}

impl PublishedState {
    fn store(&self, state: &TransportState) {
        self.is_playing.store(state.is_playing, Ordering::Relaxed);
        self.is_recording.store(state.is_recording, Ordering::Relaxed);
        self.bpm.store(state.bpm.to_bits(), Ordering::Relaxed);
        self.swing.store(state.swing.to_bits(), Ordering::Relaxed);
        self.current_step.store(state.current_step, Ordering::Relaxed);
    }

    fn load(&self) -> TransportState {
        TransportState {
            is_playing: self.is_playing.load(Ordering::Relaxed),
            is_recording: self.is_recording.load(Ordering::Relaxed),
            bpm: f32::from_bits(self.bpm.load(Ordering::Relaxed)),
            swing: f32::from_bits(self.swing.load(Ordering::Relaxed)),
            current_step: self.current_step.load(Ordering::Relaxed),
        }
    }
}

struct Session<B: AudioBackend> {
    transport: Transport<B>,
    commands: Receiver<SessionCommand>,
    events: Sender<SessionEvent>,
    published: Arc<PublishedState>,
}

impl<B: AudioBackend + 'static> Session<B> {
    /// Start the session thread. The backend is built on that thread, so it
    /// never has to be `Send` itself.
    pub fn spawn<F>(factory: F, store: PatternStore, config: EngineConfig) -> anyhow::Result<SessionHandle>
    where
        F: FnOnce() -> B + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let published = Arc::new(PublishedState::default());
        published.store(&TransportState::default());
        let thread_state = published.clone();

        let thread = thread::Builder::new()
            .name("beat-session".to_string())
            .spawn(move || {
                let transport = Transport::new(factory(), store, &config);
                let session = Session {
                    transport,
                    commands: command_rx,
                    events: event_tx,
                    published: thread_state,
                };
                session.run();
            })?;

        Ok(SessionHandle {
            commands: command_tx,
            events: event_rx,
            published,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        let lookahead = self.transport.scheduler().config().lookahead;
        let mut ticker: Receiver<_> = never();
        let mut ticking = false;
        self.publish();
        log::debug!("[Session] Running, timer period {:?}", lookahead);

        loop {
            select! {
                recv(self.commands) -> msg => match msg {
                    Ok(SessionCommand::Shutdown) | Err(_) => break,
                    Ok(cmd) => self.handle(cmd),
                },
                recv(ticker) -> _ => {
                    self.transport.tick();
                }
            }

            // The timer only exists while playing.
            let playing = self.transport.is_playing();
            if playing != ticking {
                ticker = if playing { tick(lookahead) } else { never() };
                ticking = playing;
            }
            self.publish();
        }

        if let Some(artifact) = self.transport.shutdown() {
            self.emit(SessionEvent::RecordingReady(artifact));
        }
        self.publish();
        log::debug!("[Session] Exited");
    }

    fn handle(&mut self, cmd: SessionCommand) {
        let t = &mut self.transport;
        match cmd {
            SessionCommand::Play => {
                t.play();
            }
            SessionCommand::Stop => {
                if let Some(artifact) = t.stop() {
                    self.emit(SessionEvent::RecordingReady(artifact));
                }
            }
            SessionCommand::ToggleRecording => {
                if let Some(artifact) = t.toggle_recording() {
                    self.emit(SessionEvent::RecordingReady(artifact));
                }
            }
            SessionCommand::SetBpm(bpm) => {
                t.set_bpm(bpm);
            }
            SessionCommand::SetSwing(swing) => {
                t.set_swing(swing);
            }
            SessionCommand::SetKit(kit) => t.set_kit(kit),
            SessionCommand::SetMasterVolume(v) => {
                t.set_master_volume(v);
            }
            SessionCommand::SetReverb(on) => t.set_reverb(on),
            SessionCommand::SetWaveform(w) => t.set_waveform(w),
            SessionCommand::ToggleStep { track_id, index } => {
                if let Err(e) = t.toggle_step(&track_id, index) {
                    log::warn!("[Session] Toggle step ignored: {}", e);
                }
            }
            SessionCommand::SetTrackVolume { track_id, volume } => {
                if let Err(e) = t.set_track_volume(&track_id, volume) {
                    log::warn!("[Session] Volume change ignored: {}", e);
                }
            }
            SessionCommand::ToggleMute(track_id) => {
                if let Err(e) = t.toggle_mute(&track_id) {
                    log::warn!("[Session] Mute ignored: {}", e);
                }
            }
            SessionCommand::AddTrack(track) => {
                if let Err(e) = t.add_track(track) {
                    log::warn!("[Session] Add track ignored: {}", e);
                }
            }
            SessionCommand::ClearPattern => t.clear_pattern(),
            SessionCommand::LoadPreset(id) => {
                t.load_preset_by_id(&id);
            }
            SessionCommand::ApplyPattern(data) => {
                t.apply_pattern_data(&data);
            }
            SessionCommand::ApplyGenerated(result) => {
                if let Err(e) = t.apply_generated(result) {
                    self.emit(SessionEvent::Notice(e.user_message().to_string()));
                }
            }
            SessionCommand::GetTracks(reply) => {
                let _ = reply.send(t.store().tracks().to_vec());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            log::debug!("[Session] No one is listening for events");
        }
    }

    fn publish(&self) {
        self.published.store(&self.transport.state());
    }
}

/// UI-side handle. Dropping it shuts the session down.
pub struct SessionHandle {
    commands: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    published: Arc<PublishedState>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn spawn<B, F>(factory: F, store: PatternStore, config: EngineConfig) -> anyhow::Result<Self>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        Session::spawn(factory, store, config)
    }

    /// Queue a command. `false` once the session has exited.
    pub fn send(&self, cmd: SessionCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    pub fn state(&self) -> TransportState {
        self.published.load()
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Current tracks, fetched from the session thread.
    pub fn tracks(&self) -> Option<Vec<Track>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if !self.send(SessionCommand::GetTracks(tx)) {
            return None;
        }
        rx.recv().ok()
    }

    /// Run `generator` on its own thread and apply the result when it
    /// arrives. The session keeps playing meanwhile.
    pub fn generate_with<G>(&self, generator: G, description: impl Into<String>) -> JoinHandle<()>
    where
        G: PatternGenerator + 'static,
    {
        let commands = self.commands.clone();
        let description = description.into();
        thread::spawn(move || {
            let result = generator::generate(&generator, &description);
            let _ = commands.send(SessionCommand::ApplyGenerated(result));
        })
    }

    /// Stop the session and return the events it left behind, including a
    /// recording finalized on the way out.
    pub fn shutdown(mut self) -> Vec<SessionEvent> {
        self.stop_thread();
        self.events.try_iter().collect()
    }

    fn stop_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.commands.send(SessionCommand::Shutdown);
            if thread.join().is_err() {
                log::error!("[Session] Session thread panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
