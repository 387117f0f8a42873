pub mod backend;
pub mod clock;
pub mod commands;
pub mod config;
pub mod delay;
pub mod engine; // SynthEngine lives here
pub mod export;
pub mod mixer;
pub mod recorder;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod synth;
pub mod transport;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests_session;

// Re-exports
pub use backend::{AudioBackend, CpalBackend};
pub use commands::EngineCommand;
pub use config::EngineConfig;
pub use engine::SynthEngine;
pub use export::RecordingArtifact;
pub use render::{Hit, SoundRenderer};
pub use scheduler::{LookAheadScheduler, SchedulerConfig};
pub use session::{SessionCommand, SessionEvent, SessionHandle};
pub use transport::{Transport, TransportState};
