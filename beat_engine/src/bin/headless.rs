use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use beat_engine::{CpalBackend, EngineConfig, SessionCommand, SessionEvent, SessionHandle};
use beat_shared::PatternStore;

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::from_env()?;
    let audio = config.audio.clone();
    let out_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(std::env::temp_dir);

    log::info!("[Headless] Starting session...");
    let session = SessionHandle::spawn(
        move || CpalBackend::new(audio),
        PatternStore::with_default_pattern(),
        config,
    )?;

    log::info!("[Headless] Recording the default pattern for 4 seconds...");
    session.send(SessionCommand::ToggleRecording);
    thread::sleep(Duration::from_secs(4));

    if !session.state().is_playing {
        log::warn!("[Headless] Audio device unavailable, nothing was played");
    }

    session.send(SessionCommand::Stop);
    match session.events().recv_timeout(Duration::from_secs(2)) {
        Ok(SessionEvent::RecordingReady(artifact)) => {
            let path = artifact.save_in(&out_dir)?;
            log::info!("[Headless] Saved {}", path.display());
        }
        Ok(SessionEvent::Notice(text)) => log::warn!("[Headless] {}", text),
        Err(_) => log::warn!("[Headless] No recording produced"),
    }

    session.shutdown();
    log::info!("[Headless] Done.");
    Ok(())
}
