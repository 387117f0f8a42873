use std::thread;
use std::time::Duration;

use beat_shared::generator::GENERATION_FAILED_MESSAGE;
use beat_shared::{GenerateError, InstrumentType, Kit, PatternData, PatternStore};

use crate::config::EngineConfig;
use crate::session::{SessionCommand, SessionEvent, SessionHandle};
use crate::testing::FakeBackend;

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_session_plays_records_and_stops() {
    let backend = FakeBackend::wall_clock();
    let hits = backend.hits.clone();
    let session = SessionHandle::spawn(
        move || backend,
        PatternStore::with_default_pattern(),
        EngineConfig::default(),
    )
    .expect("Failed to spawn session");

    assert!(session.send(SessionCommand::ToggleRecording));
    assert!(wait_for(|| {
        let state = session.state();
        state.is_playing && state.is_recording
    }));

    // Half a second at 120 BPM covers two kicks.
    thread::sleep(Duration::from_millis(600));
    let kicks: Vec<f64> = hits
        .lock()
        .unwrap()
        .iter()
        .filter(|h| h.instrument == InstrumentType::Kick)
        .map(|h| h.at)
        .collect();
    println!("[Test] Kicks at {:?}", kicks);
    assert!(kicks.len() >= 2);
    assert!((kicks[1] - kicks[0] - 0.5).abs() < 1e-9);

    assert!(session.send(SessionCommand::Stop));
    let event = session
        .events()
        .recv_timeout(Duration::from_secs(2))
        .expect("Did not receive recording in time");
    match event {
        SessionEvent::RecordingReady(artifact) => {
            assert_eq!(artifact.mime_type, "audio/wav");
            assert!(artifact.bytes.len() > 44);
        }
        other => panic!("Unexpected event {:?}", other),
    }

    assert!(wait_for(|| {
        let state = session.state();
        !state.is_playing && !state.is_recording
    }));

    // Stopped: no timer, no more hits.
    let count = hits.lock().unwrap().len();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.lock().unwrap().len(), count);

    assert!(session.shutdown().is_empty());
}

#[test]
fn test_session_commands_reach_the_pattern() {
    let session = SessionHandle::spawn(
        FakeBackend::wall_clock,
        PatternStore::with_default_pattern(),
        EngineConfig::default(),
    )
    .expect("Failed to spawn session");

    session.send(SessionCommand::SetBpm(300.0));
    session.send(SessionCommand::SetSwing(0.25));
    session.send(SessionCommand::ToggleMute("kick".to_string()));
    session.send(SessionCommand::ToggleStep { track_id: "missing".to_string(), index: 0 });
    session.send(SessionCommand::SetKit(Kit::Trap));

    let tracks = session.tracks().unwrap();
    assert!(tracks.iter().find(|t| t.id == "kick").unwrap().muted);
    let state = session.state();
    assert_eq!(state.bpm, 200.0);
    assert_eq!(state.swing, 0.25);
    assert!(!state.is_playing);

    session.send(SessionCommand::LoadPreset("amapiano-deep-log".to_string()));
    session.tracks();
    assert_eq!(session.state().bpm, 112.0);
}

#[test]
fn test_generation_failure_emits_notice() {
    let session = SessionHandle::spawn(
        FakeBackend::wall_clock,
        PatternStore::with_default_pattern(),
        EngineConfig::default(),
    )
    .expect("Failed to spawn session");
    let before = session.tracks().unwrap();

    let failing = |_: &str| -> Result<PatternData, GenerateError> {
        Err(GenerateError::Request("offline".to_string()))
    };
    session.generate_with(failing, "dark trap").join().unwrap();
    let event = session.events().recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event, SessionEvent::Notice(GENERATION_FAILED_MESSAGE.to_string()));
    assert_eq!(session.tracks().unwrap(), before);

    let working = |_: &str| -> Result<PatternData, GenerateError> {
        Ok(PatternData { snare: vec![true; 16], ..PatternData::default() })
    };
    session.generate_with(working, "all snares").join().unwrap();
    let tracks = session.tracks().unwrap();
    assert!(tracks.iter().find(|t| t.id == "snare").unwrap().steps.iter().all(|s| s.active));
}

#[test]
fn test_session_without_device_stays_stopped() {
    let session = SessionHandle::spawn(
        || FakeBackend::wall_clock().failing(),
        PatternStore::with_default_pattern(),
        EngineConfig::default(),
    )
    .expect("Failed to spawn session");
    session.send(SessionCommand::Play);
    session.tracks();
    assert!(!session.state().is_playing);
}
