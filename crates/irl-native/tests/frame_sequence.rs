use glam::Vec2;
use image::{Rgb, RgbImage};
use irl_engine::{ColorRange, GameSession, Roster, SessionConfig, SessionEvent, TurnState};
use irl_native::{ImageSequenceSource, PngSequenceSink, SessionRunner, VideoSource};

fn table(ball: Vec2) -> RgbImage {
    let mut img = RgbImage::from_pixel(200, 150, Rgb([60, 60, 60]));
    for (x, y, px) in img.enumerate_pixels_mut() {
        if Vec2::new(x as f32, y as f32).distance(ball) <= 14.0 {
            *px = Rgb([0, 0, 255]);
        }
    }
    img
}

#[test]
fn directory_session_writes_one_frame_per_tick() {
    let frames = tempfile::tempdir().unwrap();
    for i in 0..3 {
        table(Vec2::new(100.0, 75.0))
            .save(frames.path().join(format!("{:03}.png", i)))
            .unwrap();
    }
    let out = tempfile::tempdir().unwrap();

    let source = ImageSequenceSource::open(frames.path()).unwrap();
    let (w, h) = source.dimensions();
    let config = SessionConfig {
        break_ball: "Nobody".to_string(),
        tick_delay_ms: 0,
        seed: Some(5),
        ..SessionConfig::default()
    };
    let mut session = GameSession::new(config, Roster::new([("A", [0, 0, 255])]), w, h);
    session
        .set_range("A", ColorRange::new((110, 130), (150, 255), (150, 255)))
        .unwrap();

    let sink = PngSequenceSink::create(out.path()).unwrap();
    let mut runner = SessionRunner::new(session, source, sink).unwrap();
    runner.schedule_end_turn(2);

    let mut events = Vec::new();
    for _ in 0..5 {
        events.extend(runner.tick().unwrap());
    }
    assert_eq!(runner.sink().written(), 5);
    assert!(out.path().join("frame_000004.png").exists());
    assert!(events.contains(&SessionEvent::StateChanged {
        from: TurnState::Player,
        to: TurnState::Computer,
    }));
    assert!(events.contains(&SessionEvent::CanEndTurn(true)));

    let session = runner.shutdown();
    assert_eq!(session.state(), TurnState::Player);
    assert_eq!(session.physics().body_count(), 4);
}
