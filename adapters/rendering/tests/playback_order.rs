use std::{rc::Rc, time::Duration};

use crop_mission_channel::{MemoryChannel, MissionChannel};
use crop_mission_core::{
    Drone, GeoPoint, MissionState, StreamPoint, StressClassifier, DEFAULT_CHANNEL_KEY,
};
use crop_mission_rendering::{MissionFeed, PlaybackRenderer, DEFAULT_RENDER_TICK};
use crop_mission_simulator::{MissionSimulator, SimulatorConfig, DEFAULT_TICK_INTERVAL};
use crop_mission_system_point_generation::FixedScores;

fn point(timestamp: u64, lat: f64, lng: f64, stress_score: f64) -> StreamPoint {
    StreamPoint::new(timestamp, lat, lng, stress_score, format!("img{timestamp}"))
}

fn sample_stream() -> Vec<StreamPoint> {
    vec![
        point(1_000, 12.3501, 78.9104, 0.82),
        point(2_000, 12.3499, 78.9099, 0.12),
        point(3_000, 12.3502, 78.9101, 0.64),
        point(4_000, 12.3497, 78.9097, 0.41),
        point(5_000, 12.3503, 78.9102, 0.93),
    ]
}

fn fully_revealed(stream: Vec<StreamPoint>, drone: Drone) -> PlaybackRenderer {
    let mut renderer = PlaybackRenderer::new(DEFAULT_RENDER_TICK, StressClassifier::default());
    renderer.ingest(&MissionState::simulated(drone, stream, "replay"));
    renderer.reveal_all();
    renderer
}

#[test]
fn delivery_order_does_not_change_the_rendered_frame() {
    let forward = sample_stream();
    let mut backward = sample_stream();
    backward.reverse();
    let mut shuffled = sample_stream();
    shuffled.swap(0, 3);
    shuffled.swap(1, 4);

    let reference = fully_revealed(forward, Drone::Scan).frame();
    for stream in [backward, shuffled] {
        let frame = fully_revealed(stream, Drone::Scan).frame();
        assert_eq!(frame.scan_markers, reference.scan_markers);
        assert_eq!(frame.spray_path, reference.spray_path);
        assert_eq!(frame.heatmap, reference.heatmap);
    }
}

#[test]
fn spray_path_runs_west_to_east() {
    let frame = fully_revealed(sample_stream(), Drone::Spray).frame();

    assert_eq!(
        frame.spray_path,
        vec![
            GeoPoint::new(12.3502, 78.9101),
            GeoPoint::new(12.3503, 78.9102),
            GeoPoint::new(12.3501, 78.9104),
        ]
    );
    assert!(frame.heatmap.is_empty());
    assert_eq!(frame.progress, 1.0);
}

#[test]
fn low_stress_markers_exclude_spray_candidates() {
    let frame = fully_revealed(sample_stream(), Drone::Scan).frame();

    let timestamps: Vec<u64> = frame
        .scan_markers
        .iter()
        .map(|marker| marker.timestamp)
        .collect();
    assert_eq!(timestamps, vec![4_000, 2_000]);
    assert_eq!(frame.heatmap.len(), 5);
}

#[test]
fn renderer_follows_a_simulated_mission_through_the_channel() {
    let channel = Rc::new(MemoryChannel::new());
    let config = SimulatorConfig {
        point_count: 4,
        ..SimulatorConfig::default()
    };
    let mut simulator = MissionSimulator::new(
        Rc::clone(&channel),
        DEFAULT_CHANNEL_KEY,
        config,
        FixedScores::new(vec![0.2, 0.8, 0.4, 0.9]),
    );
    let mut feed = MissionFeed::subscribe(Rc::clone(&channel), DEFAULT_CHANNEL_KEY);
    let mut renderer = PlaybackRenderer::new(DEFAULT_RENDER_TICK, StressClassifier::default());

    let _ = simulator.start(GeoPoint::new(12.35, 78.91));
    let step = Duration::from_millis(50);
    let mut elapsed = Duration::ZERO;
    while simulator.is_running() || renderer.revealed().len() < renderer.sorted_points().len() {
        let _ = simulator.advance(step);
        if let Some(state) = feed.take_update() {
            renderer.ingest_optional(state.as_ref());
        }
        let _ = renderer.advance(step);
        elapsed += step;
        assert!(elapsed < Duration::from_secs(60), "playback never settled");
    }

    let dashboard = renderer.dashboard();
    assert_eq!(dashboard.frame.drone, Drone::Scan);
    assert_eq!(dashboard.frame.total, 6);
    assert_eq!(dashboard.frame.revealed, 6);
    assert_eq!(dashboard.log.len(), 6);
    assert_eq!(dashboard.timeline.current_step(), 1);
    assert!(dashboard.frame.status.contains("complete"));
    assert!(elapsed >= DEFAULT_TICK_INTERVAL * 8);
}

#[test]
fn dropped_feed_stops_receiving() {
    let channel = Rc::new(MemoryChannel::new());
    let feed = MissionFeed::subscribe(Rc::clone(&channel), DEFAULT_CHANNEL_KEY);
    let before = feed.updates();
    drop(feed);

    channel.publish(
        DEFAULT_CHANNEL_KEY,
        &MissionState::simulated(Drone::Scan, sample_stream(), "late"),
    );

    assert_eq!(channel.subscriber_count(), 0);
    assert_eq!(before, 1);
}
