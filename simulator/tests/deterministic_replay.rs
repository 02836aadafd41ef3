use std::{cell::RefCell, rc::Rc, time::Duration};

use crop_mission_channel::{MemoryChannel, MissionChannel};
use crop_mission_core::{Command, Event, GeoPoint, MissionState, DEFAULT_CHANNEL_KEY};
use crop_mission_simulator::{MissionSimulator, SimulatorConfig};
use crop_mission_system_point_generation::SeededScores;

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    events: Vec<Event>,
    published: Vec<MissionState>,
}

#[test]
fn same_seed_and_commands_replay_identically() {
    let first = replay(42, scripted_commands());
    let second = replay(42, scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.published.len() >= 19);
}

#[test]
fn different_seeds_produce_different_readings() {
    let first = replay(1, scripted_commands());
    let second = replay(2, scripted_commands());

    assert_ne!(first.published, second.published);
}

fn replay(seed: u64, commands: Vec<Command>) -> ReplayOutcome {
    let channel = Rc::new(MemoryChannel::new());
    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&published);
    let _ = channel.subscribe(
        DEFAULT_CHANNEL_KEY,
        Box::new(move |state: Option<&MissionState>| {
            if let Some(state) = state {
                sink.borrow_mut().push(state.clone());
            }
        }),
    );

    let config = SimulatorConfig {
        point_count: 16,
        base_timestamp_ms: 1_700_000_000_000,
        ..SimulatorConfig::default()
    };
    let mut simulator = MissionSimulator::new(
        Rc::clone(&channel),
        DEFAULT_CHANNEL_KEY,
        config,
        SeededScores::new(seed),
    );

    let mut events = Vec::new();
    for command in commands {
        simulator.apply(command, &mut events);
    }

    let published = published.borrow().clone();
    ReplayOutcome { events, published }
}

fn scripted_commands() -> Vec<Command> {
    let center = GeoPoint::new(12.35, 78.91);
    let mut commands = vec![Command::Start { center }];
    commands.extend((0..5).map(|_| Command::Tick {
        dt: Duration::from_millis(500),
    }));
    commands.push(Command::Pause);
    commands.push(Command::Tick {
        dt: Duration::from_secs(3),
    });
    commands.push(Command::Resume);
    commands.extend((0..40).map(|_| Command::Tick {
        dt: Duration::from_millis(700),
    }));
    commands
}
