use image::Rgba;
use serde_json::json;

use terragen::progress::{PhaseStatus, ProgressEvent};
use terragen::{CancelToken, GenerationConfig, GenerationError, Phase, finalize, generate_map, generate_world};

fn small_config() -> GenerationConfig {
    GenerationConfig::from_overrides(&json!({
        "width": 48,
        "height": 32,
        "seed": "determinism",
        "tectonics": { "plate_count": 5, "steps": 6 },
        "erosion": { "iterations": 8 },
        "progress_interval": 2
    }))
    .unwrap()
}

fn flat_config() -> GenerationConfig {
    GenerationConfig::from_overrides(&json!({
        "width": 4,
        "height": 4,
        "tectonics": { "enabled": false },
        "noise": { "enabled": false },
        "erosion": { "enabled": false },
        "finalize": { "sea_level": 0.35 }
    }))
    .unwrap()
}

/// Owned summary of an event, so it can outlive the callback.
#[derive(Debug, PartialEq)]
enum Seen {
    Status(Phase, PhaseStatus),
    Step(Phase, u32, u32),
    Complete,
    Error(String),
}

fn record(events: &mut Vec<Seen>) -> impl FnMut(ProgressEvent<'_>) + '_ {
    move |event| {
        let terminal = event.is_terminal();
        let seen = match event {
            ProgressEvent::Status { phase, status } => Seen::Status(phase, status),
            ProgressEvent::Step(p) => Seen::Step(p.phase, p.current_step, p.total_steps),
            ProgressEvent::Complete { .. } => Seen::Complete,
            ProgressEvent::Error { message } => Seen::Error(message),
        };
        assert_eq!(terminal, matches!(seen, Seen::Complete | Seen::Error(_)));
        events.push(seen);
    }
}

#[test]
fn same_seed_same_image() {
    let config = small_config();
    let a = generate_map(&config, |_| {}).unwrap();
    let b = generate_map(&config, |_| {}).unwrap();
    assert_eq!(a.as_raw(), b.as_raw());
}

#[test]
fn different_seed_different_image() {
    let a = generate_map(&small_config(), |_| {}).unwrap();
    let mut other = small_config();
    other.seed = "another".into();
    let b = generate_map(&other, |_| {}).unwrap();
    assert_ne!(a.as_raw(), b.as_raw());
}

#[test]
fn flat_world_renders_uniform_gray() {
    let mut events = Vec::new();
    let map = generate_world(&flat_config(), &CancelToken::new(), record(&mut events)).unwrap();

    assert!(map.world.grid.data.iter().all(|c| c.height == 0.5 && !c.is_water));
    assert_eq!((map.image.width(), map.image.height()), (4, 4));
    let first = *map.image.get_pixel(0, 0);
    assert!(map.image.pixels().all(|p| *p == first));
    let Rgba([r, g, b, a]) = first;
    assert!(r == g && g == b && a == 255);
    assert!(r > 0 && r < 255);

    assert_eq!(
        events,
        vec![
            Seen::Status(Phase::Setup, PhaseStatus::Started),
            Seen::Status(Phase::Setup, PhaseStatus::Finished),
            Seen::Status(Phase::Tectonics, PhaseStatus::Skipped),
            Seen::Status(Phase::Noise, PhaseStatus::Skipped),
            Seen::Status(Phase::Erosion, PhaseStatus::Skipped),
            Seen::Status(Phase::Finalization, PhaseStatus::Started),
            Seen::Status(Phase::Finalization, PhaseStatus::Finished),
            Seen::Complete,
        ]
    );
}

#[test]
fn single_plate_world_is_flat_base_profile() {
    let mut config = flat_config();
    config.tectonics.enabled = true;
    config.tectonics.plate_count = 1;
    config.tectonics.steps = 0;

    let map = generate_world(&config, &CancelToken::new(), |_| {}).unwrap();
    let plate = &map.world.plates[0];
    for cell in &map.world.grid.data {
        assert_eq!(cell.plate_id, plate.id);
        assert_eq!(cell.crust_type, plate.crust_type);
        assert_eq!(cell.crust_thickness, plate.base_thickness);
        // One plate, no boundaries, no uplift: the flat base profile normalizes to 0.5.
        assert_eq!(cell.height, 0.5);
    }
}

#[test]
fn progress_is_ordered_and_ends_with_one_terminal_event() {
    let mut events = Vec::new();
    generate_map(&small_config(), record(&mut events)).unwrap();

    let terminals = events
        .iter()
        .filter(|e| matches!(e, Seen::Complete | Seen::Error(_)))
        .count();
    assert_eq!(terminals, 1);
    assert_eq!(events.last(), Some(&Seen::Complete));

    let tectonic_steps: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Seen::Step(Phase::Tectonics, s, 6) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(tectonic_steps, vec![2, 4, 6]);

    let erosion_steps: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Seen::Step(Phase::Erosion, s, 8) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(erosion_steps, vec![2, 4, 6, 8]);

    let phase_order: Vec<Phase> = events
        .iter()
        .filter_map(|e| match e {
            Seen::Status(p, PhaseStatus::Started) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(
        phase_order,
        vec![Phase::Setup, Phase::Tectonics, Phase::Noise, Phase::Erosion, Phase::Finalization]
    );
}

#[test]
fn invalid_config_fails_before_simulation() {
    let mut config = flat_config();
    config.width = 0;
    let mut events = Vec::new();
    let err = generate_map(&config, record(&mut events)).unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
    assert_eq!(events.first(), Some(&Seen::Status(Phase::Setup, PhaseStatus::Started)));
    assert!(matches!(events.last(), Some(Seen::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, Seen::Step(..))));
}

#[test]
fn oversized_grid_fails_with_config_error() {
    let mut config = flat_config();
    config.width = u32::MAX;
    config.height = u32::MAX;
    let mut events = Vec::new();
    let err = generate_map(&config, record(&mut events)).unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
    assert_eq!(events.iter().filter(|e| matches!(e, Seen::Error(_))).count(), 1);
    assert!(matches!(events.last(), Some(Seen::Error(_))));
    assert!(!events.contains(&Seen::Complete));
}

#[test]
fn cancelled_run_reports_error_and_no_image() {
    let token = CancelToken::new();
    token.cancel();
    let mut events = Vec::new();
    let err = generate_world(&small_config(), &token, record(&mut events)).unwrap_err();
    assert!(matches!(err, GenerationError::Phase { phase: Phase::Tectonics, .. }));
    assert!(!events.contains(&Seen::Complete));
    assert_eq!(events.iter().filter(|e| matches!(e, Seen::Error(_))).count(), 1);
}

#[test]
fn finalizing_twice_changes_nothing() {
    let mut map = generate_world(&small_config(), &CancelToken::new(), |_| {}).unwrap();
    let mask: Vec<bool> = map.world.grid.data.iter().map(|c| c.is_water).collect();
    let again = finalize(&mut map.world).unwrap();
    let mask_again: Vec<bool> = map.world.grid.data.iter().map(|c| c.is_water).collect();
    assert_eq!(mask, mask_again);
    assert_eq!(map.image.as_raw(), again.as_raw());
}

#[test]
fn water_mask_matches_sea_level() {
    let map = generate_world(&small_config(), &CancelToken::new(), |_| {}).unwrap();
    let sea = map.world.config.finalize.sea_level;
    for cell in &map.world.grid.data {
        assert!((0.0..=1.0).contains(&cell.height));
        assert_eq!(cell.is_water, cell.height < sea);
    }
}
