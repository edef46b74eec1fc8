//! Session: job serialisation and pump assignment.

use std::thread;
use std::time::Duration;

use barbot::error::Error;
use barbot::menu::LeafAction;

use crate::mock_hw::{FAST_FLOW, RecordingSink, gin_and_tonic_table, rig};

#[test]
fn overlapping_dispense_is_refused_and_first_job_completes() {
    let rig = rig(gin_and_tonic_table(), FAST_FLOW);

    let (first, second) = thread::scope(|s| {
        let first = s.spawn(|| {
            let mut sink = RecordingSink::default();
            rig.session.dispense("Gin & Tonic", &mut sink)
        });
        thread::sleep(Duration::from_millis(100));
        assert!(rig.session.is_busy());
        let mut sink = RecordingSink::default();
        let second = rig.session.dispense("Gin & Tonic", &mut sink);
        (first.join().unwrap(), second)
    });

    assert!(matches!(second, Err(Error::Busy)));
    let first = first.unwrap();
    assert!(first.completed);
    // Only one job's worth of activations.
    assert_eq!(rig.actuator.activations().len(), 2);
    assert!(!rig.session.is_busy());
}

#[test]
fn next_job_is_accepted_once_the_first_finishes() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut sink = RecordingSink::default();
    assert!(rig.session.dispense("Gin & Tonic", &mut sink).unwrap().completed);
    assert!(rig.session.dispense("Gin & Tonic", &mut sink).unwrap().completed);
    assert_eq!(rig.actuator.activations().len(), 4);
}

#[test]
fn unknown_recipe_is_an_error() {
    let rig = rig(gin_and_tonic_table(), FAST_FLOW);
    let mut sink = RecordingSink::default();
    assert!(matches!(
        rig.session.dispense("Mojito", &mut sink),
        Err(Error::UnknownRecipe(name)) if name == "Mojito"
    ));
    assert!(rig.actuator.calls().is_empty());
}

#[test]
fn recipe_name_match_ignores_case() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut sink = RecordingSink::default();
    let result = rig.session.dispense("gin & tonic", &mut sink).unwrap();
    assert_eq!(result.label, "Gin & Tonic");
}

#[test]
fn assign_persists_whole_table() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    rig.session.assign("pump_3", Some("vodka")).unwrap();

    let stored = rig.store.table();
    assert_eq!(stored["pump_3"].value.as_deref(), Some("vodka"));
    assert_eq!(stored["pump_1"].value.as_deref(), Some("gin"));
    assert_eq!(stored["pump_3"].pin, 22);
    assert_eq!(rig.session.registry().resolve("VODKA").unwrap().key(), "pump_3");
}

#[test]
fn assigning_the_same_value_twice_is_idempotent() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    rig.session.assign("pump_2", Some("coke")).unwrap();
    let once = rig.store.table();
    rig.session.assign("pump_2", Some("coke")).unwrap();
    assert_eq!(rig.store.table(), once);
}

#[test]
fn failed_write_rolls_back() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    rig.store.fail_saves(true);

    let err = rig.session.assign("pump_1", Some("rum")).unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(rig.session.registry().slot("pump_1").unwrap().ingredient(), Some("gin"));
    assert_eq!(rig.store.table()["pump_1"].value.as_deref(), Some("gin"));
}

#[test]
fn unknown_slot_is_rejected() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    assert!(matches!(
        rig.session.assign("pump_9", Some("gin")),
        Err(Error::UnknownSlot(_))
    ));
    assert_eq!(rig.store.saves(), 0);
}

#[test]
fn clearing_a_slot_hides_its_ingredient() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    rig.session.assign("pump_1", None).unwrap();
    assert!(rig.session.registry().resolve("gin").is_none());
    assert_eq!(rig.store.table()["pump_1"].value, None);
}

#[test]
fn selection_handler_dispatches_every_leaf_kind() {
    let mut rig = rig(gin_and_tonic_table(), 0.001);
    let mut sink = RecordingSink::default();

    rig.session
        .handle_selection(
            &LeafAction::Drink {
                recipe: "Gin & Tonic".into(),
            },
            &mut sink,
        )
        .unwrap();
    rig.session
        .handle_selection(
            &LeafAction::AssignPump {
                slot: "pump_3".into(),
                ingredient: Some("rum".into()),
                option: "Rum".into(),
            },
            &mut sink,
        )
        .unwrap();
    rig.session.handle_selection(&LeafAction::Clean, &mut sink).unwrap();
    rig.session.handle_selection(&LeafAction::TestPumps, &mut sink).unwrap();

    assert_eq!(rig.store.table()["pump_3"].value.as_deref(), Some("rum"));
    // drink (2) + clean (3) + test (3)
    assert_eq!(rig.actuator.activations().len(), 8);
}

#[test]
fn interrupted_job_reports_failure_to_the_menu() {
    let mut rig = rig(gin_and_tonic_table(), FAST_FLOW);
    rig.stop.engage();
    let mut sink = RecordingSink::default();
    let err = rig
        .session
        .handle_selection(
            &LeafAction::Drink {
                recipe: "Gin & Tonic".into(),
            },
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(err, Error::EmergencyStopped));
}
