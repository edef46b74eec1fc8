//! Console controller driving the real menu against mock hardware.

use std::io::Cursor;

use barbot::app::commands::SessionCommand;
use barbot::app::events::DispenseEvent;
use barbot::app::session::{Controller, Flow};
use barbot::menu::LeafPolicy;

use crate::mock_hw::{MockFrontend, Mocks, gin_and_tonic_table, rig};

fn controller() -> (Controller<MockFrontend>, Mocks) {
    let (session, mocks) = rig(gin_and_tonic_table(), 0.001).split();
    let controller = Controller::new(session, MockFrontend::default(), LeafPolicy::default());
    (controller, mocks)
}

fn run(script: &str) -> (Controller<MockFrontend>, Mocks) {
    let (mut controller, mocks) = controller();
    controller.run(Cursor::new(script.to_owned()));
    (controller, mocks)
}

#[test]
fn root_shows_only_pourable_drinks() {
    let (controller, _mocks) = run("");
    let page = controller.frontend().last_page();
    assert_eq!(page.title, "Main Menu");
    assert_eq!(controller.frontend().last_labels(), ["Gin & Tonic", "Configure"]);
    assert_eq!(page.highlighted_label(), Some("Gin & Tonic"));
}

#[test]
fn selecting_a_drink_pours_it_and_returns_to_root() {
    let (controller, mocks) = run("select\n");
    let events = &controller.frontend().events;
    assert!(events.iter().any(|e| matches!(e, DispenseEvent::Finished { label, .. } if label == "Gin & Tonic")));
    let mut lines = mocks.actuator.activations();
    lines.sort_unstable();
    assert_eq!(lines, vec![17, 27]);
    assert_eq!(controller.frontend().last_page().title, "Main Menu");
}

#[test]
fn assigning_a_pump_through_the_menu_updates_visibility() {
    // Configure → Pump 1 → (Gin *, Rum, Vodka) → Vodka
    let (controller, mocks) = run("advance\nselect\nselect\nadvance\nadvance\nselect\n");

    let pump_page = &controller.frontend().pages[3];
    assert_eq!(pump_page.title, "Pump 1");
    assert_eq!(pump_page.items[0].label, "Gin *");
    assert_eq!(pump_page.items.last().unwrap().label, "Back");

    assert_eq!(mocks.store.table()["pump_1"].value.as_deref(), Some("vodka"));
    assert_eq!(controller.frontend().last_labels(), ["Vodka Tonic", "Configure"]);
    assert!(mocks.actuator.calls().is_empty());
}

#[test]
fn back_returns_to_the_entry_point() {
    // Configure has Pump 1..3, Clean, Test Pumps, Back.
    let (controller, _mocks) = run("advance\nselect\nadvance\nadvance\nadvance\nadvance\nadvance\nselect\n");
    let page = controller.frontend().last_page();
    assert_eq!(page.title, "Main Menu");
    assert_eq!(page.highlighted_label(), Some("Configure"));
}

#[test]
fn failed_assignment_is_reported_and_rolled_back() {
    let (mut controller, mocks) = controller();
    mocks.store.fail_saves(true);
    controller.run(Cursor::new("advance\nselect\nselect\nadvance\nselect\n".to_owned()));

    assert!(controller.frontend().notices.iter().any(|n| n.contains("disk full")));
    assert_eq!(
        controller.session().registry().slot("pump_1").unwrap().ingredient(),
        Some("gin")
    );
    assert_eq!(controller.frontend().last_page().title, "Main Menu");
}

#[test]
fn quit_stops_reading_input() {
    let (_controller, mocks) = run("quit\nselect\n");
    assert!(mocks.actuator.calls().is_empty());
}

#[test]
fn junk_input_gets_a_notice() {
    let (controller, _mocks) = run("pour me one\n\n");
    assert_eq!(controller.frontend().notices.len(), 1);
    assert!(controller.frontend().notices[0].contains("unrecognised"));
}

#[test]
fn apply_reports_flow() {
    let (mut controller, _mocks) = controller();
    controller.render();
    assert_eq!(controller.apply(SessionCommand::Advance), Flow::Continue);
    assert_eq!(controller.apply(SessionCommand::Quit), Flow::Quit);
    assert_eq!(controller.menu().tree().node(controller.menu().highlighted().unwrap()).label(), "Configure");
}
