//! Remote command mode against a scripted mailbox.

use std::thread;
use std::time::{Duration, Instant};

use barbot::app::remote::RemoteLoop;
use barbot::config::RemoteConfig;

use crate::mock_hw::{FAST_FLOW, MockSource, RecordingSink, gin_and_tonic_table, rig};

fn remote_config() -> RemoteConfig {
    RemoteConfig {
        poll_interval_secs: 1,
        ..RemoteConfig::default()
    }
}

#[test]
fn known_drink_is_poured_consumed_and_confirmed() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut remote = RemoteLoop::new(MockSource::with(&[("42", "Gin & Tonic")]), &remote_config());
    let mut sink = RecordingSink::default();

    let summary = remote.poll_once(&rig.session, &mut sink).unwrap();

    assert_eq!(summary.dispensed, vec!["Gin & Tonic".to_owned()]);
    assert_eq!(remote.source().consumed, vec!["42".to_owned()]);
    assert_eq!(
        remote.source().sent,
        vec![(
            "Gin & Tonic ready - Drink Order".to_owned(),
            "Your Gin & Tonic has been prepared. Enjoy!".to_owned()
        )]
    );
    assert_eq!(rig.actuator.activations().len(), 2);
}

#[test]
fn command_text_is_normalised() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut remote = RemoteLoop::new(MockSource::with(&[("1", "  GIN & TONIC \n")]), &remote_config());
    let summary = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();
    assert_eq!(summary.dispensed, vec!["Gin & Tonic".to_owned()]);
}

#[test]
fn unknown_drink_is_consumed_without_pouring() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut remote = RemoteLoop::new(MockSource::with(&[("7", "Mojito")]), &remote_config());

    let summary = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();

    assert_eq!(summary.unknown, vec!["7".to_owned()]);
    assert_eq!(remote.source().consumed, vec!["7".to_owned()]);
    assert!(remote.source().sent.is_empty());
    assert!(rig.actuator.calls().is_empty());

    // Consumed means not seen again.
    let again = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();
    assert_eq!(again, Default::default());
}

#[test]
fn busy_dispenser_leaves_the_command_for_redelivery() {
    let rig = rig(gin_and_tonic_table(), FAST_FLOW);
    let mut remote = RemoteLoop::new(MockSource::with(&[("9", "Gin & Tonic")]), &remote_config());

    let summary = thread::scope(|s| {
        let local = s.spawn(|| rig.session.dispense("Gin & Tonic", &mut RecordingSink::default()));
        thread::sleep(Duration::from_millis(100));
        let summary = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();
        assert!(local.join().unwrap().unwrap().completed);
        summary
    });

    assert_eq!(summary.deferred, vec!["9".to_owned()]);
    assert!(remote.source().consumed.is_empty());

    let retry = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();
    assert_eq!(retry.dispensed, vec!["Gin & Tonic".to_owned()]);
    assert_eq!(remote.source().consumed, vec!["9".to_owned()]);
}

#[test]
fn failed_confirmation_still_consumes() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut source = MockSource::with(&[("5", "Gin & Tonic")]);
    source.fail_send = true;
    let mut remote = RemoteLoop::new(source, &remote_config());

    let summary = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();

    assert_eq!(summary.dispensed.len(), 1);
    assert_eq!(remote.source().consumed, vec!["5".to_owned()]);
    assert!(remote.source().sent.is_empty());
}

#[test]
fn fetch_failure_surfaces_from_a_single_poll() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut source = MockSource::with(&[("1", "Gin & Tonic")]);
    source.fetch_failures.push_back(true);
    let mut remote = RemoteLoop::new(source, &remote_config());

    assert!(remote.poll_once(&rig.session, &mut RecordingSink::default()).is_err());
    assert!(remote.poll_once(&rig.session, &mut RecordingSink::default()).is_ok());
}

#[test]
fn run_retries_after_transport_errors_and_exits_on_stop() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    let mut source = MockSource::with(&[("1", "Gin & Tonic")]);
    source.fetch_failures.push_back(true);
    let mut remote = RemoteLoop::new(source, &remote_config());

    let started = Instant::now();
    thread::scope(|s| {
        let stop = rig.stop.clone();
        s.spawn(move || {
            thread::sleep(Duration::from_millis(1500));
            stop.engage();
        });
        remote.run(&rig.session, &mut RecordingSink::default());
    });

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(remote.source().fetches >= 2);
    assert_eq!(remote.source().consumed, vec!["1".to_owned()]);
    assert_eq!(remote.source().sent.len(), 1);
}

#[test]
fn engaged_stop_defers_everything() {
    let rig = rig(gin_and_tonic_table(), 0.001);
    rig.stop.engage();
    let mut remote = RemoteLoop::new(MockSource::with(&[("1", "Gin & Tonic")]), &remote_config());

    let summary = remote.poll_once(&rig.session, &mut RecordingSink::default()).unwrap();

    assert_eq!(summary.deferred, vec!["1".to_owned()]);
    assert!(remote.source().consumed.is_empty());
}
