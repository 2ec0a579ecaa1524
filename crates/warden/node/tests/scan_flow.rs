mod common;

use common::{alice, boot, bob, config, stores_with, uid_of, ALICE_UID, BOB_UID};
use std::sync::Arc;
use warden_authority::{DeliveryKind, ScriptedAuthority};
use warden_node::devices::sim::SensorReply;
use warden_node::devices::Output;
use warden_node::Stores;
use warden_store::{AttendanceLedger, AuthorizationCache, MemoryLineLog};
use warden_types::{DenyReason, Outcome};

#[tokio::test(start_paused = true)]
async fn cache_hit_never_asks_the_authority() {
    let config = config(true);
    let stores = stores_with(&config, &[alice()]).await;
    let mut h = boot(config, ScriptedAuthority::new(), Some(stores)).await;

    let outcome = h.scan(ALICE_UID).await;

    assert_eq!(outcome, Some(Outcome::Granted(alice())));
    assert!(h.authority.verify_calls().is_empty());
    assert_eq!(h.handles.indicators.activations(Output::Lock), 1);
    assert!(!h.handles.indicators.is_on(Output::Lock));

    let reports = h.authority.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, DeliveryKind::Immediate);
    assert!(reports[0].accepted);
}

#[tokio::test(start_paused = true)]
async fn unknown_credential_offline_is_denied() {
    let authority = ScriptedAuthority::new().with_credential(alice());
    let mut h = boot(config(false), authority, None).await;

    let outcome = h.scan(ALICE_UID).await;

    assert_eq!(outcome, Some(Outcome::Denied(DenyReason::UnknownCredential)));
    assert!(h.authority.verify_calls().is_empty());
    assert_eq!(h.handles.indicators.activations(Output::Lock), 0);
    assert!(h.node.ledger().is_empty());
    assert!(h
        .handles
        .display
        .screens()
        .contains(&("Access Denied".to_string(), "Invalid Card".to_string())));
}

#[tokio::test(start_paused = true)]
async fn remote_rejection_is_denied_and_not_cached() {
    let mut h = boot(config(true), ScriptedAuthority::new(), None).await;

    let outcome = h.scan(BOB_UID).await;

    assert_eq!(outcome, Some(Outcome::Denied(DenyReason::UnknownCredential)));
    assert_eq!(h.authority.verify_calls(), vec![uid_of(BOB_UID)]);
    assert!(h.node.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_verification_is_cached_for_offline_use() {
    let authority = ScriptedAuthority::new().with_credential(alice());
    let mut h = boot(config(true), authority, None).await;

    // online: unknown locally, the authority vouches for it
    let first = h.scan(ALICE_UID).await;
    assert_eq!(first, Some(Outcome::Granted(alice())));
    assert_eq!(h.authority.verify_calls().len(), 1);
    assert_eq!(h.node.cache().lookup(&uid_of(ALICE_UID)), Some(&alice()));

    // offline: resolved from the cache without any network call
    h.handles.link.set_connected(false);
    assert!(h.node.check_link().await.is_some());
    h.settle().await;

    let second = h.scan(ALICE_UID).await;
    assert_eq!(second, Some(Outcome::Granted(alice())));
    assert_eq!(h.authority.verify_calls().len(), 1);
    assert_eq!(h.authority.reports().len(), 1);

    let ledger = h.node.ledger();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.events()[0].delivered);
    assert!(!ledger.events()[1].delivered);
    assert!(ledger.events()[0].sequence < ledger.events()[1].sequence);
}

#[tokio::test(start_paused = true)]
async fn failed_biometric_denies_without_unlocking() {
    let config = config(true);
    let stores = stores_with(&config, &[alice()]).await;
    let mut h = boot(config, ScriptedAuthority::new(), Some(stores)).await;
    h.handles.sensor.set_fallback(SensorReply::NoMatch);

    let outcome = h.scan(ALICE_UID).await;

    assert_eq!(outcome, Some(Outcome::Denied(DenyReason::BiometricMismatch)));
    assert_eq!(h.handles.indicators.activations(Output::Lock), 0);
    assert_eq!(h.handles.sensor.scans(), 150);
    assert!(h.node.ledger().is_empty());
    assert!(h.authority.reports().is_empty());
    assert!(h
        .handles
        .display
        .screens()
        .contains(&("Access Denied".to_string(), "Fingerprint Failed".to_string())));
}

#[tokio::test(start_paused = true)]
async fn grant_walks_the_panel_through_the_cycle() {
    let config = config(true);
    let stores = stores_with(&config, &[bob()]).await;
    let mut h = boot(config, ScriptedAuthority::new(), Some(stores)).await;
    let booted = h.handles.display.screens().len();

    h.scan(BOB_UID).await;

    let tops: Vec<String> = h.handles.display.screens()[booted..]
        .iter()
        .map(|(top, _)| top.clone())
        .collect();
    assert_eq!(
        tops,
        vec![
            "Card Detected",
            "Card Valid",
            "Place Finger",
            "Finger OK",
            "Access Granted",
            "Door Unlocked",
            "Access Complete",
            "System Ready",
        ]
    );
    assert_eq!(h.handles.reader.halts(), 1);
    assert!(!h.handles.indicators.is_on(Output::GreenLed));
}

#[tokio::test(start_paused = true)]
async fn storage_failure_does_not_block_a_grant() {
    let cards = Arc::new(MemoryLineLog::new("cards"));
    let attendance = Arc::new(MemoryLineLog::new("attendance"));
    let stores = Stores {
        cache: AuthorizationCache::new(cards.clone()),
        ledger: AttendanceLedger::new(attendance.clone(), None),
    };
    let authority = ScriptedAuthority::new().with_credential(alice());
    let mut h = boot(config(true), authority, Some(stores)).await;
    cards.set_unavailable(true);
    attendance.set_unavailable(true);

    let outcome = h.scan(ALICE_UID).await;

    assert_eq!(outcome, Some(Outcome::Granted(alice())));
    assert!(h.node.cache().is_empty());
    assert!(h.node.ledger().is_empty());
    // the event still reaches the server right away
    assert_eq!(h.authority.accepted_reports(), 1);
}

#[tokio::test(start_paused = true)]
async fn reader_without_card_does_nothing() {
    let mut h = boot(config(true), ScriptedAuthority::new(), None).await;

    assert_eq!(h.node.poll_reader().await, None);
    assert_eq!(h.handles.reader.halts(), 0);
}
