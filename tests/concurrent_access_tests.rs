/// Concurrent access tests
///
/// Request-driven lifecycle operations racing the scheduler sweep on the
/// same records. Every assertion here is about self-consistency of the
/// stored record, not about which racer wins.
/// Run with: cargo test --test concurrent_access_tests
use std::sync::Arc;

use chrono::{Duration, Utc};
use deathnote::{DeathNoteRegistry, PersonStatus, RegistryConfig};
use tokio::sync::Barrier;
use uuid::Uuid;

async fn overdue_person(registry: &DeathNoteRegistry) -> (Uuid, chrono::DateTime<Utc>) {
    let note = registry
        .initialize_note(Uuid::new_v4(), None)
        .await
        .unwrap();
    let person = registry
        .write_name("Contested", None, note.id)
        .await
        .unwrap();
    (person.id, person.entry_time)
}

#[tokio::test]
async fn specify_death_racing_a_sweep_leaves_one_consistent_record() {
    for _ in 0..20 {
        let registry = Arc::new(DeathNoteRegistry::in_memory());
        let (person_id, entry_time) = overdue_person(&registry).await;
        let sweep_time = entry_time + Duration::seconds(41);
        let explicit_target = entry_time + Duration::seconds(7200);

        let barrier = Arc::new(Barrier::new(2));

        let sweeper = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                registry.run_scheduler_tick(sweep_time).await.unwrap()
            })
        };

        let specifier = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                registry
                    .specify_death(person_id, Some(explicit_target), "accident", "fall")
                    .await
            })
        };

        let report = sweeper.await.unwrap();
        let specified = specifier.await.unwrap();

        let person = registry.find_person(person_id).await.unwrap().unwrap();
        assert!(person.invariants_hold(), "record is torn: {person:?}");

        match person.status {
            // the sweep won; the late specification saw a terminal record
            PersonStatus::DeadTimeout => {
                assert_eq!(report.finalized, 1);
                assert!(!person.alive);
            }
            // the specification won (or landed after the sweep settled)
            PersonStatus::ScheduledExplicit => {
                assert!(person.alive);
                assert_eq!(person.scheduled_death_time, Some(explicit_target));
                assert!(specified.is_ok());
            }
            other => panic!("unexpected terminal state {other:?} for {person:?}"),
        }
    }
}

#[tokio::test]
async fn concurrent_sweeps_finalize_exactly_once() {
    let registry = Arc::new(DeathNoteRegistry::in_memory());
    let (person_id, entry_time) = overdue_person(&registry).await;
    let sweep_time = entry_time + Duration::seconds(41);

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = vec![];
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            registry.run_scheduler_tick(sweep_time).await.unwrap()
        }));
    }

    let mut total_finalized = 0;
    let mut total_failed = 0;
    for handle in handles {
        let report = handle.await.unwrap();
        total_finalized += report.finalized;
        total_failed += report.failed;
    }

    assert_eq!(total_finalized, 1, "exactly one sweep may win the write");
    assert_eq!(total_failed, 0, "losing sweeps must treat the loss as benign");

    let person = registry.find_person(person_id).await.unwrap().unwrap();
    assert!(!person.alive);
    assert_eq!(person.status, PersonStatus::DeadTimeout);
    assert!(person.invariants_hold());
}

#[tokio::test]
async fn concurrent_writes_of_the_same_person_stay_deduplicated() {
    let registry = Arc::new(DeathNoteRegistry::in_memory());
    let note = registry
        .initialize_note(Uuid::new_v4(), None)
        .await
        .unwrap();
    let person = registry
        .write_name("Multiply Written", None, note.id)
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = vec![];
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        let (note_id, person_id) = (note.id, person.id);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            registry.write_person_in_note(note_id, person_id).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let note = registry.find_note(note.id).await.unwrap().unwrap();
    assert_eq!(note.person_ids, vec![person.id]);
}

#[tokio::test]
async fn parallel_registrations_against_one_note_all_land() {
    // registration needs enough retry headroom when everyone hits one page
    let config = RegistryConfig::new().write_retry_limit(32);
    let registry = Arc::new(DeathNoteRegistry::in_memory_with_config(config).unwrap());
    let note = registry
        .initialize_note(Uuid::new_v4(), None)
        .await
        .unwrap();

    let mut person_ids = vec![];
    for i in 0..10 {
        let person = registry
            .write_name(&format!("Victim {i}"), None, note.id)
            .await
            .unwrap();
        person_ids.push(person.id);
    }

    let barrier = Arc::new(Barrier::new(person_ids.len()));
    let mut handles = vec![];
    for person_id in &person_ids {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        let (note_id, person_id) = (note.id, *person_id);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            registry.write_person_in_note(note_id, person_id).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let note = registry.find_note(note.id).await.unwrap().unwrap();
    assert_eq!(note.person_ids.len(), person_ids.len());
    for person_id in person_ids {
        assert!(note.contains_person(person_id));
    }
}

#[tokio::test]
async fn detail_extension_racing_a_sweep_never_tears_the_record() {
    for _ in 0..20 {
        let registry = Arc::new(DeathNoteRegistry::in_memory());
        let (person_id, entry_time) = overdue_person(&registry).await;
        let sweep_time = entry_time + Duration::seconds(41);

        let barrier = Arc::new(Barrier::new(2));

        let sweeper = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                registry.run_scheduler_tick(sweep_time).await.unwrap()
            })
        };

        let extender = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                registry.begin_detail_specification(person_id).await
            })
        };

        sweeper.await.unwrap();
        let extended = extender.await.unwrap();
        assert!(extended.is_ok());

        let person = registry.find_person(person_id).await.unwrap().unwrap();
        assert!(person.invariants_hold(), "record is torn: {person:?}");
        assert!(matches!(
            person.status,
            PersonStatus::AwaitingDetails | PersonStatus::DeadTimeout
        ));
    }
}
