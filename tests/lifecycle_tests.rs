/// Person lifecycle tests
///
/// Register → detail specification → explicit death, driven through the
/// registry facade against the in-memory store.
/// Run with: cargo test --test lifecycle_tests
use chrono::{Duration, Utc};
use deathnote::{DeathNoteRegistry, NoteError, PersonStatus};
use uuid::Uuid;

async fn registry_with_note() -> (DeathNoteRegistry, Uuid) {
    let registry = DeathNoteRegistry::in_memory();
    let note = registry
        .initialize_note(Uuid::new_v4(), None)
        .await
        .unwrap();
    (registry, note.id)
}

#[tokio::test]
async fn written_person_round_trips_as_pending() {
    let (registry, note_id) = registry_with_note().await;

    let person = registry.write_name("Alice", None, note_id).await.unwrap();

    assert!(person.alive);
    assert_eq!(person.status, PersonStatus::Pending);
    assert_eq!(
        person.scheduled_death_time,
        Some(person.entry_time + Duration::seconds(40))
    );
    assert_eq!(person.death_date, None);
    assert_eq!(person.death_note_id, note_id);
    assert!(person.invariants_hold());

    let reloaded = registry.find_person(person.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, PersonStatus::Pending);
    assert!(reloaded.alive);
    assert_eq!(reloaded.scheduled_death_time, person.scheduled_death_time);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let (registry, note_id) = registry_with_note().await;

    let result = registry.write_name("", None, note_id).await;
    assert!(matches!(result, Err(NoteError::Validation(_))));

    let result = registry.write_name("   ", None, note_id).await;
    assert!(matches!(result, Err(NoteError::Validation(_))));
}

#[tokio::test]
async fn detail_specification_extends_the_deadline() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Carol", None, note_id).await.unwrap();

    let updated = registry
        .begin_detail_specification(person.id)
        .await
        .unwrap();

    assert_eq!(updated.status, PersonStatus::AwaitingDetails);
    assert_eq!(
        updated.scheduled_death_time,
        Some(person.entry_time + Duration::seconds(400))
    );
    // the default cause stays until details are actually submitted
    assert_eq!(updated.cause_of_death.as_deref(), Some("Heart attack"));
    assert!(updated.invariants_hold());
}

#[tokio::test]
async fn detail_specification_is_idempotent() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Carol", None, note_id).await.unwrap();

    let first = registry
        .begin_detail_specification(person.id)
        .await
        .unwrap();
    let second = registry
        .begin_detail_specification(person.id)
        .await
        .unwrap();

    assert_eq!(second.status, PersonStatus::AwaitingDetails);
    assert_eq!(second.scheduled_death_time, first.scheduled_death_time);
    assert_eq!(second.version, first.version);
}

#[tokio::test]
async fn detail_specification_of_unknown_person_is_not_found() {
    let (registry, _) = registry_with_note().await;

    let result = registry.begin_detail_specification(Uuid::new_v4()).await;
    assert!(matches!(result, Err(NoteError::PersonNotFound(_))));
}

#[tokio::test]
async fn past_dated_death_is_immediate() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Dana", None, note_id).await.unwrap();

    let target = Utc::now() - Duration::seconds(5);
    let updated = registry
        .specify_death(person.id, Some(target), "fell", "impact")
        .await
        .unwrap();

    assert!(!updated.alive);
    assert_eq!(updated.status, PersonStatus::DeadExplicit);
    assert_eq!(updated.death_date, Some(target));
    assert_eq!(updated.scheduled_death_time, None);
    assert_eq!(updated.death_details.as_deref(), Some("fell"));
    assert_eq!(updated.cause_of_death.as_deref(), Some("impact"));
    assert!(updated.invariants_hold());
}

#[tokio::test]
async fn future_dated_death_reschedules() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Erin", None, note_id).await.unwrap();

    let target = Utc::now() + Duration::seconds(3600);
    let updated = registry
        .specify_death(person.id, Some(target), "car crash", "collision")
        .await
        .unwrap();

    assert!(updated.alive);
    assert_eq!(updated.status, PersonStatus::ScheduledExplicit);
    assert_eq!(updated.scheduled_death_time, Some(target));
    assert_eq!(updated.death_date, None);
    assert!(updated.invariants_hold());
}

#[tokio::test]
async fn missing_target_time_is_a_validation_error() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Frank", None, note_id).await.unwrap();

    let result = registry
        .specify_death(person.id, None, "details", "cause")
        .await;
    assert!(matches!(result, Err(NoteError::Validation(_))));

    // nothing was persisted
    let reloaded = registry.find_person(person.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, PersonStatus::Pending);
}

#[tokio::test]
async fn specifying_death_of_a_dead_person_is_a_conflict() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Gus", None, note_id).await.unwrap();

    registry
        .specify_death(
            person.id,
            Some(Utc::now() - Duration::seconds(1)),
            "poison",
            "cyanide",
        )
        .await
        .unwrap();

    let result = registry
        .specify_death(
            person.id,
            Some(Utc::now() + Duration::seconds(60)),
            "again",
            "anything",
        )
        .await;
    assert!(matches!(result, Err(NoteError::Conflict(_))));

    // begin_detail_specification stays a harmless no-op on the dead
    let unchanged = registry
        .begin_detail_specification(person.id)
        .await
        .unwrap();
    assert_eq!(unchanged.status, PersonStatus::DeadExplicit);
    assert!(unchanged.invariants_hold());
}

#[tokio::test]
async fn deleting_a_person_scrubs_the_note_page() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Naomi", None, note_id).await.unwrap();
    registry
        .write_person_in_note(note_id, person.id)
        .await
        .unwrap();

    registry.delete_person(person.id).await.unwrap();

    assert!(registry.find_person(person.id).await.unwrap().is_none());
    let note = registry.find_note(note_id).await.unwrap().unwrap();
    assert!(!note.contains_person(person.id));
}

#[tokio::test]
async fn person_serializes_with_camel_case_fields() {
    let (registry, note_id) = registry_with_note().await;
    let person = registry.write_name("Hideki Ryuga", None, note_id).await.unwrap();

    let json = serde_json::to_value(&person).unwrap();
    assert!(json.get("scheduledDeathTime").is_some());
    assert!(json.get("entryTime").is_some());
    assert_eq!(json["status"], "PENDING");
}
