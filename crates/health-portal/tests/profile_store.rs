//! Profile store integration tests
//!
//! Load, edit and save against a scripted API, with the session cache and
//! role marker in the loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{patient_session, sample_profile, MockApi, Reply};
use health_portal::store::{LOAD_FAILED_MESSAGE, SAVE_SUCCESS_MESSAGE};
use health_portal::{
    AllergySeverity, GuardOutcome, NoticeLevel, PatientProfile, PortalError, ProfileField,
    ProfileStore, ProfileView, Role, SaveOutcome, SessionContext, StoreEvent,
};

fn store_with(api: Arc<MockApi>, session: Arc<SessionContext>) -> ProfileStore {
    ProfileStore::new(api, session, ProfileView::Settings)
}

// ============================================================================
// Mount and load
// ============================================================================

#[tokio::test]
async fn test_wrong_role_redirects_before_any_fetch() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let session = SessionContext::in_memory();
    session.sign_in(Role::Doctor).unwrap();
    session.cache_profile(&sample_profile()).unwrap();

    let store = store_with(api.clone(), session);
    let outcome = store.mount().await;

    assert_eq!(outcome, GuardOutcome::Redirect("/auth/login/patient".to_string()));
    assert_eq!(api.fetches(), 0);
    // nothing restored either
    assert_eq!(store.snapshot(), PatientProfile::default());
}

#[tokio::test]
async fn test_missing_role_redirects() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let store = store_with(api.clone(), SessionContext::in_memory());

    assert!(!store.mount().await.is_allowed());
    assert_eq!(api.fetches(), 0);
}

#[tokio::test]
async fn test_mount_loads_profile() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let store = store_with(api.clone(), patient_session());

    assert_eq!(store.mount().await, GuardOutcome::Allow);
    assert_eq!(api.fetches(), 1);

    let profile = store.snapshot();
    assert_eq!(profile.patient_id, "PAT-001");
    assert_eq!(profile.bmi, Some(22.5));
    let allergies: Vec<&str> = profile
        .medication_allergies
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(allergies, vec!["Penicillin", "Ibuprofen"]);
}

#[tokio::test]
async fn test_absent_allergies_load_as_empty_list() {
    let sparse: PatientProfile =
        serde_json::from_str(r#"{"patientId": "PAT-9", "firstName": "Sam"}"#).unwrap();
    let api = Arc::new(MockApi::new(sparse));
    let store = store_with(api, patient_session());

    let profile = store.load().await.unwrap();
    assert!(profile.medication_allergies.is_empty());
    assert_eq!(profile.last_name, "");
    assert_eq!(profile.bmi, None);
}

#[tokio::test]
async fn test_mistyped_and_null_fields_load_field_by_field() {
    let response: PatientProfile = serde_json::from_str(
        r#"{
            "patientId": 42,
            "nic": "199012345678",
            "firstName": "Sam",
            "lastName": null,
            "phoneNumber": 771234567,
            "height": "175",
            "weight": 70,
            "medicationAllergies": [
                {"name": "Latex", "severity": null},
                {"name": null, "severity": "Moderate"}
            ]
        }"#,
    )
    .unwrap();
    let api = Arc::new(MockApi::new(response));
    let store = store_with(api, patient_session());

    assert!(store.mount().await.is_allowed());
    assert!(!store.load_failed());

    let profile = store.snapshot();
    assert_eq!(profile.patient_id, "42");
    assert_eq!(profile.first_name, "Sam");
    assert_eq!(profile.last_name, "");
    assert_eq!(profile.phone_number, "771234567");
    assert_eq!(profile.bmi, Some(22.9));
    assert_eq!(profile.medication_allergies.len(), 2);
    assert_eq!(profile.medication_allergies[0].severity, AllergySeverity::Low);
    assert_eq!(profile.medication_allergies[1].name, "");
}

#[tokio::test]
async fn test_save_echoes_server_owned_fields() {
    let response: PatientProfile = serde_json::from_str(
        r#"{
            "patientId": "PAT-7",
            "height": 170,
            "weight": 65,
            "bmi": 22.4,
            "lastUpdated": "2026-03-01 10:00:00",
            "medicationAllergies": [{"name": "Penicillin", "severity": "Severe"}]
        }"#,
    )
    .unwrap();
    let api = Arc::new(MockApi::new(response));
    let session = patient_session();
    let store = store_with(api.clone(), session.clone());
    store.mount().await;

    store.edit(ProfileField::Address, "9 Harbour Road").unwrap();
    assert_eq!(store.save().await.unwrap(), SaveOutcome::Saved);

    let body = serde_json::to_value(&api.saved.lock().unwrap()[0]).unwrap();
    assert_eq!(body["lastUpdated"], "2026-03-01 10:00:00");
    assert_eq!(body["bmi"], 22.4);
    assert_eq!(body["medicationAllergies"][0]["name"], "Penicillin");
    assert_eq!(body["address"], "9 Harbour Road");

    let cached = session.cached_profile().unwrap();
    assert_eq!(cached.last_updated.as_deref(), Some("2026-03-01 10:00:00"));
    assert_eq!(cached.bmi, Some(22.4));
}

#[tokio::test]
async fn test_failed_load_keeps_cached_state() {
    let api = Arc::new(MockApi::new(PatientProfile::default()));
    api.set_fetch_reply(Reply::Offline);

    let session = patient_session();
    session.cache_profile(&sample_profile()).unwrap();

    let store = store_with(api.clone(), session);
    let mut events = store.subscribe();

    assert!(store.mount().await.is_allowed());
    assert_eq!(api.fetches(), 1);
    assert!(store.load_failed());
    assert_eq!(store.snapshot(), sample_profile());

    assert_eq!(events.recv().await.unwrap(), StoreEvent::Restored(sample_profile()));
    match events.recv().await.unwrap() {
        StoreEvent::LoadFailed(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.message, LOAD_FAILED_MESSAGE);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_load_without_cache_is_empty_not_fatal() {
    let api = Arc::new(MockApi::new(sample_profile()));
    api.set_fetch_reply(Reply::Rejected(500, None));
    let store = store_with(api, patient_session());

    assert!(store.mount().await.is_allowed());
    assert!(store.load_failed());
    assert_eq!(store.snapshot(), PatientProfile::default());
}

#[tokio::test]
async fn test_remote_load_overrides_stale_cache() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let session = patient_session();
    let stale = PatientProfile {
        patient_id: "PAT-001".to_string(),
        first_name: "Old".to_string(),
        ..Default::default()
    };
    session.cache_profile(&stale).unwrap();

    let store = store_with(api, session.clone());
    store.mount().await;

    assert_eq!(store.snapshot().first_name, "Alice");
    assert_eq!(session.cached_profile().unwrap().first_name, "Alice");
}

// ============================================================================
// Edits
// ============================================================================

#[tokio::test]
async fn test_measurement_edits_recompute_bmi_in_either_order() {
    let api = Arc::new(MockApi::new(sample_profile()));

    let a = store_with(api.clone(), patient_session());
    a.load().await.unwrap();
    a.edit(ProfileField::Height, "180").unwrap();
    let a = a.edit(ProfileField::Weight, "81").unwrap();

    let b = store_with(api, patient_session());
    b.load().await.unwrap();
    b.edit(ProfileField::Weight, "81").unwrap();
    let b = b.edit(ProfileField::Height, "180").unwrap();

    assert_eq!(a.bmi, Some(25.0));
    assert_eq!(a.bmi, b.bmi);
}

#[tokio::test]
async fn test_identifier_edits_are_refused() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let store = store_with(api, patient_session());
    store.load().await.unwrap();

    assert!(matches!(
        store.edit(ProfileField::PatientId, "PAT-999"),
        Err(PortalError::Edit(_))
    ));
    assert!(matches!(
        store.edit_named("nic", "000000000000"),
        Err(PortalError::Edit(_))
    ));
    store.edit(ProfileField::Email, "alice@new.example.com").unwrap();

    let profile = store.snapshot();
    assert_eq!(profile.patient_id, "PAT-001");
    assert_eq!(profile.nic, "199012345678");
    assert_eq!(profile.email, "alice@new.example.com");
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_save_sends_snapshot_and_caches_it() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let session = patient_session();
    let store = store_with(api.clone(), session.clone());
    store.load().await.unwrap();
    store.edit(ProfileField::Address, "9 Harbour Road").unwrap();

    let mut events = store.subscribe();
    assert_eq!(store.save().await.unwrap(), SaveOutcome::Saved);

    let saved = api.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].address, "9 Harbour Road");
    assert_eq!(session.cached_profile().unwrap().address, "9 Harbour Road");

    assert_eq!(events.recv().await.unwrap(), StoreEvent::Saving);
    match events.recv().await.unwrap() {
        StoreEvent::Saved(notice) => assert_eq!(notice.message, SAVE_SUCCESS_MESSAGE),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(!store.is_saving());
}

#[tokio::test]
async fn test_failed_save_keeps_state_and_cache() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let session = patient_session();
    let store = store_with(api.clone(), session.clone());
    store.load().await.unwrap();
    let cached_before = session.cached_profile();

    store.edit(ProfileField::Weight, "70").unwrap();
    let before = store.snapshot();

    api.set_save_reply(Reply::Offline);
    let mut events = store.subscribe();
    let err = store.save().await.unwrap_err();

    assert!(matches!(err, PortalError::Network(_)));
    assert_eq!(store.snapshot(), before);
    assert_eq!(session.cached_profile(), cached_before);
    assert!(!store.is_saving());

    assert_eq!(events.recv().await.unwrap(), StoreEvent::Saving);
    match events.recv().await.unwrap() {
        StoreEvent::SaveFailed(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.message, "Network error, please try again.");
        }
        other => panic!("unexpected event {:?}", other),
    }

    // the edit survives for a manual retry
    api.set_save_reply(Reply::Ok);
    assert_eq!(store.save().await.unwrap(), SaveOutcome::Saved);
    assert_eq!(api.saved.lock().unwrap()[0].weight, 70.0);
}

#[tokio::test]
async fn test_rejected_save_surfaces_server_message() {
    let api = Arc::new(MockApi::new(sample_profile()));
    api.set_save_reply(Reply::Rejected(422, Some("Phone number is invalid")));
    let store = store_with(api, patient_session());

    let err = store.save().await.unwrap_err();
    assert_eq!(err.user_message(), "Phone number is invalid");
}

#[tokio::test(start_paused = true)]
async fn test_second_save_while_pending_is_ignored() {
    let api = Arc::new(MockApi::new(sample_profile()).with_delay(Duration::from_millis(500)));
    let store = store_with(api.clone(), patient_session());

    let (first, second) = tokio::join!(store.save(), async {
        tokio::task::yield_now().await;
        assert!(store.is_saving());
        store.save().await
    });

    assert_eq!(first.unwrap(), SaveOutcome::Saved);
    assert_eq!(second.unwrap(), SaveOutcome::Ignored);
    assert_eq!(api.saves(), 1);
    assert!(!store.is_saving());
}

#[tokio::test]
async fn test_profile_picture_rides_along_with_save() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let store = store_with(api.clone(), patient_session());
    store.load().await.unwrap();

    store.set_profile_picture_bytes(b"GIF89a", "image/gif").unwrap();
    store.save().await.unwrap();

    let saved = api.saved.lock().unwrap().clone();
    assert_eq!(saved[0].profile_picture, "data:image/gif;base64,R0lGODlh");
}

#[tokio::test]
async fn test_logout_clears_session_and_next_mount_redirects() {
    let api = Arc::new(MockApi::new(sample_profile()));
    let session = patient_session();
    let store = store_with(api.clone(), session.clone());
    store.mount().await;

    assert_eq!(store.logout(), "/auth/login/patient");
    assert!(session.cached_profile().is_none());

    let again = store_with(api.clone(), session);
    assert!(!again.mount().await.is_allowed());
    assert_eq!(api.fetches(), 1);
}
