mod support;

use chrono::{TimeDelta, Utc};
use practice_agenda::AgendaError;
use practice_agenda::db::AppointmentStatus;
use serde_json::json;
use support::{EVENTS_PATH, OTHER_OWNER, OWNER, TOKEN, TestEnv, event_json, events_page};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_events(env: &TestEnv, items: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .and(query_param("maxResults", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(items)))
        .mount(&env.server)
        .await;
}

#[tokio::test]
async fn sync_inserts_events_with_attendee_details() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    mount_events(
        &env,
        vec![
            event_json("evt-1", "Consulta", Some(("ana@example.com", "Ana Souza"))),
            event_json("evt-2", "Bruno Lima", None),
        ],
    )
    .await;

    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.removed, 0);

    let all = env.all(OWNER).await;
    assert_eq!(all.len(), 2);
    let ana = all
        .iter()
        .find(|a| a.external_event_id.as_deref() == Some("evt-1"))
        .unwrap();
    assert_eq!(ana.client_name, "Ana Souza");
    assert_eq!(ana.client_contact, "ana@example.com");
    assert_eq!(ana.status, AppointmentStatus::Scheduled);
    assert_eq!(ana.standard_price, 150.0);
    assert!(ana.plan.is_none() && ana.charged_price.is_none() && ana.discount.is_none());

    let bruno = all
        .iter()
        .find(|a| a.external_event_id.as_deref() == Some("evt-2"))
        .unwrap();
    assert_eq!(bruno.client_name, "Bruno Lima");
    assert_eq!(bruno.client_contact, "");
}

#[tokio::test]
async fn syncing_twice_does_not_duplicate() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    mount_events(
        &env,
        vec![
            event_json("evt-1", "Ana", None),
            event_json("evt-2", "Bruno", None),
        ],
    )
    .await;

    env.state.sync.sync(OWNER).await.unwrap();
    let first: Vec<_> = env.all(OWNER).await.into_iter().map(|a| a.id).collect();
    env.state.sync.sync(OWNER).await.unwrap();
    let second: Vec<_> = env.all(OWNER).await.into_iter().map(|a| a.id).collect();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn orphans_are_removed_but_local_records_stay() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    let a = env.seed_linked(OWNER, "1", "Ana").await;
    let b = env.seed_linked(OWNER, "2", "Bruno").await;
    let c = env.seed_local(OWNER, "Carla").await;
    mount_events(&env, vec![event_json("1", "Ana", None)]).await;

    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.removed, 1);

    let ids: Vec<_> = env.all(OWNER).await.into_iter().map(|x| x.id).collect();
    assert!(ids.contains(&a.id));
    assert!(!ids.contains(&b.id));
    assert!(ids.contains(&c.id));
}

#[tokio::test]
async fn completed_appointment_survives_sync() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    let done = env.seed_completed(OWNER, "5", "Ana").await;

    // Event still present with a new title: must not reset the record.
    mount_events(&env, vec![event_json("5", "Renamed", None)]).await;
    env.state.sync.sync(OWNER).await.unwrap();
    let after = env.appointments().find_by_id(OWNER, done.id).await.unwrap();
    assert_eq!(after.status, AppointmentStatus::Completed);
    assert_eq!(after.client_name, "Ana");
    assert_eq!(after.plan.as_deref(), Some("consulta_avulsa"));

    // Event gone: must not be orphan-deleted.
    env.server.reset().await;
    mount_events(&env, vec![]).await;
    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!(summary.removed, 0);
    let after = env.appointments().find_by_id(OWNER, done.id).await.unwrap();
    assert_eq!(after.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn empty_fetch_removes_the_only_linked_appointment() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    env.seed_linked(OWNER, "evt-9", "Ana").await;
    mount_events(&env, vec![]).await;

    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!((summary.processed, summary.removed), (0, 1));
    assert!(env.all(OWNER).await.is_empty());
}

#[tokio::test]
async fn events_without_title_or_time_are_skipped() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    let linked = env.seed_linked(OWNER, "all-day", "Ana").await;
    mount_events(
        &env,
        vec![
            json!({"id": "all-day", "summary": "Holiday", "start": {"date": "2026-12-25"}}),
            json!({"id": "untitled", "start": {"dateTime": "2026-12-26T10:00:00Z"}}),
            event_json("ok", "Bruno", None),
        ],
    )
    .await;

    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.removed, 0);

    let all = env.all(OWNER).await;
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|a| a.id == linked.id));
}

#[tokio::test]
async fn fetch_failure_aborts_without_writes() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    let linked = env.seed_linked(OWNER, "evt-1", "Ana").await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
        .expect(1)
        .mount(&env.server)
        .await;

    let err = env.state.sync.sync(OWNER).await.unwrap_err();
    assert!(matches!(err, AgendaError::SyncFailed(_)), "got {err:?}");

    let all = env.all(OWNER).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, linked.id);
}

#[tokio::test]
async fn sync_only_touches_the_calling_owner() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    let foreign = env.seed_linked(OTHER_OWNER, "evt-x", "Zoe").await;
    mount_events(&env, vec![]).await;

    env.state.sync.sync(OWNER).await.unwrap();

    let theirs = env.all(OTHER_OWNER).await;
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].id, foreign.id);
}

#[tokio::test]
async fn event_owned_by_another_owner_is_not_taken_over() {
    let env = TestEnv::start().await;
    env.sign_in(OWNER).await;
    env.seed_linked(OTHER_OWNER, "shared", "Zoe").await;
    mount_events(&env, vec![event_json("shared", "Intruder", None)]).await;

    let summary = env.state.sync.sync(OWNER).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert!(env.all(OWNER).await.is_empty());
    assert_eq!(env.all(OTHER_OWNER).await[0].client_name, "Zoe");
}

#[tokio::test]
async fn expired_token_is_refreshed_once_before_fetch() {
    let env = TestEnv::start().await;
    env.store_credential(
        OWNER,
        "stale-token",
        Some("refresh-1"),
        Utc::now() - TimeDelta::seconds(1),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=client-id"))
        .and(body_string_contains("client_secret=client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(vec![])))
        .expect(1)
        .mount(&env.server)
        .await;

    env.state.sync.sync(OWNER).await.unwrap();

    let stored = env.credential(OWNER).await.unwrap();
    assert_eq!(stored.access_token, "fresh-token");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    assert!(stored.expiry > Utc::now() + TimeDelta::minutes(50));
}

#[tokio::test]
async fn expired_token_without_refresh_fails_before_any_call() {
    let env = TestEnv::start().await;
    env.store_credential(OWNER, "stale", None, Utc::now() - TimeDelta::seconds(1))
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(vec![])))
        .expect(0)
        .mount(&env.server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.server)
        .await;

    let err = env.state.sync.sync(OWNER).await.unwrap_err();
    assert!(matches!(err, AgendaError::CredentialExpired), "got {err:?}");
}

#[tokio::test]
async fn rejected_refresh_surfaces_refresh_error() {
    let env = TestEnv::start().await;
    env.store_credential(OWNER, "stale", Some("revoked"), Utc::now() - TimeDelta::minutes(5))
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(vec![])))
        .expect(0)
        .mount(&env.server)
        .await;

    let err = env.state.sync.sync(OWNER).await.unwrap_err();
    assert!(matches!(err, AgendaError::CredentialRefresh(_)), "got {err:?}");

    let stored = env.credential(OWNER).await.unwrap();
    assert_eq!(stored.access_token, "stale");
}

#[tokio::test]
async fn owner_without_credential_is_told_to_sign_in() {
    let env = TestEnv::start().await;
    let err = env.state.sync.sync(OWNER).await.unwrap_err();
    assert!(matches!(err, AgendaError::CredentialMissing), "got {err:?}");
}

#[tokio::test]
async fn oversized_refresh_lifetime_is_capped() {
    let env = TestEnv::start().await;
    env.store_credential(
        OWNER,
        "stale-token",
        Some("refresh-1"),
        Utc::now() - TimeDelta::seconds(1),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 1_000_000_000_000_000u64,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&env.server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_page(vec![])))
        .expect(1)
        .mount(&env.server)
        .await;

    env.state.sync.sync(OWNER).await.unwrap();

    let stored = env.credential(OWNER).await.unwrap();
    assert_eq!(stored.access_token, "fresh-token");
    assert!(stored.expiry <= Utc::now() + TimeDelta::days(366));
    assert!(stored.expiry > Utc::now() + TimeDelta::days(364));
}
