use kalenteristatus::components::google_calendar::{EventQuery, GoogleCalendarHandle};
use kalenteristatus::components::identity::{GoogleIdentity, IdentityProvider, SessionState};
use kalenteristatus::components::presence::{CalendarSource, EventFetcher, StatusDescriptor};
use kalenteristatus::config::Config;
use kalenteristatus::error::Error;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> Arc<RwLock<Config>> {
    Arc::new(RwLock::new(Config {
        google_client_id: "test_client_id".to_string(),
        google_client_secret: "test_client_secret".to_string(),
        google_refresh_token: "test_refresh_token".to_string(),
        google_calendar_id: "primary".to_string(),
        slack_token: "xoxp-test".to_string(),
        timezone: "UTC".to_string(),
        poll_interval_secs: 60,
        max_results: 10,
        init_timeout_ms: 1000,
        google_api_base: server.uri(),
        google_token_url: format!("{}/token", server.uri()),
        slack_api_base: server.uri(),
        status: StatusDescriptor::default(),
    }))
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test_refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-access-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_upcoming_sends_fixed_query() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer test-access-token"))
        .and(query_param("timeMin", "2024-03-04T09:00:00Z"))
        .and(query_param("showDeleted", "false"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("maxResults", "10"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "calendar#events",
            "items": [
                {
                    "id": "retro",
                    "status": "confirmed",
                    "summary": "Retro",
                    "start": { "dateTime": "2024-03-04T14:00:00+02:00" },
                    "end": { "dateTime": "2024-03-04T15:00:00+02:00" }
                },
                {
                    "id": "offsite",
                    "start": { "date": "2024-03-05" },
                    "end": { "date": "2024-03-06" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let query = EventQuery::upcoming("primary", "2024-03-04T09:00:00Z".to_string(), 10);
    let events = calendar.list_upcoming(&query).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, "retro");
    assert_eq!(events[0].summary.as_deref(), Some("Retro"));
    assert_eq!(
        events[0].start.date_time.as_deref(),
        Some("2024-03-04T14:00:00+02:00")
    );
    assert_eq!(events[1].start.date.as_deref(), Some("2024-03-05"));

    calendar.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetcher_over_google_handle() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "late",
                    "start": { "dateTime": "2024-03-04T16:00:00Z" },
                    "end": { "dateTime": "2024-03-04T17:00:00Z" }
                },
                {
                    "id": "early",
                    "start": { "dateTime": "2024-03-04T10:00:00Z" },
                    "end": { "dateTime": "2024-03-04T11:00:00Z" }
                },
                {
                    "id": "vacation",
                    "summary": "Out of office",
                    "start": { "date": "2024-03-04" },
                    "end": { "date": "2024-03-09" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let fetcher = EventFetcher::new(Arc::new(calendar.clone()), "primary", 10, chrono_tz::Tz::UTC);
    let events = fetcher.fetch_upcoming(chrono::Utc::now()).await.unwrap();

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["early", "late"]);
}

#[tokio::test]
async fn test_http_error_is_fetch_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let query = EventQuery::upcoming("primary", "2024-03-04T09:00:00Z".to_string(), 10);
    let result = calendar.list_upcoming(&query).await;

    match result {
        Err(Error::Fetch(message)) => assert!(message.contains("401")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_access_token_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-access-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let query = EventQuery::upcoming("primary", "2024-03-04T09:00:00Z".to_string(), 10);
    assert!(calendar.list_upcoming(&query).await.unwrap().is_empty());
    assert!(calendar.list_upcoming(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_identity_sign_in_and_out() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "calendar#calendar",
            "id": "me@example.com",
            "summary": "me@example.com",
            "timeZone": "Europe/Helsinki"
        })))
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let identity = GoogleIdentity::new(calendar, Duration::from_secs(1));
    let mut session_rx = identity.subscribe();
    assert_eq!(identity.session(), SessionState::signed_out());

    identity.init().await.unwrap();
    session_rx.changed().await.unwrap();
    assert_eq!(
        *session_rx.borrow_and_update(),
        SessionState::signed_in("me@example.com")
    );

    identity.sign_out().await;
    session_rx.changed().await.unwrap();
    assert!(!session_rx.borrow().signed_in);
    assert_eq!(session_rx.borrow().user, None);
}

#[tokio::test]
async fn test_identity_init_times_out() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "me@example.com" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let identity = GoogleIdentity::new(calendar, Duration::from_millis(200));

    let result = identity.init().await;
    assert!(matches!(result, Err(Error::Initialization(_))));
    assert_eq!(identity.session(), SessionState::signed_out());
}

#[tokio::test]
async fn test_identity_init_fails_on_bad_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let calendar = GoogleCalendarHandle::new(test_config(&server));
    let identity = GoogleIdentity::new(calendar, Duration::from_secs(1));

    match identity.init().await {
        Err(Error::Initialization(message)) => assert!(message.contains("invalid_grant")),
        other => panic!("expected initialization error, got {:?}", other),
    }
}
