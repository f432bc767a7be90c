//! Issue loading, saving and workflow against a mock JIRA.

use jira_rest::api::ApiError;
use jira_rest::{CreateRequest, Error, Issue, JiraClient};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json")
}

fn client(server: &MockServer) -> JiraClient {
    JiraClient::with_credentials(&server.uri(), "bot", "secret").unwrap()
}

fn issue_payload() -> Value {
    json!({
        "id": "10001",
        "key": "PRJ-1",
        "self": "https://jira.example.com/rest/api/latest/issue/10001",
        "fields": {
            "summary": "Crash on start",
            "labels": ["crash"],
            "status": {"id": "1", "name": "Open"},
            "issuetype": {"id": "1", "name": "Bug"},
            "project": {"id": "100", "key": "PRJ"},
            "assignee": {"name": "alice"},
            "created": "2024-03-01T10:00:00.000+0000"
        }
    })
}

async fn mount_issue(server: &MockServer, expected_loads: u64) {
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .respond_with(json_response(200, issue_payload()))
        .expect(expected_loads)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_issue_loads_once() {
    let server = MockServer::start().await;
    mount_issue(&server, 1).await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    assert_eq!(issue.summary().await.unwrap(), "Crash on start");
    assert_eq!(issue.labels().await.unwrap(), vec!["crash"]);
    assert_eq!(issue.id().await.unwrap(), 10001);
    assert_eq!(
        issue.assignee().await.unwrap().unwrap().name(),
        "alice"
    );
    assert_eq!(issue.to_string(), "[PRJ-1]: Crash on start");
}

#[tokio::test]
async fn test_save_sends_pending_updates_and_reloads() {
    let server = MockServer::start().await;
    mount_issue(&server, 2).await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .and(body_json(json!({
            "update": {
                "summary": [{"set": "Crash on resume"}],
                "labels": [{"add": "regression"}]
            },
            "notifyUsers": false
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.summary().await.unwrap();

    issue
        .set_summary("Crash on resume")
        .add_labels(&["regression"]);
    assert!(issue.has_changes());
    issue.save(&[], false).await.unwrap();
    assert!(!issue.has_changes());

    // The cache is dropped after a save, so this loads again.
    issue.summary().await.unwrap();
}

#[tokio::test]
async fn test_save_without_changes_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.save(&[], true).await.unwrap();
}

#[tokio::test]
async fn test_failed_save_keeps_pending_updates() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .respond_with(json_response(
            400,
            json!({"errorMessages": [], "errors": {"summary": "Field cannot be set"}}),
        ))
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.set_summary("Crash on resume");
    let err = issue.save(&[], true).await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::Api { status: 400, .. })));
    assert_eq!(
        issue.pending_update("summary").unwrap(),
        &[json!({"set": "Crash on resume"})]
    );
}

async fn mount_transitions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1/transitions"))
        .respond_with(json_response(
            200,
            json!({"transitions": [
                {"id": "11", "name": "Start", "to": {"id": "1", "name": "Open"}},
                {"id": "21", "name": "Resolve", "to": {"id": "5", "name": "Resolved"}}
            ]}),
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_step_performs_named_transition() {
    let server = MockServer::start().await;
    mount_issue(&server, 1).await;
    mount_transitions(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/issue/PRJ-1/transitions"))
        .and(body_json(json!({
            "transition": {"id": "21"},
            "update": {"resolution": [{"set": {"id": "1"}}]}
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.set_resolution(1);
    issue.step("Resolve", false, false).await.unwrap();
    assert!(!issue.has_changes());
}

#[tokio::test]
async fn test_step_into_current_status_is_rejected() {
    let server = MockServer::start().await;
    mount_issue(&server, 1).await;
    mount_transitions(&server).await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    let err = issue.step("Start", false, false).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Api(ApiError::AlreadyInStatus { .. })
    ));
}

#[tokio::test]
async fn test_unknown_step_lists_available_ones() {
    let server = MockServer::start().await;
    mount_issue(&server, 1).await;
    mount_transitions(&server).await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.set_summary("kept");
    let err = issue.step("Reopen", false, false).await.unwrap_err();
    match err {
        Error::Api(ApiError::UnknownTransition {
            status, available, ..
        }) => {
            assert_eq!(status, "Open");
            assert_eq!(available, "'Start', 'Resolve'");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(issue.has_changes());
}

#[tokio::test]
async fn test_watchers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1/watchers"))
        .respond_with(json_response(
            200,
            json!({"watchCount": 1, "watchers": [{"name": "alice"}]}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/issue/PRJ-1/watchers"))
        .and(body_json(json!("carol")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/api/latest/issue/PRJ-1/watchers"))
        .and(query_param("username", "alice"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    let watchers = issue.watchers();
    assert!(watchers.has_name("alice").await.unwrap());
    watchers.add(&["carol"]).await.unwrap();
    watchers.remove(&["alice"]).await.unwrap();
    assert!(watchers.has_name("carol").await.unwrap());
    assert!(!watchers.has_name("alice").await.unwrap());
}

async fn mount_create_screen(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issuetype"))
        .respond_with(json_response(
            200,
            json!([{"id": "1", "name": "Bug"}, {"id": "3", "name": "Task"}]),
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/createmeta"))
        .and(query_param("projectKeys", "PRJ"))
        .and(query_param("issuetypeIds", "1"))
        .respond_with(json_response(
            200,
            json!({"projects": [{
                "id": "100",
                "key": "PRJ",
                "issuetypes": [{
                    "id": "1",
                    "name": "Bug",
                    "fields": {
                        "summary": {"name": "Summary", "required": true, "schema": {"type": "string"}},
                        "description": {"name": "Description", "schema": {"type": "string"}},
                        "customfield_10010": {
                            "name": "Severity",
                            "schema": {"type": "string", "custom": "x", "customId": 10010},
                            "allowedValues": [{"value": "High"}, {"value": "Low"}]
                        }
                    }
                }]
            }]}),
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_issue() {
    let server = MockServer::start().await;
    mount_create_screen(&server).await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/issue"))
        .and(body_json(json!({"fields": {
            "project": {"key": "PRJ"},
            "issuetype": {"id": "1"},
            "summary": "Crash on start",
            "description": "Steps to reproduce",
            "customfield_10010": {"value": "High"}
        }})))
        .respond_with(json_response(
            201,
            json!({"id": "10002", "key": "PRJ-2", "self": "https://jira.example.com/rest/api/latest/issue/10002"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut request = CreateRequest::new("PRJ", "Bug", &client).await.unwrap();
    assert_eq!(request.issue_type_id(), 1);
    assert!(request.has_field("Severity"));
    assert!(request.has_field("customfield_10010"));

    request.set_summary("Crash on start");
    request.set_description("  Steps to reproduce ").unwrap();
    request
        .set_field_value("Severity", json!("High"), false)
        .unwrap();

    let mut issue = request.send().await.unwrap();
    assert_eq!(issue.key(), "PRJ-2");
    assert_eq!(issue.id().await.unwrap(), 10002);
}

#[tokio::test]
async fn test_create_rejects_unknown_fields_and_values() {
    let server = MockServer::start().await;
    mount_create_screen(&server).await;

    let client = client(&server);
    let mut request = CreateRequest::new("PRJ", "Bug", &client).await.unwrap();

    let err = request
        .set_field_value("Severity", json!("Blocker"), false)
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownFieldValue { .. }));

    let err = request
        .set_field_value("Story Points", json!(3), false)
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownField { .. }));
    assert!(request
        .set_field_value("Story Points", json!(3), true)
        .is_ok());
}

#[tokio::test]
async fn test_create_with_unknown_issue_type() {
    let server = MockServer::start().await;
    mount_create_screen(&server).await;

    let err = CreateRequest::new("PRJ", "Epic", &client(&server))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownIssueType { .. }));
}

#[tokio::test]
async fn test_new_expand_group_reloads_with_all_groups() {
    let server = MockServer::start().await;
    let mut rendered = issue_payload();
    rendered["renderedFields"] = json!({"description": "<p>Boom</p>"});
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .and(query_param("expand", "renderedFields,names"))
        .respond_with(json_response(200, rendered.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut full = rendered;
    full["changelog"] = json!({"histories": [
        {
            "id": "2",
            "author": {"name": "alice"},
            "created": "2024-03-03T09:00:00.000+0000",
            "items": [{"field": "Key", "fieldtype": "jira", "fromString": "OLD-7", "toString": "PRJ-1"}]
        },
        {
            "id": "1",
            "author": {"name": "bob"},
            "created": "2024-03-02T09:00:00.000+0000",
            "items": [{"field": "status", "fieldtype": "jira", "from": "1", "fromString": "Open", "to": "3", "toString": "In Progress"}]
        }
    ]});
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .and(query_param("expand", "renderedFields,changelog,names"))
        .respond_with(json_response(200, full))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    assert_eq!(
        issue.rendered_field("description").await.unwrap().as_deref(),
        Some("<p>Boom</p>")
    );

    let history = issue.history().await.unwrap();
    let ids: Vec<_> = history.records().iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
    assert_eq!(
        history.last_status_change().unwrap().to_string(),
        "In Progress"
    );

    assert_eq!(issue.previous_keys().await.unwrap(), vec!["OLD-7"]);
    // Both groups stay loaded.
    assert!(issue.rendered_field("description").await.unwrap().is_some());
}

#[tokio::test]
async fn test_safe_transition_drops_fields_missing_on_screen() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1/transitions"))
        .and(query_param("transitionId", "21"))
        .and(query_param("expand", "transitions.fields"))
        .respond_with(json_response(
            200,
            json!({"transitions": [{
                "id": "21",
                "name": "Resolve",
                "to": {"id": "5", "name": "Resolved"},
                "hasScreen": true,
                "fields": {"resolution": {"name": "Resolution", "required": true}}
            }]}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/issue/PRJ-1/transitions"))
        .and(body_json(json!({
            "transition": {"id": "21"},
            "update": {"resolution": [{"set": {"id": "1"}}]}
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.set_resolution(1).set_summary("Not on the screen");
    issue.transition(21, true).await.unwrap();
    assert!(!issue.has_changes());
}

#[tokio::test]
async fn test_safe_transition_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1/transitions"))
        .and(query_param("transitionId", "31"))
        .respond_with(json_response(200, json!({"transitions": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let mut issue = Issue::new("PRJ-1", &client(&server)).unwrap();
    issue.set_resolution(1);
    let err = issue.transition(31, true).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Api(ApiError::TransitionUnavailable { .. })
    ));
    assert!(issue.has_changes());
}
