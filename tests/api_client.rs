//! Response classification of the raw client against a mock JIRA.

use jira_rest::api::{ApiError, Auth, RawClient};
use jira_rest::JiraClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn raw_client(server: &MockServer) -> RawClient {
    RawClient::new(&server.uri())
        .unwrap()
        .with_auth(Auth::new("bot", "secret"))
}

fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json")
}

#[tokio::test]
async fn test_get_sends_basic_auth_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .and(query_param("fields", "summary"))
        .and(header("authorization", "Basic Ym90OnNlY3JldA=="))
        .respond_with(json_response(200, json!({"id": "10001", "key": "PRJ-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let value = raw_client(&server)
        .get("issue/PRJ-1", &[("fields", "summary".to_string())])
        .await
        .unwrap();
    assert_eq!(value["key"], "PRJ-1");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/latest/search"))
        .and(body_json(json!({"jql": "project = PRJ"})))
        .respond_with(json_response(200, json!({"issues": []})))
        .expect(1)
        .mount(&server)
        .await;

    let value = raw_client(&server)
        .post("search", &json!({"jql": "project = PRJ"}))
        .await
        .unwrap();
    assert_eq!(value["issues"], json!([]));
}

#[tokio::test]
async fn test_custom_api_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .respond_with(json_response(200, json!({"name": "bot"})))
        .mount(&server)
        .await;

    let client = raw_client(&server).with_api_prefix("/rest/api/2");
    assert_eq!(client.get("myself", &[]).await.unwrap()["name"], "bot");
}

#[tokio::test]
async fn test_empty_success_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/latest/issue/PRJ-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let value = raw_client(&server)
        .put("issue/PRJ-1", &json!({"update": {}}))
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_html_401_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_raw("<html>login</html>", "text/html"))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    match err {
        ApiError::Unauthorized { login, url } => {
            assert_eq!(login, "bot");
            assert!(url.ends_with("/rest/api/latest/myself"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_html_403_is_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_raw("<html>captcha</html>", "text/html"))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden { .. }));
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn test_json_401_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(json_response(
            401,
            json!({"errorMessages": ["You are not authenticated"], "errors": {}}),
        ))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_non_json_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_raw("Bad gateway", "text/plain"))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    match err {
        ApiError::Http { status, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(body, "Bad gateway");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_messages_in_success_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(json_response(
            200,
            json!({"errorMessages": ["first", "second"]}),
        ))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Jira REST API call error: first; second"
    );
}

#[tokio::test]
async fn test_json_400_keeps_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(json_response(
            400,
            json!({"errorMessages": [], "errors": {"summary": "Summary is required"}}),
        ))
        .mount(&server)
        .await;

    let err = raw_client(&server)
        .post("issue", &json!({"fields": {}}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.api_response().unwrap()["errors"]["summary"],
        "Summary is required"
    );
}

#[tokio::test]
async fn test_broken_json_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{oops", "application/json"))
        .mount(&server)
        .await;

    let err = raw_client(&server).get("myself", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidJson { .. }));
}

#[tokio::test]
async fn test_raw_body_of_non_json_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/attachment/content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("plain text", "text/plain"))
        .mount(&server)
        .await;

    let client = raw_client(&server);
    assert_eq!(
        client.get_raw("attachment/content", &[]).await.unwrap(),
        "plain text"
    );
    assert!(matches!(
        client.get("attachment/content", &[]).await.unwrap_err(),
        ApiError::NonJson
    ));
}

#[tokio::test]
async fn test_catalog_is_cached_per_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/latest/priority"))
        .respond_with(json_response(
            200,
            json!([{"id": "1", "name": "Blocker"}, {"id": "3", "name": "Major"}]),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = JiraClient::with_credentials(&server.uri(), "bot", "secret").unwrap();
    let major = client
        .priority()
        .search_by_name("major", false, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(major.id, 3);

    // Served from the cache filled by the listing.
    assert_eq!(client.priority().get(1, false).await.unwrap().name, "Blocker");
    assert!(client
        .priority()
        .search_by_name("major", true, false)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_stalled_body_is_a_timeout() {
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Headers arrive at once, the body never completes.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n{\"id\":",
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = RawClient::new(&format!("http://{}", addr))
        .unwrap()
        .with_timeout(Duration::from_millis(300));
    let err = client.get("myself", &[]).await.unwrap_err();
    assert!(
        matches!(err, ApiError::Timeout { .. }),
        "unexpected error: {:?}",
        err
    );
}
