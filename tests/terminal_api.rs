use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use bio_terminal::app::{AppState, build_router};
use bio_terminal::config::{Config, LowEndMode};
use bio_terminal::effects::DeviceProfile;
use bio_terminal::logger::{LogLevel, Logger};
use bio_terminal::net::{FetchError, JsonSource};
use bio_terminal::prefs::PreferencesStore;
use bio_terminal::sessions::SessionStore;
use bio_terminal::terminal::TerminalServices;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

struct MockSource;

#[async_trait]
impl JsonSource for MockSource {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        if url.starts_with("https://wttr.in/Oslo") {
            return Ok(json!({
                "current_condition": [{
                    "temp_C": "-4",
                    "FeelsLikeC": "-9",
                    "humidity": "70",
                    "windspeedKmph": "15",
                    "weatherDesc": [{ "value": "Clear" }]
                }],
                "nearest_area": [{ "areaName": [{ "value": "Oslo" }], "country": [{ "value": "Norway" }] }]
            }));
        }
        if url.starts_with("https://api.github.com/users/Piotrunius/repos") {
            return Ok(json!([
                { "name": "bio", "language": "JavaScript", "stargazers_count": 3, "description": "This page" }
            ]));
        }
        Err(FetchError::Status(503))
    }
}

fn router(preferences_path: Option<PathBuf>) -> Router {
    router_on(
        preferences_path,
        DeviceProfile::from_capabilities(2, 0, LowEndMode::Auto),
    )
}

fn router_on(preferences_path: Option<PathBuf>, device: DeviceProfile) -> Router {
    let config = Arc::new(Config {
        preferences_path: preferences_path.clone(),
        widgets_enabled: false,
        ..Config::default()
    });
    let logger = Logger::new("terminal-test".into()).with_min_level(LogLevel::Error);
    let services = TerminalServices::new(
        config.clone(),
        Arc::new(MockSource),
        None,
        device,
        logger.clone(),
    );
    let sessions = SessionStore::new(Arc::new(services), PreferencesStore::new(preferences_path));
    build_router(Arc::new(AppState::new(config, logger, sessions)))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_session(router: &Router) -> String {
    let (status, body) = send(router, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["sessionId"].as_str().unwrap().to_string()
}

async fn open_client_session(router: &Router, client: &str) -> Value {
    let (status, body) = send(
        router,
        Method::POST,
        "/sessions",
        Some(json!({ "clientId": client })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["clientId"], client);
    body
}

async fn execute(router: &Router, session: &str, input: &str) -> Value {
    let (status, body) = send(
        router,
        Method::POST,
        &format!("/sessions/{session}/execute"),
        Some(json!({ "input": input })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn texts(report: &Value) -> Vec<String> {
    report["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["text"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_and_info() {
    let router = router(None);
    let (status, body) = send(&router, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&router, Method::GET, "/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"], "guest@piotrunius.bio:~$");
    let commands: Vec<&str> = body["commands"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(commands.contains(&"help"));
    assert!(!commands.contains(&"hack"));
}

#[tokio::test]
async fn session_flow_navigates_the_filesystem() {
    let router = router(None);
    let session = open_session(&router).await;

    let report = execute(&router, &session, "cd projects").await;
    assert_eq!(report["cwd"], "~/projects");
    assert_eq!(report["prompt"], "guest@piotrunius.bio:~/projects$");
    assert_eq!(report["echo"]["text"], "guest@piotrunius.bio:~$ cd projects");
    assert_eq!(report["echo"]["styleClass"], "prompt");

    let report = execute(&router, &session, "cat README.md").await;
    assert_eq!(texts(&report)[0], "# Projects");

    let report = execute(&router, &session, "cd ..").await;
    assert_eq!(report["cwd"], "~");

    let report = execute(&router, &session, "nope").await;
    assert_eq!(report["lines"].as_array().unwrap().len(), 1);
    assert_eq!(report["lines"][0]["styleClass"], "error");

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/sessions/{session}/history"),
        Some(json!({ "direction": "previous" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["input"], "nope");
}

#[tokio::test]
async fn network_commands_use_the_source() {
    let router = router(None);
    let session = open_session(&router).await;

    let report = execute(&router, &session, "weather Oslo").await;
    assert_eq!(texts(&report)[0], "Weather for Oslo, Norway");

    let report = execute(&router, &session, "repos").await;
    let lines = texts(&report);
    assert_eq!(lines[0], "Repositories of Piotrunius");
    assert!(lines[1].contains("bio"));

    let report = execute(&router, &session, "github").await;
    assert_eq!(texts(&report), vec!["github: status widgets are disabled"]);

    let (_, body) = send(
        &router,
        Method::GET,
        &format!("/sessions/{session}/scrollback?since=0"),
        None,
    )
    .await;
    let entries = body["entries"].as_array().unwrap();
    assert!(entries.iter().any(|entry| entry["text"] == "Fetching weather for Oslo..."));
    assert!(entries.windows(2).all(|pair| pair[0]["seq"].as_u64() < pair[1]["seq"].as_u64()));
}

#[tokio::test]
async fn completion_and_keys() {
    let router = router(None);
    let session = open_session(&router).await;

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/sessions/{session}/complete"),
        Some(json!({ "input": "neo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "kind": "filled", "input": "neofetch " }));

    let keys = [
        "ArrowUp", "ArrowUp", "ArrowDown", "ArrowDown", "ArrowLeft", "ArrowRight",
        "ArrowLeft", "ArrowRight", "b", "a",
    ];
    let mut last = Value::Null;
    for key in keys {
        let (_, body) = send(
            &router,
            Method::POST,
            &format!("/sessions/{session}/keys"),
            Some(json!({ "key": key })),
        )
        .await;
        last = body;
    }
    assert_eq!(last["activated"], true);
    assert_eq!(last["effect"]["type"], "konami");
}

#[tokio::test]
async fn rejects_unknown_sessions_and_bad_bodies() {
    let router = router(None);
    let (status, body) = send(
        &router,
        Method::POST,
        "/sessions/not-a-uuid/execute",
        Some(json!({ "input": "ls" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found");

    let session = open_session(&router).await;
    let uri = format!("/sessions/{session}/execute");
    let (status, _) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/sessions/{session}/execute"),
        Some(json!({ "input": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Field \"input\" must be a string");

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/sessions/{session}/history"),
        Some(json!({ "direction": "sideways" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn preferences_survive_new_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let router = router(Some(path.clone()));

    let body = open_client_session(&router, "browser-1").await;
    let session = body["sessionId"].as_str().unwrap();
    let report = execute(&router, session, "theme light").await;
    assert_eq!(report["effects"][0], json!({ "type": "theme", "theme": "light" }));
    execute(&router, session, "notice dismiss").await;

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["browser-1"]["theme"], "light");
    assert_eq!(stored["browser-1"]["wip-notice-dismissed"], "true");

    let body = open_client_session(&router, "browser-1").await;
    assert_eq!(body["preferences"]["theme"], "light");
    let banner = body["banner"].as_array().unwrap();
    assert!(banner.iter().all(|line| line["styleClass"] != "warning"));
}

#[tokio::test]
async fn clients_do_not_share_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let router = router(Some(dir.path().join("prefs.json")));

    let first = open_client_session(&router, "client-a").await;
    let second = open_client_session(&router, "client-b").await;
    execute(&router, first["sessionId"].as_str().unwrap(), "theme light").await;
    execute(&router, second["sessionId"].as_str().unwrap(), "opacity 0.5").await;

    let (_, body) = send(&router, Method::POST, "/sessions", None).await;
    let client = body["clientId"].as_str().unwrap();
    assert_ne!(client, "client-a");
    let session = body["sessionId"].as_str().unwrap();
    let report = execute(&router, session, "theme").await;
    assert_eq!(texts(&report), vec!["Current theme: dark"]);
    let report = execute(&router, session, "opacity").await;
    assert_eq!(texts(&report), vec!["Terminal opacity: 0.95"]);

    let body = open_client_session(&router, "client-b").await;
    assert_eq!(body["preferences"]["theme"], "dark");
    assert_eq!(body["preferences"]["terminalOpacity"], "0.5");
}

#[tokio::test]
async fn sessions_of_one_client_merge_their_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let router = router(Some(path.clone()));

    let first = open_client_session(&router, "laptop").await;
    let second = open_client_session(&router, "laptop").await;
    execute(&router, first["sessionId"].as_str().unwrap(), "theme light").await;
    execute(&router, second["sessionId"].as_str().unwrap(), "opacity 0.5").await;

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["laptop"]["theme"], "light");
    assert_eq!(stored["laptop"]["terminalOpacity"], "0.5");
}

#[tokio::test]
async fn session_creation_validates_the_client_id() {
    let router = router(None);
    let (status, body) = send(
        &router,
        Method::POST,
        "/sessions",
        Some(json!({ "clientId": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Field \"clientId\" must be a string");

    let (status, body) = send(&router, Method::POST, "/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["clientId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn effects_report_the_device_profile() {
    let router = router(None);
    let (status, body) = send(&router, Method::GET, "/effects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"]["lowEnd"], true);
    assert_eq!(body["animationsEnabled"], false);
    assert_eq!(body["pollIntervalsSeconds"]["discord"], 60);

    let (_, body) = send(&router, Method::GET, "/widgets", None).await;
    assert_eq!(body["enabled"], false);
}

#[tokio::test]
async fn hidden_pages_pause_animations() {
    let router = router_on(
        None,
        DeviceProfile::from_capabilities(8, 0, LowEndMode::Disabled),
    );
    let (_, body) = send(&router, Method::GET, "/effects", None).await;
    assert_eq!(body["visible"], true);
    assert_eq!(body["animationsEnabled"], true);

    let (status, body) = send(&router, Method::GET, "/effects?visible=false", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visible"], false);
    assert_eq!(body["animationsEnabled"], false);
    assert_eq!(body["device"]["lowEnd"], false);
}

#[tokio::test]
async fn info_lists_setup_and_audio() {
    let router = router(None);
    let (_, body) = send(&router, Method::GET, "/info", None).await;
    assert_eq!(body["profile"]["audio"]["src"], "assets/audio.mp3");
    assert!(!body["profile"]["pc"].as_array().unwrap().is_empty());
    assert!(!body["profile"]["gear"].as_array().unwrap().is_empty());
}
