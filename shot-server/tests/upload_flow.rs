//! End-to-end upload flow through the HTTP router
//!
//! The print chain is replaced by an in-memory recorder; everything else
//! (persistence, rendering, ledger, device bitmap) runs for real inside a
//! temporary work directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Method, Request, StatusCode, header};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shot_printer::{PrintDispatcher, PrintError, PrintResult, PrintStrategy};
use shot_server::api::build_app;
use shot_server::core::Language;
use shot_server::{Config, ServerState};
use tempfile::TempDir;
use tower::ServiceExt;

struct Recorder {
    seen: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl PrintStrategy for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn attempt(&self, image: &Path) -> PrintResult<()> {
        if !image.exists() {
            return Err(PrintError::NotFound(image.to_path_buf()));
        }
        self.seen.lock().push(image.to_path_buf());
        Ok(())
    }
}

struct TestServer {
    _dir: TempDir,
    state: ServerState,
    app: Router,
    printed: Arc<Mutex<Vec<PathBuf>>>,
}

async fn server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_overrides(dir.path(), 0);
    config.font_path = Some("builtin".into());
    config.print_scale = 1;
    config.print_enabled = true;
    config.bean_info_enabled = true;
    config.language = Language::Zh;
    config.max_users = 5;
    config.ledger_capacity = 50;
    config.render_concurrency = 0;

    let printed = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = PrintDispatcher::new(vec![
        Box::new(Recorder { seen: printed.clone() }) as Box<dyn PrintStrategy>,
    ]);
    let state = ServerState::with_dispatcher(&config, dispatcher).await.unwrap();
    let app = build_app(&state).with_state(state.clone());

    TestServer {
        _dir: dir,
        state,
        app,
        printed,
    }
}

fn shot(samples: usize) -> Value {
    let series = |f: fn(f64) -> f64| -> Vec<f64> { (0..samples).map(|i| f(i as f64)).collect() };
    json!({
        "elapsed": series(|i| i * 0.5),
        "pressure": { "pressure": series(|i| (i / 5.0).min(9.0)) },
        "flow": { "flow": series(|i| (i / 10.0).min(2.5)), "by_weight": series(|i| (i / 12.0).min(2.0)) },
        "temperature": { "basket": series(|i| 93.0 - i * 0.02) },
        "profile": {
            "title": "Dialed In Espresso — 94.5g",
            "notes": "埃塞俄比亚耶加雪菲，水洗处理；风味：柑橘、茉莉花、红茶。回甘明显！"
        },
        "meta": { "in": 18, "out": 36.5, "time": 28, "grinder": { "setting": "2.8" } },
        "clock": 1717000000,
        "timestamp": 1717000000
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Wait until the background pipeline has recorded `count` shots
async fn wait_for_ledger(state: &ServerState, count: usize) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while state.ledger.len() < count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("background pipeline did not finish");
}

/// Wait until every task spawned so far has finished
async fn wait_for_tasks(state: &ServerState) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while state.tasks.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("background tasks did not finish");
}

#[tokio::test]
async fn test_json_upload_saves_renders_and_prints() {
    let server = server().await;
    let document = shot(50);

    let (status, body) = send(
        &server.app,
        post_json("/upload?machine_id=DE1-42&plugin_version=1.2.0", &document),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["auto_printed"], true);
    let id = body["id"].as_i64().unwrap();
    let timestamp = body["timestamp"].as_str().unwrap().to_string();
    let filename = format!("shot_{}_{}.json", timestamp, id);
    assert!(body["message"].as_str().unwrap().ends_with(&filename));
    assert!(body.get("upload_type").is_none());

    wait_for_ledger(&server.state, 1).await;
    wait_for_tasks(&server.state).await;

    // Persisted verbatim
    let saved = std::fs::read(server.state.data_path(&filename)).unwrap();
    assert_eq!(saved, serde_json::to_vec(&document).unwrap());

    // Rendered receipt
    let png = server.state.image_path(&filename.replace(".json", ".png"));
    let receipt = image::open(&png).unwrap();
    assert_eq!((receipt.width(), receipt.height()), (1296, 576));

    // One print attempt with the derived device bitmap, removed afterwards
    let printed = server.printed.lock().clone();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].to_string_lossy().ends_with("_print.bmp"));
    assert!(!printed[0].exists());

    let record = server.state.ledger.find(&filename).unwrap();
    assert!(record.image_generated);
    assert_eq!(record.machine_id, "DE1-42");
    assert_eq!(record.plugin_version, "1.2.0");
    assert_eq!(record.profile.as_deref(), Some("Dialed In Espresso — 94.5g"));
    assert_eq!(record.clock.as_deref(), Some("1717000000"));
}

#[tokio::test]
async fn test_print_disabled_skips_dispatch() {
    let server = server().await;
    let (status, _) = send(&server.app, post_json("/api/print", &json!({ "enabled": false }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&server.app, post_json("/upload", &shot(20))).await;
    assert_eq!(body["auto_printed"], false);

    wait_for_ledger(&server.state, 1).await;
    wait_for_tasks(&server.state).await;
    assert!(server.printed.lock().is_empty());
    assert!(server.state.ledger.recent(1)[0].image_generated);
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = server().await;
    let boundary = "----shotform7MA4YWxk";
    let document = serde_json::to_string(&shot(30)).unwrap();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"shot.json\"\r\n\
         Content-Type: application/json\r\n\r\n{doc}\r\n--{b}--\r\n",
        b = boundary,
        doc = document
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upload_type"], "multipart");

    wait_for_ledger(&server.state, 1).await;
    let records = server.state.ledger.recent(1);
    let record = &records[0];
    let saved = std::fs::read_to_string(server.state.data_path(&record.filename)).unwrap();
    assert_eq!(saved, document);
    assert_eq!(record.machine_id, "UNKNOWN");
}

#[tokio::test]
async fn test_rejected_uploads() {
    let server = server().await;

    let invalid = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&server.app, invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let plain = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(&server.app, plain).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let no_file = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=abc")
        .body(Body::from("--abc\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\n1\r\n--abc--\r\n"))
        .unwrap();
    let (status, _) = send(&server.app, no_file).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing persisted, nothing scheduled
    let saved = std::fs::read_dir(&server.state.config.data_dir).unwrap().count();
    assert_eq!(saved, 0);
    assert_eq!(server.state.tasks.in_flight(), 0);
}

#[tokio::test]
async fn test_unrenderable_shot_is_recorded_without_image() {
    let server = server().await;
    let mut document = shot(20);
    document["pressure"]["pressure"] = json!(["bad", 1.0]);

    let (status, body) = send(&server.app, post_json("/upload", &document)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    wait_for_ledger(&server.state, 1).await;
    wait_for_tasks(&server.state).await;
    let records = server.state.ledger.recent(1);
    let record = &records[0];
    assert!(!record.image_generated);
    assert!(server.printed.lock().is_empty());

    let (_, shots) = send(&server.app, get("/api/shots")).await;
    assert_eq!(shots[0]["image_exists"], false);
    assert_eq!(shots[0]["profile"], "Dialed In Espresso — 94.5g");
}

#[tokio::test]
async fn test_settings_and_language() {
    let server = server().await;

    let (_, body) = send(&server.app, get("/api/settings")).await;
    assert_eq!(body, json!({ "bean_info_enabled": true, "print_enabled": true, "max_users": 5 }));

    let (_, body) = send(
        &server.app,
        post_json("/api/settings/beaninfo", &json!({ "enabled": false })),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["bean_info_enabled"], false);
    assert_eq!(body["message"], "豆子信息打印已禁用");
    assert!(!server.state.settings.bean_info_enabled());

    let (_, body) = send(&server.app, post_json("/api/language", &json!({ "language": "en" }))).await;
    assert_eq!(body, json!({ "success": true, "language": "en" }));

    let (_, body) = send(&server.app, post_json("/api/language", &json!({ "language": "fr" }))).await;
    assert_eq!(body["language"], "en");

    let (_, body) = send(&server.app, get("/api/language")).await;
    assert_eq!(body, json!({ "language": "en" }));

    let (_, body) = send(
        &server.app,
        post_json("/api/settings/beaninfo", &json!({ "enabled": true })),
    )
    .await;
    assert_eq!(body["message"], "Bean info printing enabled");
}

#[tokio::test]
async fn test_print_control_actions() {
    let server = server().await;

    let (_, body) = send(&server.app, post_json("/api/print", &json!({ "enabled": false }))).await;
    assert_eq!(
        body,
        json!({ "success": true, "print_enabled": false, "message": "Printing disabled" })
    );

    let (_, body) = send(&server.app, post_json("/api/print", &json!({ "action": "reboot" }))).await;
    assert_eq!(body["message"], "Invalid action");

    let (_, body) = send(&server.app, post_json("/api/print", &json!({ "action": "print_shot" }))).await;
    assert_eq!(body["message"], "No filename provided");

    let (_, body) = send(
        &server.app,
        post_json("/api/print", &json!({ "action": "print_shot", "filename": "shot_missing.json" })),
    )
    .await;
    assert_eq!(body["message"], "Image file not found");

    // Re-print is gated by the same switch as the automatic print
    let (_, upload) = send(&server.app, post_json("/upload", &shot(20))).await;
    wait_for_ledger(&server.state, 1).await;
    wait_for_tasks(&server.state).await;
    assert!(server.printed.lock().is_empty());

    let filename = format!(
        "shot_{}_{}.json",
        upload["timestamp"].as_str().unwrap(),
        upload["id"].as_i64().unwrap()
    );
    let reprint = json!({ "action": "print_shot", "filename": filename });

    let (_, body) = send(&server.app, post_json("/api/print", &reprint)).await;
    assert_eq!(body, json!({ "success": false, "message": "Print failed" }));
    assert!(server.printed.lock().is_empty());
    let bitmap = server.state.image_path(&filename.replace(".json", "_print.bmp"));
    assert!(!bitmap.exists());

    send(&server.app, post_json("/api/print", &json!({ "enabled": true }))).await;
    let (_, body) = send(&server.app, post_json("/api/print", &reprint)).await;
    assert_eq!(body, json!({ "success": true, "message": "Print job sent" }));
    assert_eq!(server.printed.lock().len(), 1);
}

#[tokio::test]
async fn test_requests_wait_for_admission() {
    let server = server().await;
    let max = server.state.admission.max();

    let mut held = Vec::with_capacity(max);
    for _ in 0..max {
        held.push(server.state.admission.acquire().await.unwrap());
    }

    let app = server.app.clone();
    let status = tokio::spawn(async move { send(&app, get("/api/status")).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!status.is_finished(), "request ran without a permit");

    drop(held.pop());
    let (code, body) = tokio::time::timeout(Duration::from_secs(5), status)
        .await
        .expect("request still blocked after a permit was released")
        .unwrap();
    assert_eq!(code, StatusCode::OK);
    // Remaining held permits plus the status request itself
    assert_eq!(body["active_users"], max);
    assert_eq!(server.state.admission.active(), max - 1);
}

#[tokio::test]
async fn test_file_routes() {
    let server = server().await;
    let (_, upload) = send(&server.app, post_json("/upload", &shot(20))).await;
    wait_for_ledger(&server.state, 1).await;
    wait_for_tasks(&server.state).await;

    let stem = format!(
        "shot_{}_{}",
        upload["timestamp"].as_str().unwrap(),
        upload["id"].as_i64().unwrap()
    );

    let response = server
        .app
        .clone()
        .oneshot(get(&format!("/images/{}.png", stem)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let response = server
        .app
        .clone()
        .oneshot(get(&format!("/download/json/{}.json", stem)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );

    for uri in [
        "/images/..%2Fshots_data%2Fx.png",
        "/images/receipt.jpg",
        "/download/json/..%5Csecret.json",
        "/download/json/notes.txt",
    ] {
        let response = server.app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    let response = server
        .app
        .clone()
        .oneshot(get("/images/shot_missing.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_and_health() {
    let server = server().await;

    let (status, body) = send(&server.app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["shot_count"], 0);
    assert_eq!(body["max_users"], 5);
    // The status request itself holds a permit
    assert_eq!(body["active_users"], 1);
    assert!(Path::new(body["data_dir"].as_str().unwrap()).is_absolute());

    let (status, body) = send(&server.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_ledger_keeps_capacity() {
    let server = server().await;
    server.state.settings.set_print_enabled(false);

    for _ in 0..55 {
        let (status, _) = send(&server.app, post_json("/upload", &shot(5))).await;
        assert_eq!(status, StatusCode::OK);
    }
    wait_for_tasks(&server.state).await;

    assert_eq!(server.state.ledger.len(), 50);
    let (_, shots) = send(&server.app, get("/api/shots")).await;
    assert_eq!(shots.as_array().unwrap().len(), 20);

    // Ids never collide, even within one second
    let mut ids: Vec<i64> = server.state.ledger.recent(50).iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}
