//! HTTP-level tests for the skyhook API.
//!
//! The router is built over harmless capabilities: no device is attached,
//! the radio build stub fails fast, and the dump store lives in a temp
//! directory. Everything observable over HTTP (status shape, Busy answers,
//! traversal rejection) is exercised end to end.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use serde_json::Value;

use skyhook_core::{
    ConnectionState, DumpStore, Mode, ModeController, NoCloudSync, NullIndicators, Orchestrator,
    SkyhookConfig, SystemSerialOpener, UnavailableRadio, WorkerTimings,
};
use skyhook_server::state::AppState;

struct Harness {
    server: TestServer,
    controller: Arc<ModeController>,
    dumps: Arc<DumpStore>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SkyhookConfig::default();
    config.dump.directory = dir.path().to_path_buf();
    let config = Arc::new(config);

    let controller = Arc::new(ModeController::new(ConnectionState::absent(
        config.serial.port.clone(),
        config.serial.baud,
    )));
    let dumps = Arc::new(DumpStore::new(dir.path()));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&controller),
        Arc::new(SystemSerialOpener),
        Arc::new(UnavailableRadio),
        Arc::new(NoCloudSync),
        Arc::clone(&dumps),
        WorkerTimings {
            silence_threshold: config.silence_threshold(),
            read_timeout: config.read_timeout(),
            pairing_window: config.pairing_window(),
        },
    ));

    let state = AppState {
        config,
        controller: Arc::clone(&controller),
        orchestrator,
        dumps: Arc::clone(&dumps),
        indicators: Arc::new(NullIndicators),
    };

    Harness {
        server: TestServer::new(skyhook_server::create_router(state)).unwrap(),
        controller,
        dumps,
        _dir: dir,
    }
}

#[tokio::test]
async fn health_reports_ok_and_mode() {
    let h = harness();
    let res = h.server.get("/health").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "IDLE");
}

#[tokio::test]
async fn status_reports_idle_and_disconnected() {
    let h = harness();
    let res = h.server.get("/api/status").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["mode"], "IDLE");
    assert_eq!(body["device_connected"], false);
    assert_eq!(body["port"], "/dev/ttyACM0");
    assert_eq!(body["buttons"]["dump"], false);
    assert_eq!(body["latest_dump"], Value::Null);
}

#[tokio::test]
async fn dump_trigger_without_device_is_failed_dependency() {
    let h = harness();
    let res = h.server.post("/api/action/dump").await;
    assert_eq!(res.status_code().as_u16(), 424);
    let body = res.json::<Value>();
    assert_eq!(body["error"], "DEVICE_NOT_CONNECTED");
    // The failed trigger must not have taken the mode.
    assert_eq!(h.controller.mode(), Mode::Idle);
}

#[tokio::test]
async fn dump_trigger_while_pairing_is_busy_and_mode_unchanged() {
    let h = harness();
    h.controller.try_enter(Mode::Pairing).unwrap();

    let res = h.server.post("/api/action/dump").await;
    assert_eq!(res.status_code().as_u16(), 409);
    let body = res.json::<Value>();
    assert_eq!(body["error"], "SYSTEM_BUSY");
    assert_eq!(body["details"]["mode"], "PAIRING");
    assert_eq!(h.controller.mode(), Mode::Pairing);
}

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let h = harness();
    let res = h.server.post("/api/action/reboot").await;
    assert_eq!(res.status_code().as_u16(), 400);
    let body = res.json::<Value>();
    assert_eq!(body["error"], "UNKNOWN_ACTION");
}

#[tokio::test]
async fn dump_list_starts_empty() {
    let h = harness();
    let res = h.server.get("/api/dumps").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn stored_dump_is_listed_and_served() {
    let h = harness();
    let record = h
        .dumps
        .write_capture(
            "# dump\n# Betaflight / STM32F405 (S405) 4.4.0\nset name = skyhook\n",
            Some("Betaflight / STM32F405 (S405) 4.4.0".into()),
            Utc::now(),
        )
        .unwrap();

    let res = h.server.get("/api/dumps").await;
    let body = res.json::<Value>();
    assert_eq!(body["count"], 1);
    assert_eq!(body["dumps"][0]["filename"], record.filename.as_str());

    let res = h.server.get(&format!("/api/dumps/{}", record.filename)).await;
    res.assert_status_ok();
    assert!(res.text().contains("set name = skyhook"));
}

#[tokio::test]
async fn traversal_filename_is_rejected_before_filesystem_access() {
    let h = harness();
    let res = h.server.get("/api/dumps/..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(res.status_code().as_u16(), 400);
    let body = res.json::<Value>();
    assert_eq!(body["error"], "INVALID_FILENAME");
}

#[tokio::test]
async fn missing_dump_is_not_found() {
    let h = harness();
    let res = h.server.get("/api/dumps/dump_19990101-000000.txt").await;
    assert_eq!(res.status_code().as_u16(), 404);
}

#[tokio::test]
async fn hardware_test_passes_through() {
    let h = harness();
    let res = h.server.post("/api/test/hardware/led?action=red").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["component"], "led");
    assert_eq!(body["action"], "red");

    let res = h.server.post("/api/test/hardware/coffee").await;
    assert_eq!(res.status_code().as_u16(), 400);
}

#[tokio::test]
async fn config_view_reflects_startup_values() {
    let h = harness();
    let res = h.server.get("/api/config").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["serial"]["port"], "/dev/ttyACM0");
    assert_eq!(body["serial"]["baud"], 115_200);
    assert_eq!(body["bridge_tcp_port"], 5000);
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let h = harness();
    let res = h.server.get("/api/openapi.json").await;
    res.assert_status_ok();
    let body = res.json::<Value>();
    assert_eq!(body["info"]["title"], "skyhook API");
}
