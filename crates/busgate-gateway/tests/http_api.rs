//! End-to-end tests of the HTTP surface against an in-memory bus.

use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use futures::future::join_all;
use serde_json::{json, Value};
use tempfile::TempDir;

use busgate_bus::{BusError, BusRegistry, MockBus};
use busgate_explorer::ExplorerService;
use busgate_gateway::{create_router, GatewayConfig, GatewayState};

const CALCULATOR: &str = r#"<interface name="org.example.Calculator">
    <method name="Add">
      <arg name="a" type="i" direction="in"/>
      <arg name="b" type="i" direction="in"/>
      <arg name="sum" type="i" direction="out"/>
    </method>
    <method name="Reset"/>
    <method name="Explode"/>
    <signal name="Overflow"><arg name="value" type="x"/></signal>
    <property name="Precision" type="u" access="read"/>
  </interface>
  <interface name="org.example.Plain">
    <method name="Noop"/>
  </interface>"#;

const SENSOR: &str = r#"<interface name="org.example.Sensor">
    <property name="Reading" type="d" access="read"/>
  </interface>"#;

struct Harness {
    server: TestServer,
    bus: MockBus,
    _assets: TempDir,
}

fn mock_bus() -> MockBus {
    let mut bus = MockBus::new()
        .with_name("org.example.Zeta")
        .with_object("org.example.Calc", "/org/example/Calc", CALCULATOR)
        .with_property(
            "org.example.Calc",
            "/org/example/Calc",
            "org.example.Calculator",
            "Precision",
            json!(8),
        )
        .with_reply(
            "org.example.Calc",
            "/org/example/Calc",
            "org.example.Calculator",
            "Add",
            |args| {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            },
        )
        .with_reply(
            "org.example.Calc",
            "/org/example/Calc",
            "org.example.Calculator",
            "Reset",
            |_| Ok(Value::Null),
        )
        .with_reply(
            "org.example.Calc",
            "/org/example/Calc",
            "org.example.Calculator",
            "Explode",
            |_| Err(BusError::from_reply("org.example.Error.Boom", "it exploded")),
        )
        .with_object("org.example.Calc", "/org/example/Locked", CALCULATOR)
        .failing_get_all(
            "org.example.Calc",
            "/org/example/Locked",
            "org.example.Calculator",
        );

    for i in 0..6 {
        let path = format!("/org/example/sensors/s{i}");
        bus = bus
            .with_object("org.example.Sensors", &path, SENSOR)
            .with_property(
                "org.example.Sensors",
                &path,
                "org.example.Sensor",
                "Reading",
                json!(f64::from(i) + 0.5),
            );
    }
    bus
}

fn harness_with(config: GatewayConfig) -> Harness {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), "<html>busgate</html>").unwrap();
    std::fs::write(assets.path().join("app.js"), "console.log('busgate');").unwrap();
    std::fs::write(assets.path().join("style.css"), "body {}").unwrap();
    std::fs::write(assets.path().join("blob.dat"), [0u8, 1, 2]).unwrap();

    let bus = mock_bus();
    let registry = BusRegistry::new()
        .with_bus("session", Arc::new(bus.clone()))
        .with_bus("broken", Arc::new(MockBus::new().refusing_connections()));

    let config = GatewayConfig {
        assets_dir: assets.path().to_path_buf(),
        ..config
    };
    let explorer = Arc::new(ExplorerService::new(
        Arc::new(registry),
        config.explorer.clone(),
    ));
    let app = create_router(GatewayState::new(explorer, config));

    Harness {
        server: TestServer::new(app).unwrap(),
        bus,
        _assets: assets,
    }
}

fn harness() -> Harness {
    harness_with(GatewayConfig::default())
}

const CALC_URI: &str = "/bus/session/org.example.Calc/org/example/Calc/org.example.Calculator";

// =============================================================================
// Resource tree
// =============================================================================

#[tokio::test]
async fn lists_buses() {
    let h = harness();
    let response = h.server.get("/bus").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/json; charset=utf-8"
    );
    assert_eq!(
        response.json::<Value>(),
        json!({"status": "ok", "buses": ["broken", "session"]})
    );

    let again = h.server.get("/bus").await;
    assert_eq!(again.text(), response.text());
}

#[tokio::test]
async fn response_keys_are_sorted() {
    let h = harness();
    let text = h.server.get("/bus").await.text();
    assert!(text.find("\"buses\"").unwrap() < text.find("\"status\"").unwrap());
    assert!(text.contains("\n  "));
}

#[tokio::test]
async fn lists_services_sorted() {
    let h = harness();
    let body = h.server.get("/bus/session").await.json::<Value>();
    assert_eq!(
        body["services"],
        json!([
            "org.example.Calc",
            "org.example.Sensors",
            "org.example.Zeta",
            "org.freedesktop.DBus"
        ])
    );
}

#[tokio::test]
async fn lists_objects_sorted() {
    let h = harness();
    let body = h.server.get("/bus/session/org.example.Sensors").await.json::<Value>();
    let objects: Vec<String> = serde_json::from_value(body["objects"].clone()).unwrap();
    assert!(objects.contains(&"/org/example/sensors/s0".to_string()));
    assert!(objects.contains(&"/org/example/sensors/s5".to_string()));
    let mut sorted = objects.clone();
    sorted.sort();
    assert_eq!(objects, sorted);
}

#[tokio::test]
async fn lists_interfaces() {
    let h = harness();
    let body = h
        .server
        .get("/bus/session/org.example.Calc/org/example/Calc")
        .await
        .json::<Value>();
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "interfaces": ["org.example.Calculator", "org.example.Plain"]
        })
    );
}

#[tokio::test]
async fn interface_catalog() {
    let h = harness();
    let body = h.server.get(CALC_URI).await.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["interface"], "org.example.Calculator");
    assert_eq!(body["properties"], json!({"Precision": 8}));
    assert_eq!(body["signals"][0]["name"], "Overflow");
    assert_eq!(body["signals"][0]["args"], json!([{"name": "value", "type": "x"}]));

    let add = &body["methods"][0];
    assert_eq!(add["name"], "Add");
    assert_eq!(add["uri"], format!("{CALC_URI}/Add"));
    assert_eq!(
        add["args"][2],
        json!({"name": "sum", "direction": "out", "type": "i"})
    );
}

#[tokio::test]
async fn catalog_survives_unreadable_properties() {
    let h = harness();
    let response = h
        .server
        .get("/bus/session/org.example.Calc/org/example/Locked/org.example.Calculator")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["properties"], json!({}));
    assert_eq!(body["methods"].as_array().unwrap().len(), 3);
    assert_eq!(body["signals"][0]["name"], "Overflow");
}

#[tokio::test]
async fn reads_property() {
    let h = harness();
    let body = h.server.get(&format!("{CALC_URI}/Precision")).await.json::<Value>();
    assert_eq!(
        body,
        json!({"status": "ok", "property": "Precision", "value": 8})
    );
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn unknown_bus_is_404() {
    let h = harness();
    let response = h.server.get("/bus/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({"status": "error", "error": "bus not found: nope"})
    );
}

#[tokio::test]
async fn unknown_levels_are_404() {
    let h = harness();
    for path in [
        "/bus/session/org.example.Calc/org/missing",
        "/bus/session/org.example.Calc/org/example/Calc/org.example.Missing",
        "/bus/session/org.example.Calc/org/example/Calc/org.example.Plain/Nothing",
        "/bus/session/org.example.Calc/org/example/Calc/org.example.Calculator/Nope",
        "/bus/session/org.example.Calc/org.example.Calculator",
    ] {
        let response = h.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(response.json::<Value>()["status"], "error", "{path}");
    }
}

#[tokio::test]
async fn connection_failure_is_403() {
    let h = harness();
    let response = h.server.get("/bus/broken").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["status"], "error");
}

#[tokio::test]
async fn unsupported_methods_are_404_envelopes() {
    let h = harness();
    for response in [
        h.server.delete("/bus").await,
        h.server.put(CALC_URI).await,
        h.server.post("/").await,
        h.server.post("/res/app.js").await,
        h.server.delete("/health").await,
    ] {
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["status"], "error");
    }
}

#[tokio::test]
async fn unrouted_paths_are_404() {
    let h = harness();
    let response = h.server.get("/nowhere").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({"status": "error", "error": "not found: /nowhere"})
    );
}

// =============================================================================
// Method invocation
// =============================================================================

#[tokio::test]
async fn catalog_uri_round_trip() {
    let h = harness();
    let catalog = h.server.get(CALC_URI).await.json::<Value>();
    let uri = catalog["methods"][0]["uri"].as_str().unwrap().to_string();

    let response = h.server.post(&uri).text("[2, 40]").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"status": "ok", "result": 42}));

    let calls = h.bus.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "Add");
    assert_eq!(calls[0].signature, vec!["i", "i"]);
}

#[tokio::test]
async fn no_return_value_is_null() {
    let h = harness();
    let response = h.server.post(&format!("{CALC_URI}/Reset")).await;
    assert_eq!(response.json::<Value>(), json!({"status": "ok", "result": null}));
}

#[tokio::test]
async fn invocation_failures_are_200() {
    let h = harness();
    for (method, body) in [
        ("Missing", "[]"),
        ("Add", "[1]"),
        ("Add", "[\"one\", 2]"),
        ("Explode", "[]"),
    ] {
        let response = h.server.post(&format!("{CALC_URI}/{method}")).text(body).await;
        assert_eq!(response.status_code(), StatusCode::OK, "{method} {body}");
        let value = response.json::<Value>();
        assert_eq!(value["status"], "error", "{method} {body}");
        assert!(value["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}

#[tokio::test]
async fn remote_error_text_is_reported() {
    let h = harness();
    let value = h
        .server
        .post(&format!("{CALC_URI}/Explode"))
        .await
        .json::<Value>();
    assert!(value["error"].as_str().unwrap().contains("it exploded"));
}

#[tokio::test]
async fn malformed_body_is_403() {
    let h = harness();
    let response = h
        .server
        .post(&format!("{CALC_URI}/Add"))
        .text("{\"a\": 1}")
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["status"], "error");
    assert!(h.bus.calls().is_empty());
}

#[tokio::test]
async fn post_to_unresolvable_path_keeps_status() {
    let h = harness();
    let response = h.server.post("/bus/nope/a.b/x/i.f/M").text("[]").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = h
        .server
        .post("/bus/session/org.example.Calc/org/example/Calc/org.example.Missing/M")
        .text("[]")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = h.server.post("/bus/session").text("[]").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let h = harness_with(GatewayConfig {
        max_body_bytes: 16,
        ..GatewayConfig::default()
    });
    let args = format!("[{}]", vec!["1"; 64].join(","));
    let response = h.server.post(&format!("{CALC_URI}/Add")).text(args).await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/json; charset=utf-8"
    );
    assert_eq!(
        response.json::<Value>(),
        json!({"status": "error", "error": "payload too large"})
    );
    assert!(h.bus.calls().is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn parallel_requests_get_their_own_data() {
    let h = harness();
    let paths: Vec<String> = (0..6)
        .map(|i| {
            format!(
                "/bus/session/org.example.Sensors/org/example/sensors/s{i}/org.example.Sensor/Reading"
            )
        })
        .collect();

    let server = &h.server;
    let responses = join_all(paths.iter().map(|path| async move { server.get(path).await })).await;

    for (i, response) in responses.into_iter().enumerate() {
        let expected = f64::from(u32::try_from(i).unwrap()) + 0.5;
        assert_eq!(response.json::<Value>()["value"], json!(expected));
    }
    assert_eq!(h.bus.open_connections(), 0);
}

// =============================================================================
// Assets and health
// =============================================================================

#[tokio::test]
async fn serves_index() {
    let h = harness();
    let response = h.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), "text/html; charset=utf-8");
    assert_eq!(response.text(), "<html>busgate</html>");
}

#[tokio::test]
async fn serves_named_assets() {
    let h = harness();
    let response = h.server.get("/res/app.js").await;
    assert_eq!(response.header(header::CONTENT_TYPE), "application/javascript");

    let response = h.server.get("/res/style.css").await;
    assert_eq!(response.header(header::CONTENT_TYPE), "text/css");

    let response = h.server.get("/res/blob.dat").await;
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/octet-stream"
    );
    assert_eq!(response.as_bytes().as_ref(), &[0u8, 1, 2]);
}

#[tokio::test]
async fn unknown_or_escaping_assets_are_404() {
    let h = harness();
    for path in ["/res/missing.js", "/res/..%2Fsecret", "/res/.hidden"] {
        let response = h.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(response.json::<Value>()["status"], "error");
    }
}

#[tokio::test]
async fn health_reports_version() {
    let h = harness();
    let body = h.server.get("/health").await.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let h = harness();
    let response = h
        .server
        .get("/bus")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://ui.example"))
        .await;
    assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
}
