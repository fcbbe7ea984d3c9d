//! Live server tests over a real socket.

use std::time::Duration;

use resource_router::config::RouterConfig;
use resource_router::lifecycle::Shutdown;

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_live_requests_and_graceful_shutdown() {
    let mut config = RouterConfig::default();
    config.server.user_id_header = Some("x-user-id".to_string());
    let app = common::test_app(config);
    let shutdown = Shutdown::new();
    let (addr, server) = common::spawn_server(&app, 2, &shutdown).await;
    let client = client();

    let response = client
        .get(format!("http://{addr}/users/12/image_url"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"], "https://img.example/12.png");
    assert!(body["error"].is_null());

    let response = client
        .get(format!("http://{addr}/users/12/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .delete(format!("http://{addr}/users/12"))
        .header("x-user-id", "77")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), r#"{"data":null,"error":"InternalError"}"#);

    drop(client);
    shutdown.trigger();
    server.await.unwrap();

    let lines = app.internal_lines.take();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("127.0.0.1:"), "{}", lines[0]);
    assert!(lines[0].contains(" - 77 ["), "{}", lines[0]);
    assert!(lines[0].contains(r#""DELETE /users/12 HTTP/1.1" 200 37"#), "{}", lines[0]);
    assert_eq!(app.error_log.pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_in_flight_at_shutdown_is_logged() {
    let app = common::test_app(RouterConfig::default());
    let shutdown = Shutdown::new();
    let (addr, server) = common::spawn_server(&app, 2, &shutdown).await;

    let request = tokio::spawn(async move {
        client()
            .get(format!("http://{addr}/users/5/slow"))
            .send()
            .await
            .map(|response| response.status())
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.trigger();

    let status = request.await.unwrap().unwrap();
    assert_eq!(status, 500);
    server.await.unwrap();

    let lines = app.internal_lines.take();
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("\"slow upstream timed out\""), "{}", lines[0]);
    assert_eq!(app.error_log.pending(), 0);
}
