//! Panic reporting around caught handler panics.
//!
//! Kept in its own test binary: the process-wide panic hook is replaced here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::Request;

use resource_router::config::RouterConfig;

mod common;

#[test]
fn test_caught_handler_panic_is_not_reported_by_previous_hook() {
    let reported = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reported);
    std::panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let app = common::test_app(RouterConfig::default());
    let (parts, _) = Request::builder()
        .uri("/users/1/crash")
        .body(())
        .unwrap()
        .into_parts();
    let reply = app.dispatcher.dispatch(parts, Bytes::new());
    assert_eq!(reply.status, 500);
    assert_eq!(reported.load(Ordering::SeqCst), 0);

    app.error_log.write_pending();
    let lines = app.internal_lines.take();
    assert!(lines[0].contains("\"handler crashed\""), "{}", lines[0]);

    // Panics outside a handler still reach the previous hook.
    let outcome = std::panic::catch_unwind(|| panic!("outside the router"));
    assert!(outcome.is_err());
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}
