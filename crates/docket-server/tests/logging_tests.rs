use docket_server::logging::{category_for, LogHub};
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn targets_map_to_categories() {
    assert_eq!(category_for("docket_core::document"), "pdf");
    assert_eq!(category_for("docket_agent::gemini"), "llm");
    assert_eq!(category_for("docket_core::analysis"), "llm");
    assert_eq!(category_for("docket_core::llm"), "llm");
    assert_eq!(category_for("docket_core::session"), "session");
    assert_eq!(category_for("tower_http::trace::on_response"), "system");
}

#[test]
fn ring_keeps_only_the_newest_lines() {
    let hub = LogHub::new(3);
    for i in 0..5 {
        hub.publish(format!("line {i}"));
    }
    assert_eq!(hub.recent(), ["line 2", "line 3", "line 4"]);
}

#[test]
fn events_become_json_lines() {
    let hub = LogHub::new(10);
    let mut rx = hub.tx.subscribe();
    let subscriber = tracing_subscriber::registry().with(hub.layer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!(target: "docket_core::document", pages = 3, "pdf has no extractable text");
        tracing::trace!("ignored");
    });

    let recent = hub.recent();
    assert_eq!(recent.len(), 1);
    let v: Value = serde_json::from_str(&recent[0]).unwrap();
    assert_eq!(v["level"], "warn");
    assert_eq!(v["category"], "pdf");
    assert_eq!(v["message"], "pdf has no extractable text");
    assert_eq!(rx.try_recv().unwrap(), recent[0]);
}
