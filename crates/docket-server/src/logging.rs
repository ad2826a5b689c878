use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;

/// Fan-out point for structured log lines: a live channel plus a bounded
/// ring of recent lines for late subscribers.
#[derive(Clone)]
pub struct LogHub {
    pub tx: broadcast::Sender<String>,
    pub ring: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<String>(256);
        Self {
            tx,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn publish(&self, line: String) {
        let _ = self.tx.send(line.clone());
        let mut ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        ring.push_back(line);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    pub fn recent(&self) -> Vec<String> {
        self.ring
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn layer(&self) -> BroadcastLayer {
        BroadcastLayer { hub: self.clone() }
    }
}

pub struct BroadcastLayer {
    hub: LogHub,
}

struct MessageVisitor<'a> {
    message: &'a mut String,
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.clear();
            use std::fmt::Write;
            let _ = write!(self.message, "{value:?}");
            // Strip surrounding quotes added by Debug on &str
            if self.message.starts_with('"') && self.message.ends_with('"') && self.message.len() >= 2 {
                *self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }
}

/// Map an event target to the category shown in the log stream.
pub fn category_for(target: &str) -> &'static str {
    if target.contains("document") {
        "pdf"
    } else if target.starts_with("docket_agent")
        || target.contains("llm")
        || target.contains("analysis")
    {
        "llm"
    } else if target.contains("session") {
        "session"
    } else {
        "system"
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::ERROR => "err",
            tracing::Level::WARN => "warn",
            tracing::Level::INFO => "info",
            tracing::Level::DEBUG => "debug",
            tracing::Level::TRACE => return,
        };

        let mut message = String::new();
        event.record(&mut MessageVisitor {
            message: &mut message,
        });

        let json = serde_json::json!({
            "ts": chrono::Utc::now().timestamp(),
            "level": level,
            "message": message,
            "category": category_for(event.metadata().target()),
        })
        .to_string();

        self.hub.publish(json);
    }
}
