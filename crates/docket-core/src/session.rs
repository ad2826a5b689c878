use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::types::{Analysis, ChatMessage, DocumentInfo, Notice};

pub const NOTHING_ANALYZED: &str =
    "Upload your document and click 'Analyze Document' to see the results.";
pub const STILL_WORKING: &str =
    "The assistant is still working on your previous request. Please wait for it to finish.";

/// Per-browser state. Lives in memory only.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub document: Option<DocumentInfo>,
    #[serde(skip)]
    pub document_text: Option<String>,
    pub analysis: Option<Analysis>,
    pub messages: Vec<ChatMessage>,
    pub notice: Option<Notice>,
    /// A completion is in flight for this session.
    pub busy: bool,
    pub last_seen: DateTime<Utc>,
    /// Bumped on reset so late results from before the reset are dropped.
    #[serde(skip)]
    generation: u64,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            document: None,
            document_text: None,
            analysis: None,
            messages: Vec::new(),
            notice: None,
            busy: false,
            last_seen: Utc::now(),
            generation: 0,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some() && self.document_text.is_some()
    }
}

/// Proof that a session was marked busy; hand it back to finish the work.
#[derive(Debug, Clone)]
#[must_use]
pub struct Ticket {
    session_id: String,
    generation: u64,
}

/// What a Q&A call needs, captured when the question is accepted.
#[derive(Debug)]
pub struct QuestionContext {
    pub ticket: Ticket,
    pub document_text: String,
    /// Transcript before the new question.
    pub history: Vec<ChatMessage>,
}

/// Issue a random 128-bit session id as lowercase hex.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// In-memory session table keyed by session id.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_age: Duration::minutes(max_age_minutes.max(1)),
        }
    }

    /// Return the id of a live session for `cookie`, creating one if the
    /// cookie is missing or unknown. The bool is true when a new session
    /// was created.
    pub async fn resolve(&self, cookie: Option<&str>) -> (String, bool) {
        let mut sessions = self.sessions.lock().await;
        if let Some(id) = cookie.filter(|id| is_valid_session_id(id)) {
            if let Some(session) = sessions.get_mut(id) {
                session.last_seen = Utc::now();
                return (id.to_string(), false);
            }
        }
        let id = new_session_id();
        sessions.insert(id.clone(), Session::new(id.clone()));
        debug!(session = %id, "session created");
        (id, true)
    }

    pub async fn snapshot(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Snapshot for rendering; the one-shot notice is consumed.
    pub async fn take_for_render(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(id)?;
        let snapshot = session.clone();
        session.notice = None;
        Some(snapshot)
    }

    pub async fn set_notice(&self, id: &str, notice: Notice) {
        if let Some(session) = self.sessions.lock().await.get_mut(id) {
            session.notice = Some(notice);
        }
    }

    /// Mark the session busy for a new analysis.
    pub async fn begin_analysis(&self, id: &str) -> Result<Ticket, Notice> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| Notice::error("Your session has expired. Please reload the page."))?;
        if session.busy {
            return Err(Notice::warning(STILL_WORKING));
        }
        session.busy = true;
        session.last_seen = Utc::now();
        Ok(Ticket {
            session_id: id.to_string(),
            generation: session.generation,
        })
    }

    /// Store a finished analysis. Replaces any previous document and clears
    /// the chat transcript.
    pub async fn finish_analysis(
        &self,
        ticket: Ticket,
        document: DocumentInfo,
        text: String,
        analysis: Analysis,
    ) {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = live(&mut sessions, &ticket) else {
            return;
        };
        info!(session = %ticket.session_id, document = %document.name, "analysis stored");
        session.document = Some(document);
        session.document_text = Some(text);
        session.analysis = Some(analysis);
        session.messages.clear();
        session.notice = Some(Notice::success("Analysis Complete!"));
        session.busy = false;
        session.last_seen = Utc::now();
    }

    /// Release a ticket without storing results, showing `notice` instead.
    pub async fn abort(&self, ticket: Ticket, notice: Notice) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = live(&mut sessions, &ticket) {
            session.notice = Some(notice);
            session.busy = false;
        }
    }

    /// Accept a question: record it in the transcript and mark the session
    /// busy. Refused until an analysis exists or while another call runs.
    pub async fn begin_question(&self, id: &str, question: &str) -> Result<QuestionContext, Notice> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| Notice::error("Your session has expired. Please reload the page."))?;
        let Some(document_text) = session.document_text.clone().filter(|_| session.analysis.is_some())
        else {
            return Err(Notice::info(NOTHING_ANALYZED));
        };
        if session.busy {
            return Err(Notice::warning(STILL_WORKING));
        }

        let history = session.messages.clone();
        session.messages.push(ChatMessage::user(question.trim()));
        session.busy = true;
        session.last_seen = Utc::now();

        Ok(QuestionContext {
            ticket: Ticket {
                session_id: id.to_string(),
                generation: session.generation,
            },
            document_text,
            history,
        })
    }

    pub async fn finish_question(&self, ticket: Ticket, answer: String) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = live(&mut sessions, &ticket) {
            session.messages.push(ChatMessage::assistant(answer));
            session.busy = false;
            session.last_seen = Utc::now();
        }
    }

    /// Forget the document, analysis and transcript. In-flight work is
    /// discarded when it completes.
    pub async fn reset(&self, id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(id) {
            let generation = session.generation + 1;
            *session = Session::new(id.to_string());
            session.generation = generation;
            info!(session = %id, "session reset");
        }
    }

    /// Drop idle sessions older than the configured max age. Busy sessions
    /// are kept. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        self.prune_older_than(Utc::now() - self.max_age).await
    }

    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.busy || s.last_seen >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "pruned idle sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn live<'a>(sessions: &'a mut HashMap<String, Session>, ticket: &Ticket) -> Option<&'a mut Session> {
    match sessions.get_mut(&ticket.session_id) {
        Some(s) if s.generation == ticket.generation => Some(s),
        _ => {
            debug!(session = %ticket.session_id, "dropping result for reset or expired session");
            None
        },
    }
}
