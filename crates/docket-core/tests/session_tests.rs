use chrono::{Duration, Utc};
use docket_core::{
    session::{is_valid_session_id, new_session_id, SessionStore, NOTHING_ANALYZED, STILL_WORKING},
    types::{Analysis, ChatRole, DocumentInfo, NoticeLevel},
};

fn doc(name: &str) -> DocumentInfo {
    DocumentInfo {
        name: name.into(),
        page_count: 2,
        text_pages: 2,
        char_count: 120,
        sha256: "00".repeat(32),
        truncated: false,
        uploaded_at: Utc::now(),
    }
}

fn analysis(tag: &str) -> Analysis {
    Analysis {
        summary: format!("{tag} summary"),
        risks: format!("{tag} risks"),
        dashboard: format!("{tag} dashboard"),
        model: "stub".into(),
        generated_at: Utc::now(),
    }
}

async fn analyzed_session(store: &SessionStore) -> String {
    let (id, _) = store.resolve(None).await;
    let ticket = store.begin_analysis(&id).await.unwrap();
    store
        .finish_analysis(ticket, doc("lease.pdf"), "lease text".into(), analysis("first"))
        .await;
    id
}

#[test]
fn session_ids_are_128_bit_hex() {
    let id = new_session_id();
    assert!(is_valid_session_id(&id));
    assert_ne!(id, new_session_id());
    assert!(!is_valid_session_id("../../etc"));
    assert!(!is_valid_session_id(""));
}

#[tokio::test]
async fn resolve_creates_then_reuses() {
    let store = SessionStore::new(60);
    let (id, created) = store.resolve(None).await;
    assert!(created);
    let (again, created) = store.resolve(Some(&id)).await;
    assert!(!created);
    assert_eq!(id, again);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn unknown_cookie_gets_a_fresh_session() {
    let store = SessionStore::new(60);
    let stale = new_session_id();
    let (id, created) = store.resolve(Some(&stale)).await;
    assert!(created);
    assert_ne!(id, stale);
}

#[tokio::test]
async fn question_before_analysis_is_refused() {
    let store = SessionStore::new(60);
    let (id, _) = store.resolve(None).await;
    let notice = store.begin_question(&id, "late fee?").await.unwrap_err();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.text, NOTHING_ANALYZED);
}

#[tokio::test]
async fn question_round_trip_builds_transcript() {
    let store = SessionStore::new(60);
    let id = analyzed_session(&store).await;

    let ctx = store.begin_question(&id, "  What is the rent? ").await.unwrap();
    assert_eq!(ctx.document_text, "lease text");
    assert!(ctx.history.is_empty());
    store.finish_question(ctx.ticket, "$1,200 per month.".into()).await;

    let ctx = store.begin_question(&id, "When is it due?").await.unwrap();
    assert_eq!(ctx.history.len(), 2);
    store.finish_question(ctx.ticket, "On the first.".into()).await;

    let session = store.snapshot(&id).await.unwrap();
    let roles: Vec<ChatRole> = session.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
    );
    assert_eq!(session.messages[0].content, "What is the rent?");
    assert!(!session.busy);
}

#[tokio::test]
async fn busy_session_refuses_more_work() {
    let store = SessionStore::new(60);
    let id = analyzed_session(&store).await;

    let ctx = store.begin_question(&id, "first").await.unwrap();
    let notice = store.begin_question(&id, "second").await.unwrap_err();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.text, STILL_WORKING);
    assert!(store.begin_analysis(&id).await.is_err());

    store.finish_question(ctx.ticket, "answer".into()).await;
    assert!(store.begin_analysis(&id).await.is_ok());
}

#[tokio::test]
async fn new_analysis_clears_transcript() {
    let store = SessionStore::new(60);
    let id = analyzed_session(&store).await;
    let ctx = store.begin_question(&id, "q").await.unwrap();
    store.finish_question(ctx.ticket, "a".into()).await;

    let ticket = store.begin_analysis(&id).await.unwrap();
    store
        .finish_analysis(ticket, doc("nda.pdf"), "nda text".into(), analysis("second"))
        .await;

    let session = store.snapshot(&id).await.unwrap();
    assert!(session.messages.is_empty());
    assert_eq!(session.document.unwrap().name, "nda.pdf");
    assert_eq!(session.analysis.unwrap().summary, "second summary");
    assert_eq!(session.notice.unwrap().level, NoticeLevel::Success);
}

#[tokio::test]
async fn abort_keeps_previous_results() {
    let store = SessionStore::new(60);
    let id = analyzed_session(&store).await;
    let ticket = store.begin_analysis(&id).await.unwrap();
    store
        .abort(ticket, docket_core::types::Notice::error("bad pdf"))
        .await;

    let session = store.snapshot(&id).await.unwrap();
    assert!(!session.busy);
    assert_eq!(session.analysis.unwrap().summary, "first summary");
    assert_eq!(session.notice.unwrap().text, "bad pdf");
}

#[tokio::test]
async fn reset_discards_late_results() {
    let store = SessionStore::new(60);
    let (id, _) = store.resolve(None).await;
    let ticket = store.begin_analysis(&id).await.unwrap();

    store.reset(&id).await;
    store
        .finish_analysis(ticket, doc("late.pdf"), "late".into(), analysis("late"))
        .await;

    let session = store.snapshot(&id).await.unwrap();
    assert!(session.analysis.is_none());
    assert!(session.document_text.is_none());
    assert!(!session.busy);
}

#[tokio::test]
async fn render_snapshot_consumes_notice() {
    let store = SessionStore::new(60);
    let id = analyzed_session(&store).await;

    let first = store.take_for_render(&id).await.unwrap();
    assert!(first.notice.is_some());
    let second = store.take_for_render(&id).await.unwrap();
    assert!(second.notice.is_none());
}

#[tokio::test]
async fn prune_drops_idle_but_keeps_busy() {
    let store = SessionStore::new(60);
    let (idle, _) = store.resolve(None).await;
    let (busy, _) = store.resolve(None).await;
    let _ticket = store.begin_analysis(&busy).await.unwrap();

    let removed = store.prune_older_than(Utc::now() + Duration::minutes(1)).await;
    assert_eq!(removed, 1);
    assert!(store.snapshot(&idle).await.is_none());
    assert!(store.snapshot(&busy).await.is_some());
}

#[tokio::test]
async fn prune_keeps_recent_sessions() {
    let store = SessionStore::new(60);
    store.resolve(None).await;
    assert_eq!(store.prune_expired().await, 0);
    assert!(!store.is_empty().await);
}
