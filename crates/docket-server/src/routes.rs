use std::{convert::Infallible, future::Future, sync::Arc};

use axum::{
    extract::{Form, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json, Response,
    },
};
use docket_core::{
    document,
    export::{ExportFormat, Report},
    session::Ticket,
    types::Notice,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing::{error, info, warn};

use crate::{page, AppState};

pub const SESSION_COOKIE: &str = "docket_session";

// ── Error helper ──────────────────────────────────────────────────────────

pub(crate) fn internal(e: impl std::fmt::Display) -> StatusCode {
    tracing::error!("internal error: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct ChatForm {
    #[serde(default)]
    pub question: String,
}

#[derive(Deserialize)]
pub(crate) struct ExportQuery {
    pub format: Option<String>,
}

// ── Session cookie helpers ────────────────────────────────────────────────

/// Value of the session cookie, if the request carries one.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

fn set_cookie_value(id: &str, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax{secure}"
    ))
    .ok()
}

/// Session id for this request, plus a Set-Cookie value when a new
/// session had to be created.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> (String, Option<HeaderValue>) {
    let cookie = session_cookie(headers);
    let (id, created) = state.sessions.resolve(cookie.as_deref()).await;
    let set_cookie = if created {
        set_cookie_value(&id, state.config.cookie_secure)
    } else {
        None
    };
    (id, set_cookie)
}

fn with_cookie(mut response: Response, set_cookie: Option<HeaderValue>) -> Response {
    if let Some(value) = set_cookie {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

fn see_other(location: &'static str, set_cookie: Option<HeaderValue>) -> Response {
    let response = (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, HeaderValue::from_static(location))],
    )
        .into_response();
    with_cookie(response, set_cookie)
}

/// Run `work` on its own task so a dropped request cannot leave the session
/// busy. If the task dies before handing its ticket back, `fallback` is
/// released with an error notice.
async fn run_detached<F>(state: &AppState, fallback: Ticket, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = tokio::spawn(work).await {
        error!("request worker failed: {e}");
        state
            .sessions
            .abort(
                fallback,
                Notice::error("Something went wrong while processing your request. Please try again."),
            )
            .await;
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (id, set_cookie) = resolve_session(&state, &headers).await;
    let Some(session) = state.sessions.take_for_render(&id).await else {
        return internal("session vanished during render").into_response();
    };
    let ctx = page::PageContext {
        model: state.analyzer.backend_name(),
        max_upload_mb: state.config.max_upload_mb,
    };
    with_cookie(Html(page::render(&session, &ctx)).into_response(), set_cookie)
}

struct Upload {
    name: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, StatusCode> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("multipart error: {e}");
        e.status()
    })? {
        if field.name() != Some("document") {
            continue;
        }
        let name = field.file_name().unwrap_or("document.pdf").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            warn!("upload read error: {e}");
            e.status()
        })?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

pub(crate) async fn analyze(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, StatusCode> {
    let (id, set_cookie) = resolve_session(&state, &headers).await;

    let Some(upload) = read_upload(&mut multipart).await? else {
        state
            .sessions
            .set_notice(&id, Notice::warning("Please upload a document first."))
            .await;
        return Ok(see_other("/", set_cookie));
    };

    let ticket = match state.sessions.begin_analysis(&id).await {
        Ok(t) => t,
        Err(notice) => {
            state.sessions.set_notice(&id, notice).await;
            return Ok(see_other("/", set_cookie));
        },
    };

    info!(session = %id, file = %upload.name, bytes = upload.bytes.len(), "document uploaded");

    let worker = Arc::clone(&state);
    run_detached(&state, ticket.clone(), async move {
        let max_chars = worker.config.max_document_chars;
        let Upload { name, bytes } = upload;
        let extracted =
            tokio::task::spawn_blocking(move || document::extract_text(&bytes, max_chars)).await;

        let doc = match extracted {
            Ok(Ok(doc)) => doc,
            Ok(Err(e)) => {
                worker.sessions.abort(ticket, Notice::error(e.to_string())).await;
                return;
            },
            Err(e) => {
                warn!("pdf extraction task failed: {e}");
                let err = document::ExtractError::Corrupt("extraction aborted".into());
                let notice = Notice::error(err.to_string());
                worker.sessions.abort(ticket, notice).await;
                return;
            },
        };

        let analysis = worker.analyzer.analyze(&doc).await;
        let info = doc.info(&name);
        worker
            .sessions
            .finish_analysis(ticket, info, doc.text, analysis)
            .await;
    })
    .await;

    Ok(see_other("/", set_cookie))
}

pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let (id, set_cookie) = resolve_session(&state, &headers).await;

    let question = form.question.trim().to_string();
    if question.is_empty() {
        return see_other("/#chat", set_cookie);
    }

    let ctx = match state.sessions.begin_question(&id, &question).await {
        Ok(ctx) => ctx,
        Err(notice) => {
            state.sessions.set_notice(&id, notice).await;
            return see_other("/#chat", set_cookie);
        },
    };

    info!(session = %id, question_len = question.len(), "question received");

    let worker = Arc::clone(&state);
    run_detached(&state, ctx.ticket.clone(), async move {
        let answer = worker
            .analyzer
            .answer(&ctx.document_text, &ctx.history, &question)
            .await;
        worker.sessions.finish_question(ctx.ticket, answer).await;
    })
    .await;

    see_other("/#chat", set_cookie)
}

pub(crate) async fn reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (id, set_cookie) = resolve_session(&state, &headers).await;
    state.sessions.reset(&id).await;
    see_other("/", set_cookie)
}

pub(crate) async fn export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ExportQuery>,
) -> Result<Response, StatusCode> {
    let format = match q.format.as_deref() {
        None => ExportFormat::Markdown,
        Some(f) => ExportFormat::parse(f).ok_or(StatusCode::BAD_REQUEST)?,
    };

    let Some(id) = session_cookie(&headers) else {
        return Err(StatusCode::NOT_FOUND);
    };
    let session = state.sessions.snapshot(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let (Some(document), Some(analysis)) = (&session.document, &session.analysis) else {
        return Err(StatusCode::NOT_FOUND);
    };

    let report = Report {
        document,
        analysis,
        messages: &session.messages,
    };
    let disposition = format!("attachment; filename=\"{}\"", report.file_name(format));
    let disposition = HeaderValue::from_str(&disposition).map_err(internal)?;

    info!(session = %id, format = format.extension(), "report exported");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.render(format),
    )
        .into_response())
}

// ── JSON API ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.config.backend,
        "model": state.analyzer.backend_name(),
        "sessions": state.sessions.len().await,
        "uptime_s": state.start_time.elapsed().as_secs(),
    }))
}

pub(crate) async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let id = session_cookie(&headers).ok_or(StatusCode::NOT_FOUND)?;
    let session = state.sessions.snapshot(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let v = serde_json::to_value(&session).map_err(internal)?;
    Ok(Json(v))
}

pub(crate) async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    // Subscribe before snapshotting ring to avoid race
    let live_rx = state.logs.tx.subscribe();
    let history = state.logs.recent();
    tokio::spawn(async move {
        for line in history {
            if tx.send(line).is_err() {
                return;
            }
        }
        let mut live_rx = live_rx;
        loop {
            match live_rx.recv().await {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });
    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}
