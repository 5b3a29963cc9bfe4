//! 웹 모듈 - 질문 폼
//!
//! 서버에서 렌더링하는 단일 HTML 페이지입니다.
//! `POST /`의 `action`이 `cancel`이면 진행 중인 요청을 취소합니다.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::service::QueryService;

const PAGE_TITLE: &str = "Ask your Datascience wizard 🧙";
const INPUT_LABEL: &str = "Ask a question to the PDF";
const LOADING_TEXT: &str = "Waiting for the answer... 🔎";

// ============================================================================
// State
// ============================================================================

/// 진행 중인 요청 (요청 ID + 취소 토큰)
type InFlight = Option<(Uuid, CancellationToken)>;

/// 라우터 공유 상태
#[derive(Clone)]
pub struct AppState {
    service: Arc<QueryService>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl AppState {
    pub fn new(service: Arc<QueryService>) -> Self {
        Self {
            service,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 새 요청 등록. 이전 요청이 남아 있으면 취소합니다.
    fn begin(&self) -> (Uuid, CancellationToken) {
        let request_id = Uuid::new_v4();
        let token = CancellationToken::new();
        if let Some((previous, stale)) = self.in_flight().replace((request_id, token.clone())) {
            tracing::info!(%previous, "superseded by a new question");
            stale.cancel();
        }
        (request_id, token)
    }

    /// 요청 종료. 다른 요청으로 교체됐으면 건드리지 않습니다.
    fn finish(&self, request_id: Uuid) {
        let mut guard = self.in_flight();
        if guard.as_ref().is_some_and(|(id, _)| *id == request_id) {
            *guard = None;
        }
    }

    /// 진행 중인 요청 취소
    fn cancel(&self) -> bool {
        match self.in_flight().take() {
            Some((request_id, token)) => {
                tracing::info!(%request_id, "request cancelled by user");
                token.cancel();
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// 폼 제출 본문
#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub action: Option<String>,
}

/// 라우터 생성
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit))
        .route("/healthz", get(healthz))
        .with_state(AppState::new(service))
}

/// 바인드 주소에서 서버 실행
pub async fn serve(service: Arc<QueryService>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("{} 바인드 실패", bind))?;

    let local = listener.local_addr()?;
    tracing::info!("Serving on http://{}", local);
    println!("[OK] 웹 폼: http://{}", local);

    axum::serve(listener, router(service))
        .await
        .context("웹 서버 실행 실패")?;
    Ok(())
}

async fn show_form() -> Html<String> {
    Html(render_page("", None))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn submit(State(state): State<AppState>, Form(form): Form<AskForm>) -> Response {
    if form.action.as_deref() == Some("cancel") {
        state.cancel();
        return Html(render_page(&form.question, None)).into_response();
    }

    if form.question.is_empty() {
        return Html(render_page("", None)).into_response();
    }

    let (request_id, token) = state.begin();
    let span = tracing::info_span!("ask", %request_id);
    let result = state
        .service
        .answer(&form.question, &token)
        .instrument(span)
        .await;
    state.finish(request_id);

    match result {
        Ok(answer) => Html(render_page(&form.question, Some(&answer.text))).into_response(),
        Err(Error::Cancelled) => {
            tracing::info!(%request_id, "answer discarded");
            Html(render_page(&form.question, None)).into_response()
        }
        Err(e) => {
            tracing::error!(%request_id, "question failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_error(&form.question, &e)),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// 폼 페이지 렌더링 (답변이 있으면 "Answer:" 섹션 포함)
pub fn render_page(question: &str, answer: Option<&str>) -> String {
    let body = match answer {
        Some(text) => format!(
            "<section id=\"answer\"><h3>Answer:</h3><div class=\"answer\">{}</div></section>",
            html_escape::encode_text(text)
        ),
        None => String::new(),
    };
    layout(question, &body)
}

/// 에러 페이지 렌더링 (원본 에러 문자열 그대로)
pub fn render_error(question: &str, error: &Error) -> String {
    let body = format!(
        "<section id=\"error\"><pre class=\"error\">{}</pre></section>",
        html_escape::encode_text(&error.to_string())
    );
    layout(question, &body)
}

fn layout(question: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; }}
input[type=text] {{ width: 100%; padding: .5rem; }}
.answer, .error {{ white-space: pre-wrap; }}
.error {{ color: #b00020; }}
</style>
</head>
<body>
<h1>{title}</h1>
<form method="post" action="/">
<label for="question">{label}</label>
<input type="text" id="question" name="question" value="{question}" autofocus>
<button type="submit" name="action" value="ask" onclick="document.getElementById('loading').hidden = false">Submit</button>
<button type="submit" name="action" value="cancel">Cancel</button>
</form>
<p id="loading" hidden>{loading}</p>
{body}
</body>
</html>
"#,
        title = PAGE_TITLE,
        label = INPUT_LABEL,
        loading = LOADING_TEXT,
        question = html_escape::encode_double_quoted_attribute(question),
        body = body,
    )
}

// ============================================================================
// Tests
// ============================================================================
