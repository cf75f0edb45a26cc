use axum::{
    routing::{get, post},
    Router,
    extract::State,
    http::{header, Method},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{AppError, Result};
use crate::api::extract::{Json, Path, Query};
use crate::api::models::{
    AuthRequest, AuthResponse, ExtractRequest, ExtractResponse, ListParams, ListResponse, RecordResponse, SaveRequest,
    StatusResponse, SummarizeRequest, SummarizeResponse, TranslateRequest, TranslateResponse,
};
use crate::scraper;
use crate::store::NewSummary;
use crate::summarize::{self, Language};
use crate::AppState;

const DEFAULT_PAGE_SIZE: u64 = 10;

pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.frontend_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/extract", post(extract_handler))
        .route("/summarize", post(summarize_handler))
        .route("/summarize_english", post(summarize_english_handler))
        .route("/translate", post(translate_handler))
        .route("/save", post(save_handler))
        .route("/summaries/:user_id", get(list_handler))
        .route("/summary/:id", get(get_summary_handler).delete(delete_summary_handler))
        .route("/summary_english/:id", get(get_summary_english_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/signup", post(signup_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn extract_handler(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>> {
    tracing::info!(url = %req.url, "extracting page");
    let start_time = std::time::Instant::now();

    let page = scraper::extract(&state.fetcher, &req.url).await?;

    tracing::info!(url = %page.url, elapsed = ?start_time.elapsed(), "extraction finished");
    Ok(Json(ExtractResponse {
        text: page.text,
        url: page.url,
    }))
}

/// Japanese summary, counted against the daily quota.
async fn summarize_handler(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>> {
    summarize::require_text(&req.text)?;
    state.limiter.try_acquire()?;
    tracing::info!(remaining = state.limiter.remaining(), "summarizing (ja)");

    let summary = summarize::summarize(&state.llm, &req.text, Language::Ja).await?;
    Ok(Json(SummarizeResponse { summary }))
}

async fn summarize_english_handler(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>> {
    tracing::info!("summarizing (en)");
    let summary = summarize::summarize(&state.llm, &req.text, Language::En).await?;
    Ok(Json(SummarizeResponse { summary }))
}

async fn translate_handler(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>> {
    let target: Language = req.target_lang.parse()?;
    tracing::info!(%target, "translating");

    let translated_text = summarize::translate(&state.llm, &req.text, target).await?;
    Ok(Json(TranslateResponse { translated_text }))
}

async fn save_handler(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<StatusResponse>> {
    if req.text.trim().is_empty() || req.summary.trim().is_empty() || req.user_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "text, summary and user_id are required".to_string(),
        ));
    }

    let row = NewSummary {
        original_text: &req.text,
        summary: &req.summary,
        user_id: &req.user_id,
        url: req.url.as_deref().filter(|u| !u.trim().is_empty()),
    };
    state.store.insert(&row).await?;

    tracing::info!(user_id = %req.user_id, "summary saved");
    Ok(Json(StatusResponse::success()))
}

async fn list_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let page = state.store.list(&user_id, skip, limit).await?;
    tracing::debug!(%user_id, returned = page.items.len(), total = page.total, "listed summaries");

    Ok(Json(ListResponse {
        summaries: page.items,
        total: page.total,
        skip,
        limit,
    }))
}

async fn get_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>> {
    let summary = state.store.get(&id).await?;
    Ok(Json(RecordResponse { summary }))
}

/// Re-summarizes the stored source text in English on every call. The stored
/// record keeps its original summary.
async fn get_summary_english_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>> {
    let mut record = state.store.get(&id).await?;
    tracing::info!(%id, "re-summarizing stored text in English");

    record.summary = summarize::summarize(&state.llm, &record.original_text, Language::En).await?;
    Ok(Json(RecordResponse { summary: record }))
}

async fn delete_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    state.store.delete(&id).await?;
    tracing::info!(%id, "summary deleted");

    Ok(Json(StatusResponse {
        status: "success",
        message: Some("Summary deleted".to_string()),
    }))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<AuthResponse>> {
    let data = state.auth.sign_in(&req.email, &req.password).await?;
    tracing::info!(user_id = ?data["user"]["id"].as_str(), "signed in");

    Ok(Json(AuthResponse { message: None, data }))
}

async fn signup_handler(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<AuthResponse>> {
    let signup = state.auth.sign_up(&req.email, &req.password).await?;
    tracing::info!(confirmation_required = signup.confirmation_required, "signed up");

    let message = signup
        .confirmation_required
        .then(|| "Email confirmation required. Please check your inbox.".to_string());
    Ok(Json(AuthResponse { message, data: signup.data }))
}
