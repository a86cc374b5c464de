//! paperlens server — HTTP API for single-paper analysis.
//!
//! Thin axum server over the paperlens_lib pipeline: upload a PDF, get
//! its detected topics, then request per-topic summaries, RAG-backed chat
//! answers, and text statistics. State is per-session and memory-resident.
//!
//! Usage:
//!   GROQ_API_KEY=... paperlens-server
//!
//! Or with args:
//!   paperlens-server --bind 0.0.0.0:5000

use axum::{
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use paperlens_lib::analysis::{self, KeywordCount, TopicLength};
use paperlens_lib::chunker::Chunker;
use paperlens_lib::paper::{pdf_extractor, refine, section_parser};
use paperlens_lib::{
    rag, summary, ChatModel, CohereEmbedder, Config, Embedder, GroqClient, LocalEmbedder,
    SessionStore, UploadProgress, VectorIndex,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

// ============================================================================
// AppState
// ============================================================================

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-endpoint request quotas, keyed by session token.
struct RateLimits {
    upload: KeyedLimiter,
    summary: KeyedLimiter,
    chat: KeyedLimiter,
    stats: KeyedLimiter,
}

impl RateLimits {
    fn new() -> Self {
        Self {
            upload: RateLimiter::keyed(per_minute(10)),
            summary: RateLimiter::keyed(per_minute(20)),
            chat: RateLimiter::keyed(per_minute(30)),
            stats: RateLimiter::keyed(per_minute(10)),
        }
    }
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).expect("quota must be nonzero"))
}

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SessionStore>,
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    limits: Arc<RateLimits>,
}

/// Opaque session token, issued as a `sid` cookie on first contact.
#[derive(Clone)]
struct SessionId(String);

// ============================================================================
// Error type
// ============================================================================

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

fn not_found(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::NOT_FOUND, msg.into())
}

/// Log the detailed cause server-side, return a generic message.
fn internal(tag: &str, detail: &str, user_msg: &str) -> AppError {
    eprintln!("[{}] {}", tag, detail);
    AppError(StatusCode::INTERNAL_SERVER_ERROR, user_msg.to_string())
}

fn check_rate(limiter: &KeyedLimiter, session_id: &str) -> Result<(), AppError> {
    limiter.check_key(&session_id.to_string()).map_err(|_| {
        AppError(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please slow down.".to_string(),
        )
    })
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Serialize)]
struct UploadResponse {
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryRequest {
    topic: Option<String>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Serialize)]
struct StatsResponse {
    keywords: Vec<KeywordCount>,
    citations_count: usize,
    citations: Vec<String>,
    topic_distribution: Vec<TopicLength>,
}

// ============================================================================
// Session cookie middleware
// ============================================================================

/// Pull the `sid` cookie out of the request headers.
fn cookie_session_id(headers: &axum::http::HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if let (Some("sid"), Some(value)) = (parts.next(), parts.next()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Attach the session token to the request, issuing a fresh cookie on
/// first contact.
async fn session_middleware(mut req: Request, next: Next) -> Response {
    let (session_id, issued) = match cookie_session_id(req.headers()) {
        Some(sid) => (sid, false),
        None => (uuid::Uuid::new_v4().to_string(), true),
    };

    req.extensions_mut().insert(SessionId(session_id.clone()));
    let mut response = next.run(req).await;

    if issued {
        let cookie = format!("sid={}; Path=/; HttpOnly; SameSite=Lax", session_id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

// ============================================================================
// Handlers
// ============================================================================

/// Werkzeug-style filename sanitization: basename only, conservative
/// character set.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if base.is_empty() || base.chars().all(|c| c == '.' || c == '_') {
        return None;
    }
    Some(base)
}

// POST /upload
async fn upload_handler(
    State(app): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    check_rate(&app.limits.upload, &session_id)?;
    app.store.get_or_create(&session_id);

    let result = process_upload(&app, &session_id, multipart).await;
    app.store.clear_progress(&session_id);
    result.map(|topics| Json(UploadResponse { topics }))
}

async fn process_upload(
    app: &AppState,
    session_id: &str,
    mut multipart: Multipart,
) -> Result<Vec<String>, AppError> {
    // Locate the "file" part
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read upload: {}", e)))?;
        upload = Some((raw_name, bytes.to_vec()));
        break;
    }

    let (raw_name, bytes) = upload.ok_or_else(|| bad_request("No file uploaded"))?;
    let filename = sanitize_filename(&raw_name).ok_or_else(|| bad_request("Invalid filename"))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(bad_request("Only PDF files are allowed"));
    }

    std::fs::create_dir_all(&app.config.upload_dir).map_err(|e| {
        internal(
            "Upload",
            &format!("Failed to create upload dir: {}", e),
            "Failed to process PDF.",
        )
    })?;
    let filepath = app
        .config
        .upload_dir
        .join(format!("{}_{}", session_id, filename));
    std::fs::write(&filepath, &bytes).map_err(|e| {
        internal(
            "Upload",
            &format!("Failed to save upload: {}", e),
            "Failed to process PDF.",
        )
    })?;

    println!(
        "[Upload] Processing PDF: {} for session {}",
        filename,
        &session_id[..8.min(session_id.len())]
    );

    // Step 1: extract text
    app.store
        .set_progress(session_id, UploadProgress::step(1, "Extracting text from PDF..."));
    println!("[Upload] [Step 1/3] Extracting text from PDF...");
    let full_text = match pdf_extractor::extract_text_from_pdf(&filepath) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("[Upload] Extraction failed: {}", e);
            std::fs::remove_file(&filepath).ok();
            return Err(bad_request("Could not extract text from PDF."));
        }
    };
    println!(
        "[Upload] [Step 1/3] Done. Extracted {} characters.",
        full_text.len()
    );

    // Step 2: detect sections (fast regex scan)
    app.store
        .set_progress(session_id, UploadProgress::step(2, "Detecting sections..."));
    println!("[Upload] [Step 2/3] Detecting sections...");
    let mut sections = section_parser::extract_pdf_sections(&full_text);
    println!("[Upload] [Step 2/3] Done. Found {} sections.", sections.len());

    if app.config.refine_sections {
        sections = refine::refine_sections(&sections, app.chat.as_ref()).await;
        println!("[Upload] Refined down to {} sections.", sections.len());
    }

    // Step 3: split content into topics
    app.store
        .set_progress(session_id, UploadProgress::step(3, "Organizing topics..."));
    println!("[Upload] [Step 3/3] Splitting section content...");
    let topics = section_parser::split_sections_with_content(&full_text, &sections);
    let topic_names: Vec<String> = topics.keys().map(String::from).collect();
    println!("[Upload] [Step 3/3] Done. Final topics: {:?}", topic_names);

    app.store.set_paper(session_id, full_text, topics);

    std::fs::remove_file(&filepath).ok();

    Ok(topic_names)
}

// GET /upload-status
async fn upload_status_handler(
    State(app): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Json<UploadProgress> {
    Json(app.store.progress(&session_id))
}

// POST /summary
async fn summary_handler(
    State(app): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    check_rate(&app.limits.summary, &session_id)?;

    let state = app.store.get_or_create(&session_id);
    let topics = state
        .topics
        .ok_or_else(|| bad_request("No paper uploaded yet."))?;

    let topic = req
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| bad_request("Topic is required"))?;

    let content = topics
        .get(topic)
        .ok_or_else(|| not_found(format!("Topic '{}' not found", topic)))?;

    let summary = summary::generate_detailed_summary(content, app.chat.as_ref()).await;
    Ok(Json(SummaryResponse { summary }))
}

// POST /chat
async fn chat_handler(
    State(app): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    check_rate(&app.limits.chat, &session_id)?;

    let state = app.store.get_or_create(&session_id);
    if state.full_text.is_empty() {
        return Err(bad_request("No paper uploaded yet."));
    }

    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| bad_request("Message is required"))?;

    println!(
        "[Chat] Query from session {}: {}",
        &session_id[..8.min(session_id.len())],
        paperlens_lib::utils::safe_truncate(message, 50)
    );

    // Lazy index build on first question. Two racing requests may both
    // build; last write wins (no per-session mutex).
    let index = match state.vector_index {
        Some(index) => index,
        None => {
            let chunks = Chunker::default().split_text(&state.full_text);
            println!("[Chat] Split paper into {} chunks", chunks.len());
            let embeddings = app
                .embedder
                .embed_documents(&chunks)
                .await
                .map_err(|e| internal("Chat", &e, "Failed to process question."))?;
            let index = VectorIndex::build(chunks, embeddings)
                .map_err(|e| internal("Chat", &e, "Failed to process question."))?;
            index
                .save(&app.config.index_dir.join(&session_id))
                .map_err(|e| internal("Chat", &e, "Failed to process question."))?;

            let index = Arc::new(index);
            app.store.set_vector_index(&session_id, index.clone());
            index
        }
    };

    let answer = rag::answer_question(message, &index, app.embedder.as_ref(), app.chat.as_ref())
        .await
        .map_err(|e| internal("Chat", &e, "Failed to process question."))?;

    Ok(Json(ChatResponse { response: answer }))
}

// GET /stats
async fn stats_handler(
    State(app): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<Json<StatsResponse>, AppError> {
    check_rate(&app.limits.stats, &session_id)?;

    let state = app.store.get_or_create(&session_id);
    if state.full_text.is_empty() {
        return Err(bad_request("No paper uploaded"));
    }

    let keywords = analysis::keyword_frequency(&state.full_text, 10);
    let citations = analysis::extract_citations(&state.full_text);
    let topic_distribution = state
        .topics
        .as_ref()
        .map(analysis::topic_distribution)
        .unwrap_or_default();

    Ok(Json(StatsResponse {
        citations_count: citations.len(),
        citations: citations.into_iter().take(10).collect(),
        keywords,
        topic_distribution,
    }))
}

// ============================================================================
// Main
// ============================================================================

fn build_cors(config: &Config) -> CorsLayer {
    if config.allow_any_origin() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[tokio::main]
async fn main() {
    // Parse simple args (no clap to keep the binary small)
    let args: Vec<String> = std::env::args().collect();
    let mut bind_arg: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" if i + 1 < args.len() => {
                bind_arg = Some(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                println!("paperlens-server — AI research paper analyzer HTTP API");
                println!();
                println!("Usage: paperlens-server [--bind ADDR:PORT]");
                println!();
                println!("Environment variables:");
                println!("  GROQ_API_KEY        Groq API key (required)");
                println!("  LLM_MODEL           Chat model (default: llama-3.3-70b-versatile)");
                println!("  COHERE_API_KEY      Use Cohere embeddings instead of local model");
                println!("  EMBEDDING_MODEL     Local embedding model id");
                println!("  ALLOWED_ORIGINS     Comma-separated CORS origins (default: *)");
                println!("  PAPERLENS_BIND      Bind address (default: 127.0.0.1:5000)");
                println!("  PAPERLENS_DATA_DIR  Base directory for uploads and indices");
                println!("  REFINE_SECTIONS     Run LLM section refinement on upload");
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[Server] Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = bind_arg {
        config.bind_addr = bind.to_string();
    }

    println!("[Server] Starting AI research paper analyzer...");
    println!("[Server] Chat model: {}", config.llm_model);

    let chat: Arc<dyn ChatModel> = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.llm_model.clone(),
    ));

    let embedder: Arc<dyn Embedder> = if let Some(key) = config.cohere_api_key.clone() {
        println!("[Server] Using Cohere cloud embeddings");
        Arc::new(CohereEmbedder::new(key))
    } else {
        println!("[Server] COHERE_API_KEY not set, loading local embedding model...");
        match LocalEmbedder::new(config.embedding_model.as_deref()) {
            Ok(local) => Arc::new(local),
            Err(e) => {
                eprintln!("[Server] Failed to load local embedding model: {}", e);
                std::process::exit(1);
            }
        }
    };

    let cors = build_cors(&config);
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(SessionStore::new()),
        chat,
        embedder,
        limits: Arc::new(RateLimits::new()),
    };

    let app = Router::new()
        .route("/upload", post(upload_handler))
        .route("/upload-status", get(upload_status_handler))
        .route("/summary", post(summary_handler))
        .route("/chat", post(chat_handler))
        .route("/stats", get(stats_handler))
        .layer(middleware::from_fn(session_middleware))
        .layer(cors)
        .layer(DefaultBodyLimit::max(paperlens_lib::settings::MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(
            paperlens_lib::settings::MAX_UPLOAD_BYTES,
        ))
        .with_state(state.clone());

    let bind_addr = state.config.bind_addr.clone();
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("[Server] Failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    println!("[Server] Listening on {}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("[Server] Server error: {}", e);
        std::process::exit(1);
    }
}
