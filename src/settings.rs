//! Server configuration from environment variables
//!
//! Read once at startup. GROQ_API_KEY is the only required setting; the
//! embedding backend is selected by the presence of COHERE_API_KEY.

use std::path::PathBuf;

const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// 16 MB upload cap.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Groq API key (required).
    pub groq_api_key: String,
    /// Chat model name.
    pub llm_model: String,
    /// Cohere API key; when unset, local candle embeddings are used.
    pub cohere_api_key: Option<String>,
    /// Local embedding model override (Hugging Face model id).
    pub embedding_model: Option<String>,
    /// CORS origins; `*` or empty allows any.
    pub allowed_origins: Vec<String>,
    /// Bind address for the HTTP server.
    pub bind_addr: String,
    /// Directory for transient uploaded PDFs.
    pub upload_dir: PathBuf,
    /// Directory for persisted per-session vector indices.
    pub index_dir: PathBuf,
    /// Run the LLM section-refinement pass during upload.
    pub refine_sections: bool,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Base directory for on-disk artifacts: PAPERLENS_DATA_DIR, else the
/// platform data dir, else the current directory.
fn data_dir() -> PathBuf {
    if let Some(dir) = env_nonempty("PAPERLENS_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|p| p.join("paperlens"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let groq_api_key = env_nonempty("GROQ_API_KEY")
            .ok_or_else(|| "GROQ_API_KEY environment variable is required".to_string())?;

        let allowed_origins = env_nonempty("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = data_dir();

        Ok(Self {
            groq_api_key,
            llm_model: env_nonempty("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            cohere_api_key: env_nonempty("COHERE_API_KEY"),
            embedding_model: env_nonempty("EMBEDDING_MODEL"),
            allowed_origins,
            bind_addr: env_nonempty("PAPERLENS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            upload_dir: env_nonempty("PAPERLENS_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base.join("uploads")),
            index_dir: env_nonempty("PAPERLENS_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base.join("vector_dbs")),
            refine_sections: env_nonempty("REFINE_SECTIONS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }

    /// True when any origin is allowed.
    pub fn allow_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}
