pub mod ai_client;
pub mod analysis;
pub mod chunker;
pub mod embeddings;
pub mod local_embeddings;
pub mod paper;
pub mod rag;
pub mod session;
pub mod settings;
pub mod summary;
pub mod utils;
pub mod vector_index;

pub use ai_client::{ChatModel, GroqClient};
pub use embeddings::{CohereEmbedder, Embedder};
pub use local_embeddings::LocalEmbedder;
pub use session::{SessionStore, UploadProgress};
pub use settings::Config;
pub use vector_index::VectorIndex;
