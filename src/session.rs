//! In-memory, process-lifetime session state
//!
//! One record per opaque session token: the uploaded paper's full text,
//! its topic map, and the lazily built vector index handle. Entries are
//! created on first access, reset on a new upload, and never evicted —
//! a known scaling limit for this single-process deployment.

use crate::paper::SectionMap;
use crate::vector_index::VectorIndex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-session paper state.
#[derive(Clone, Default)]
pub struct SessionState {
    pub full_text: String,
    pub topics: Option<SectionMap>,
    pub vector_index: Option<Arc<VectorIndex>>,
    pub created_at: i64,
}

/// Upload pipeline progress snapshot, present only while processing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadProgress {
    pub step: u32,
    pub total: u32,
    pub message: String,
}

impl UploadProgress {
    pub fn step(step: u32, message: &str) -> Self {
        Self {
            step,
            total: 3,
            message: message.to_string(),
        }
    }

    /// Snapshot returned when no upload is in flight.
    pub fn idle() -> Self {
        Self {
            step: 0,
            total: 3,
            message: "Waiting...".to_string(),
        }
    }
}

/// Process-wide session map. Lock granularity is the whole map; handlers
/// take short read/write sections and clone what they need out.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
    progress: RwLock<HashMap<String, UploadProgress>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a session's state, creating an empty record on first access.
    pub fn get_or_create(&self, session_id: &str) -> SessionState {
        {
            let sessions = self.sessions.read().unwrap();
            if let Some(state) = sessions.get(session_id) {
                return state.clone();
            }
        }
        let mut sessions = self.sessions.write().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState {
                created_at: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            })
            .clone()
    }

    /// Store a freshly processed paper, clearing any previous index handle.
    pub fn set_paper(&self, session_id: &str, full_text: String, topics: SectionMap) {
        let mut sessions = self.sessions.write().unwrap();
        let state = sessions.entry(session_id.to_string()).or_default();
        if state.created_at == 0 {
            state.created_at = chrono::Utc::now().timestamp_millis();
        }
        state.full_text = full_text;
        state.topics = Some(topics);
        state.vector_index = None;
    }

    /// Attach a built vector index to the session.
    ///
    /// Two chat requests racing the lazy build may both construct an index;
    /// there is intentionally no mutual exclusion and the last write wins.
    pub fn set_vector_index(&self, session_id: &str, index: Arc<VectorIndex>) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(state) = sessions.get_mut(session_id) {
            state.vector_index = Some(index);
        }
    }

    pub fn set_progress(&self, session_id: &str, progress: UploadProgress) {
        self.progress
            .write()
            .unwrap()
            .insert(session_id.to_string(), progress);
    }

    pub fn clear_progress(&self, session_id: &str) {
        self.progress.write().unwrap().remove(session_id);
    }

    pub fn progress(&self, session_id: &str) -> UploadProgress {
        self.progress
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_else(UploadProgress::idle)
    }
}
