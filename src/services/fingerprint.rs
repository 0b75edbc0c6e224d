//! Idempotency keys for generated replies.
//!
//! A [`Fingerprint`] captures exactly the inputs that should force a fresh
//! generation: the seed text, the newest context item, a digest of the recent
//! context, the style hint, the mode and the model. Timestamps and thread
//! identity are not part of it; the cache scopes keys per thread.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the recent-context digest embedded in the canonical string.
const RECENT_DIGEST_LEN: usize = 16;

/// Everything a reply generation depends on. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    thread_id: i32,
    seed_text: String,
    latest_item_id: i32,
    recent_context: Vec<String>,
    style_hint: String,
    model_id: String,
    mode: String,
}

impl GenerationRequest {
    /// `recent_context` is ordered newest first.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thread_id: i32,
        seed_text: impl Into<String>,
        latest_item_id: i32,
        recent_context: Vec<String>,
        style_hint: impl Into<String>,
        model_id: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            thread_id,
            seed_text: seed_text.into(),
            latest_item_id,
            recent_context,
            style_hint: style_hint.into(),
            model_id: model_id.into(),
            mode: mode.into(),
        }
    }

    #[must_use]
    pub const fn thread_id(&self) -> i32 {
        self.thread_id
    }

    #[must_use]
    pub fn seed_text(&self) -> &str {
        &self.seed_text
    }

    #[must_use]
    pub const fn latest_item_id(&self) -> i32 {
        self.latest_item_id
    }

    #[must_use]
    pub fn recent_context(&self) -> &[String] {
        &self.recent_context
    }

    #[must_use]
    pub fn style_hint(&self) -> &str {
        &self.style_hint
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Recent context as `- item` lines separated by blank lines, the form
    /// both the prompt and the digest use.
    #[must_use]
    pub fn recent_context_text(&self) -> String {
        self.recent_context
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Lowercase SHA-256 hex digest (64 chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn of(request: &GenerationRequest) -> Self {
        Self(sha256_hex(canonical_form(request).as_bytes()))
    }

    /// Wraps a digest read back from storage.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored rows are keyed by this exact layout. Changing it orphans every cached reply.
fn canonical_form(request: &GenerationRequest) -> String {
    let recent_digest = sha256_hex(request.recent_context_text().as_bytes());
    let recent_digest = &recent_digest[..RECENT_DIGEST_LEN];

    format!(
        "{}\n#last={}\n#recent={}\n#style={}\n#mode={}\n#model={}",
        request.seed_text,
        request.latest_item_id,
        recent_digest,
        request.style_hint,
        request.mode,
        request.model_id,
    )
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
