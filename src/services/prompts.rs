//! Prompt text for thread replies and the single-shot analysis flow.

/// Rotating tone instructions. Order matters: the index is part of every
/// stored fingerprint.
pub const STYLES: [&str; 5] = [
    "Ask more questions and keep a soft tone. Avoid firm conclusions.",
    "Be brief: conclusion, then reasons, then one short question.",
    "Pick only three key points and explain them plainly without metaphors.",
    "Empathize with the reader first, then state facts, make a suggestion, and end with a short question.",
    "Pair each risk with a benefit. Keep a calm, measured tone.",
];

/// Picks the style for a thread's next reply so consecutive replies vary.
#[must_use]
pub fn style_hint_for(thread_id: i32, latest_item_id: i32) -> &'static str {
    let sum = i64::from(thread_id) + i64::from(latest_item_id);
    let len = STYLES.len() as i64;
    // rem_euclid keeps the index in range for negative ids
    let idx = usize::try_from(sum.rem_euclid(len)).unwrap_or(0);
    STYLES[idx]
}

/// Prompt for a conversational reply to a thread.
///
/// `last_ai_text` is shown to the model only as something not to repeat; it
/// does not feed the fingerprint.
#[must_use]
pub fn build_thread_prompt(
    article: &str,
    recent_posts: &str,
    style_hint: &str,
    last_ai_text: Option<&str>,
) -> String {
    let avoid_block = last_ai_text
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("\n[Previous AI reply - do not rehash its wording]\n{t}\n"))
        .unwrap_or_default();

    format!(
        "You are not a moderator but a friendly participant warming up the discussion. \
         Building on the article and the recent posts below, add a fresh angle instead of \
         repeating what was said. Write 6 to 8 conversational sentences and end with one \
         short question. One concrete example is welcome; avoid exaggeration and firm claims. \
         Rephrase rather than reuse expressions already in the thread.\n\
         [Style] {style_hint}\n\
         ----\n[Article]\n{article}\n\
         ----\n[Recent posts, newest first]\n{recent_posts}\
         {avoid_block}\n\
         ----\nOutput the reply body only, without preamble or headings.\n"
    )
}

/// Prompt for the legacy article + comment analysis.
#[must_use]
pub fn build_conversation_prompt(article: &str, comment: &str) -> String {
    format!(
        "You are a friend chatting casually about news and current topics. \
         Reply conversationally in 6 to 8 sentences. Avoid firm conclusions, say so when \
         something is unclear, and close with one short question.\n\
         ----\n[Article / summary]\n{article}\n\
         ----\n[User comment]\n{comment}\n"
    )
}

/// The user message stored for an analysis request.
#[must_use]
pub fn analysis_blob(article: &str, comment: &str) -> String {
    format!("[Article]\n{article}\n\n[Comment]\n{comment}")
}
