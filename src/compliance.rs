//! Content-safety boundary.
//!
//! The check runs before any generation work is scheduled; the pipeline itself never calls it.

/// Opaque yes/no safety classifier for campaign copy.
pub trait ContentSafety: Send + Sync {
    /// Return `Ok(true)` when `message` may be used in published assets.
    fn is_safe(&self, message: &str) -> anyhow::Result<bool>;
}

/// Prompt sent to a chat model acting as brand-safety reviewer.
pub fn compliance_prompt(message: &str) -> String {
    format!(
        "You are a brand safety officer. Analyze the following marketing message: \"{message}\".\n\
         Return ONLY 'true' if the message is safe, non-offensive, and legally compliant.\n\
         Return 'false' if it contains profanity, hate speech, or misleading claims.\n"
    )
}

/// Interpret a free-form model reply. Anything mentioning `true` counts as approval.
pub fn reply_is_safe(reply: &str) -> bool {
    reply.to_lowercase().contains("true")
}
