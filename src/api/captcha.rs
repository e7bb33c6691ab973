//! Captcha proof contract.
//!
//! The visual puzzle is rendered and checked entirely client-side; on
//! success the widget self-issues a proof of the form
//! `image-captcha-<timestamp>`. The server only enforces the format of that
//! proof, so this is a usability speed bump, not bot resistance. Real
//! enforcement would generate the puzzle server-side with a server-held
//! answer and verify the solution here.

const PROOF_PREFIX: &str = "image-captcha-";

/// Format-only acceptance check for a captcha proof.
#[must_use]
pub fn acceptable(proof: &str) -> bool {
    let trimmed = proof.trim();
    trimmed.len() > PROOF_PREFIX.len() && trimmed.starts_with(PROOF_PREFIX)
}
