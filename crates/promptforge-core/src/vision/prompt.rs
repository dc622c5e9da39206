//! Comparison instruction block
//!
//! The labels here are the wire format the parser matches against. Change
//! them in lockstep with `parser`.

/// Label preceding the numeric similarity score
pub(crate) const SCORE_LABEL: &str = "SIMILARITY SCORE";

/// Label preceding the visual-difference description
pub(crate) const DIFFERENCES_LABEL: &str = "VISUAL DIFFERENCES";

/// Label preceding the prompt-improvement guidance
pub(crate) const IMPROVEMENTS_LABEL: &str = "PROMPT IMPROVEMENTS";

/// Build the instruction text sent alongside the two images.
///
/// Asks for a 0-100 similarity score, a short difference description, and
/// actionable prompt guidance, all in a fixed labeled plain-text format so
/// the parser can find them reliably.
pub fn build_comparison_prompt(user_prompt: &str) -> String {
    let prompt_line = if user_prompt.trim().is_empty() {
        "SECOND: the image generated from the player's prompt".to_string()
    } else {
        format!(
            "SECOND: the image generated from the player's prompt: \"{}\"",
            user_prompt.trim()
        )
    };

    format!(
        "Compare these two images:\n\
         FIRST: the target image the player is trying to recreate\n\
         {prompt_line}\n\
         \n\
         Note: use simple, encouraging language suitable for a young learner.\n\
         Note: keep all suggestions short and actionable, with concrete example prompt wording where helpful.\n\
         \n\
         Format EXACTLY as:\n\
         {SCORE_LABEL}: [number]%\n\
         {DIFFERENCES_LABEL}: [at most 70 simple words describing what looks different]\n\
         {IMPROVEMENTS_LABEL}: [at most 70 simple words on what to add or change in the prompt, with example wording]"
    )
}
