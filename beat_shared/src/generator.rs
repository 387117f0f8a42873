use thiserror::Error;

use crate::pattern::PatternData;
use crate::DEFAULT_GRID_LENGTH;

/// Notice shown to the user whenever generation fails, whatever the cause.
pub const GENERATION_FAILED_MESSAGE: &str = "Could not generate beat. Try a simpler prompt.";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("pattern description is empty")]
    EmptyDescription,
    #[error("pattern request failed: {0}")]
    Request(String),
    #[error("pattern service returned no content")]
    EmptyResponse,
    #[error("failed to parse musical pattern: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GenerateError {
    pub fn user_message(&self) -> &'static str {
        GENERATION_FAILED_MESSAGE
    }
}

/// Text-to-pattern service. Implementations own their transport; the engine
/// only ever sees a finished `PatternData` or an error.
pub trait PatternGenerator: Send {
    fn generate(&self, description: &str) -> Result<PatternData, GenerateError>;
}

impl<F> PatternGenerator for F
where
    F: Fn(&str) -> Result<PatternData, GenerateError> + Send,
{
    fn generate(&self, description: &str) -> Result<PatternData, GenerateError> {
        self(description)
    }
}

/// Instruction text handed to a language-model backed generator.
pub fn instructions(description: &str) -> String {
    format!(
        "Create a {len}-step sequencer pattern for Kick, Snare, HiHat and a simple Synth melody \
         based on the user's description. Return JSON with the keys kick, snare, hihat (arrays of \
         {len} booleans) and synth (array of {len} numbers). Synth values are frequencies in Hz \
         from the C major pentatonic scale (roughly 261 to 659 Hz) or low log drum notes \
         (60 to 150 Hz); 0 means silence.\nDescription: {description}",
        len = DEFAULT_GRID_LENGTH,
        description = description.trim()
    )
}

/// Parse a service response into a pattern.
///
/// Accepts a bare JSON object or one wrapped in a markdown code fence. Missing
/// lanes come back empty and wrong lengths are left for the pattern store to
/// apply best-effort.
pub fn parse_response(text: &str) -> Result<PatternData, GenerateError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(GenerateError::EmptyResponse);
    }
    let data: PatternData = serde_json::from_str(body)?;
    let malformed = data.malformed_lanes(DEFAULT_GRID_LENGTH);
    if !malformed.is_empty() {
        log::warn!("[Generator] Response has lanes of unexpected length: {:?}", malformed);
    }
    Ok(data)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Reject blank descriptions, then hand the trimmed text to `generator`.
pub fn generate(generator: &dyn PatternGenerator, description: &str) -> Result<PatternData, GenerateError> {
    if description.trim().is_empty() {
        return Err(GenerateError::EmptyDescription);
    }
    generator.generate(description.trim())
}
