use super::ChatMessage;

pub const SYSTEM_PROMPT: &str =
    "You are an expert meeting assistant that turns raw meeting transcripts into clear, concise summaries.";

/// Builds the system and user messages for a summarization request.
///
/// The transcript and the caller's instruction are inserted verbatim. An
/// absent instruction is treated as the empty string; no default is
/// substituted.
pub fn build_messages(transcript: &str, extra: Option<&str>) -> [ChatMessage; 2] {
    let extra = extra.unwrap_or("");

    [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Transcript:\n{}\n\n{}", transcript, extra)),
    ]
}
