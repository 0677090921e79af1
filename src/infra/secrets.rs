use std::panic;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_MARKERS: [&str; 7] = [
    "password",
    "token",
    "bearer",
    "authorization",
    "secret",
    "jwt",
    "eyj",
];

/// Scrubs credentials and credential-looking values from free text before
/// it reaches logs or the terminal.
pub fn redact_text(input: &str) -> String {
    input
        .split_whitespace()
        .map(redact_chunk)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn install_panic_redaction_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload omitted".to_owned());

        let scrubbed = redact_text(&payload);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "studybuddy panic: {} at {}:{}:{}",
                scrubbed,
                location.file(),
                location.line(),
                location.column()
            );
        } else {
            eprintln!("studybuddy panic: {}", scrubbed);
        }
    }));
}

fn redact_chunk(chunk: &str) -> String {
    let lowered = chunk.to_ascii_lowercase();
    if SENSITIVE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || looks_like_jwt(chunk)
    {
        REDACTED.to_owned()
    } else {
        chunk.to_owned()
    }
}

fn looks_like_jwt(value: &str) -> bool {
    let segments: Vec<&str> = value
        .trim_matches(|ch: char| ch == '"' || ch == '\'' || ch == ',')
        .split('.')
        .collect();

    segments.len() == 3
        && segments.iter().all(|segment| {
            segment.len() >= 4
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_text_scrubs_sensitive_fragments() {
        let input = "login failed password=hunter22 token=abc123 for ada";
        let output = redact_text(input);

        assert!(!output.contains("hunter22"));
        assert!(!output.contains("abc123"));
        assert!(output.contains("[REDACTED]"));
        assert!(output.contains("ada"));
    }

    #[test]
    fn redact_text_scrubs_bare_jwt_values() {
        let output = redact_text("rejected abcd1234.efgh5678.ijkl9012 today");

        assert_eq!(output, "rejected [REDACTED] today");
    }

    #[test]
    fn keeps_ordinary_sentences_intact() {
        let input = "Group not found. Please check the id.";

        assert_eq!(redact_text(input), input);
    }
}
