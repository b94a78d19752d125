//! Deterministic parsing of inbound chat messages.
//!
//! Intent routing is intentionally dumb: keyword prefixes, a URL anywhere in
//! the message, or a bare job-id-shaped token. Anything else gets usage help.

/// What an inbound text message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    /// Render a video from the given script text.
    GenerateVideo {
        /// Script text for the renderer.
        script: String,
    },
    /// Transcribe + summarize the video behind a URL.
    Transcribe {
        /// Source video URL.
        url: String,
    },
    /// Look up the status of a submitted job.
    Status {
        /// Backend-minted job id.
        job_id: String,
    },
    /// Anything unrecognized.
    Help,
}

pub(super) fn parse_command(text: &str) -> Command {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Command::Help;
    }

    if let Some(rest) = strip_keyword(trimmed, "video") {
        if rest.is_empty() {
            return Command::Help;
        }
        return Command::GenerateVideo {
            script: rest.to_string(),
        };
    }

    if let Some(rest) = strip_keyword(trimmed, "transcribe") {
        return match first_url(rest) {
            Some(url) => Command::Transcribe {
                url: url.to_string(),
            },
            None => Command::Help,
        };
    }

    if let Some(rest) = strip_keyword(trimmed, "status") {
        let token = rest.split_whitespace().next().unwrap_or_default();
        if looks_like_job_id(token) {
            return Command::Status {
                job_id: token.to_string(),
            };
        }
        return Command::Help;
    }

    // A bare video URL means "transcribe this".
    if let Some(url) = first_url(trimmed) {
        return Command::Transcribe {
            url: url.to_string(),
        };
    }

    // A message that is just one job-id-shaped token is a status query.
    if looks_like_job_id(trimmed) {
        return Command::Status {
            job_id: trimmed.to_string(),
        };
    }

    Command::Help
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text
        .get(..keyword.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
        .map(|_| &text[keyword.len()..])?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn first_url(text: &str) -> Option<&str> {
    text.split_whitespace()
        .find(|token| token.starts_with("http://") || token.starts_with("https://"))
}

/// Job ids look like `032240I9` or a UUID: one token of word characters and
/// dashes, at least one digit, no spaces.
fn looks_like_job_id(token: &str) -> bool {
    let len = token.chars().count();
    if !(8..=64).contains(&len) || token.split_whitespace().count() != 1 {
        return false;
    }
    token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && token.chars().any(|c| c.is_ascii_digit())
}
