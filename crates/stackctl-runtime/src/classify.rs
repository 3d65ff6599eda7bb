//! Classification of collaborator results

use stackctl_core::StackError;

use crate::traits::CommandOutput;

/// What a successful mutating command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// State changed (created, configured, deleted)
    Changed(String),
    /// Already in the requested state
    Unchanged(String),
}

// checked first: never worth retrying even if a transient word also appears
const PERMANENT_MARKERS: &[&str] = &[
    "forbidden",
    "unauthorized",
    "accessdenied",
    "access denied",
    "permission denied",
    "is invalid",
    "invalid value",
    "validation error",
    "error validating",
    "conflict",
    "unknown field",
    "no matches for kind",
];

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "toomanyrequests",
    "too many requests",
    "throttl",
    "rate exceeded",
    "rate limit",
    "requestlimitexceeded",
    "connection refused",
    "connection reset",
    "service unavailable",
    "serviceunavailable",
    "temporarily unavailable",
    "server is currently unable to handle the request",
    "error acquiring the state lock",
    "try again",
];

/// Classify a failed command into a transient or permanent error
pub fn classify_failure(context: &str, output: &CommandOutput) -> StackError {
    let detail = first_meaningful_line(output);
    let haystack = output.combined().to_ascii_lowercase();

    if PERMANENT_MARKERS.iter().any(|m| haystack.contains(m)) {
        return StackError::Operation(format!("{}: {}", context, detail));
    }
    if TRANSIENT_MARKERS.iter().any(|m| haystack.contains(m)) {
        return StackError::Transient(format!("{}: {}", context, detail));
    }
    StackError::Operation(format!("{}: {}", context, detail))
}

fn first_meaningful_line(output: &CommandOutput) -> String {
    output
        .stderr
        .lines()
        .chain(output.stdout.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match output.code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        })
}
