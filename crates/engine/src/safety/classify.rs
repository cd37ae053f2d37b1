// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness error classification for retry decisions

/// Retry strategy category for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Retryable,
    Unrecoverable,
    StrategyChange,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Retryable => "retryable",
            ErrorCategory::Unrecoverable => "unrecoverable",
            ErrorCategory::StrategyChange => "strategy_change",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const RETRYABLE_MARKERS: [&str; 14] = [
    "rate limit",
    "429",
    "timed out",
    "timeout",
    "temporarily unavailable",
    "temporary failure",
    "connection reset",
    "connection refused",
    "network error",
    "econnreset",
    "econnrefused",
    "etimedout",
    "resource busy",
    "database is locked",
];

const UNRECOVERABLE_MARKERS: [&str; 12] = [
    "model not found",
    "unknown model",
    "unsupported model",
    "permission denied",
    "access denied",
    "forbidden",
    "unauthorized",
    "invalid api key",
    "authentication failed",
    "token limit",
    "maximum tokens",
    "max tokens exceeded",
];

const STRATEGY_CHANGE_MARKERS: [&str; 7] = [
    "context length",
    "context too long",
    "maximum context length",
    "prompt too long",
    "output too large",
    "response too large",
    "please reduce",
];

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

/// Classify one failed harness attempt into a retry strategy category.
pub fn classify_error(exit_code: i32, stderr: &str) -> ErrorCategory {
    let normalized = stderr.to_lowercase();

    // Context/output size issues need a different prompt strategy, not blind
    // retries.
    if contains_any(&normalized, &STRATEGY_CHANGE_MARKERS) {
        return ErrorCategory::StrategyChange;
    }
    if contains_any(&normalized, &UNRECOVERABLE_MARKERS) {
        return ErrorCategory::Unrecoverable;
    }
    if contains_any(&normalized, &RETRYABLE_MARKERS) {
        return ErrorCategory::Retryable;
    }

    match exit_code {
        3 => ErrorCategory::Retryable,
        130 | 143 => ErrorCategory::Unrecoverable,
        1 | 2 => ErrorCategory::Retryable,
        _ => ErrorCategory::Unrecoverable,
    }
}

/// Retry iff the failure is retryable and the retry budget remains.
pub fn should_retry(exit_code: i32, stderr: &str, retries_attempted: u32, max_retries: u32) -> bool {
    if retries_attempted >= max_retries {
        return false;
    }
    classify_error(exit_code, stderr) == ErrorCategory::Retryable
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
