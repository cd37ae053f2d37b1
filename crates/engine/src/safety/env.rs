// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-environment sanitization
//!
//! The child environment starts empty. A parent variable crosses the boundary
//! only through the fixed allowlist, a safe prefix, or the explicit harness
//! pass-through set; anything that looks like a credential is dropped unless
//! intentionally passed through. Caller overrides are overlaid last.

use indexmap::IndexMap;

pub const CHILD_ENV_ALLOWLIST: [&str; 9] = [
    "PATH", "HOME", "USER", "SHELL", "LANG", "TERM", "TMPDIR", "PYTHONPATH", "VIRTUAL_ENV",
];

pub const CHILD_ENV_ALLOWLIST_PREFIXES: [&str; 3] = ["LC_", "XDG_", "CARGO_"];

pub const CHILD_ENV_SECRET_SUFFIXES: [&str; 3] = ["_TOKEN", "_KEY", "_SECRET"];

/// Harness CLIs need these credentials to authenticate. Kept explicit so
/// secret-like env vars still default to dropped unless intentionally listed.
pub const HARNESS_ENV_PASS_THROUGH: [&str; 16] = [
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_BASE_URL",
    "OPENAI_API_KEY",
    "OPENAI_ORG_ID",
    "OPENAI_PROJECT_ID",
    "OPENAI_BASE_URL",
    "OPENROUTER_API_KEY",
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "GROQ_API_KEY",
    "XAI_API_KEY",
    "MISTRAL_API_KEY",
    "COHERE_API_KEY",
    "DEEPSEEK_API_KEY",
    "TOGETHER_API_KEY",
    "PERPLEXITY_API_KEY",
];

fn is_allowlisted(normalized: &str) -> bool {
    if CHILD_ENV_ALLOWLIST.contains(&normalized) {
        return true;
    }
    CHILD_ENV_ALLOWLIST_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

fn looks_like_secret(normalized: &str) -> bool {
    CHILD_ENV_SECRET_SUFFIXES
        .iter()
        .any(|suffix| normalized.ends_with(suffix))
}

/// Build a sanitized child environment with explicit pass-through controls.
pub fn sanitize_child_env(
    base_env: impl IntoIterator<Item = (String, String)>,
    env_overrides: &[(String, String)],
    pass_through: &[&str],
) -> IndexMap<String, String> {
    let pass_through_keys: Vec<String> =
        pass_through.iter().map(|name| name.to_uppercase()).collect();
    let mut sanitized = IndexMap::new();

    for (key, value) in base_env {
        let normalized = key.to_uppercase();
        let passed_through = pass_through_keys.contains(&normalized);
        if looks_like_secret(&normalized) && !passed_through {
            continue;
        }
        if passed_through || is_allowlisted(&normalized) {
            sanitized.insert(key, value);
        }
    }

    for (key, value) in env_overrides {
        sanitized.insert(key.clone(), value.clone());
    }
    sanitized
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
