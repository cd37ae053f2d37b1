// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret specification and byte-level redaction
//!
//! Redaction operates on bytes, not decoded strings, so leaked substrings are
//! never re-emitted around encoding boundaries. Each captured line is scanned
//! once against every secret byte sequence.

use serde::{Deserialize, Serialize};

/// One secret made available to a run.
///
/// The value is redacted from every captured stream and artifact, and is
/// exported to the child only as `MERIDIAN_SECRET_<KEY>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    pub key: String,
    pub value: String,
}

impl SecretSpec {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Environment variable name the child sees for this secret.
    pub fn env_var_name(&self) -> String {
        let mut name = String::with_capacity("MERIDIAN_SECRET_".len() + self.key.len());
        name.push_str("MERIDIAN_SECRET_");
        for ch in self.key.chars() {
            if ch.is_ascii_alphanumeric() {
                name.push(ch.to_ascii_uppercase());
            } else {
                name.push('_');
            }
        }
        name
    }

    fn placeholder(&self) -> Vec<u8> {
        format!("[REDACTED:{}]", self.key).into_bytes()
    }
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut index = 0;
    while index < haystack.len() {
        if haystack[index..].starts_with(needle) {
            out.extend_from_slice(replacement);
            index += needle.len();
        } else {
            out.push(haystack[index]);
            index += 1;
        }
    }
    out
}

/// Replace every occurrence of every secret value in `data`.
///
/// Empty secret values are skipped; they would match everywhere.
pub fn redact_secret_bytes(data: &[u8], secrets: &[SecretSpec]) -> Vec<u8> {
    let mut current = data.to_vec();
    for secret in secrets {
        if secret.value.is_empty() {
            continue;
        }
        if !current
            .windows(secret.value.len())
            .any(|window| window == secret.value.as_bytes())
        {
            continue;
        }
        current = replace_all(&current, secret.value.as_bytes(), &secret.placeholder());
    }
    current
}

/// Text-shaped variant for already-decoded content (reports).
pub fn redact_secret_text(text: &str, secrets: &[SecretSpec]) -> String {
    let redacted = redact_secret_bytes(text.as_bytes(), secrets);
    String::from_utf8_lossy(&redacted).into_owned()
}

/// Env overrides carrying the secrets into the child process.
pub fn secrets_env_overrides(secrets: &[SecretSpec]) -> Vec<(String, String)> {
    secrets
        .iter()
        .map(|secret| (secret.env_var_name(), secret.value.clone()))
        .collect()
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
