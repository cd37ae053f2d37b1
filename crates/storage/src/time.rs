// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp formatting for persisted records

use chrono::{SecondsFormat, Utc};

/// Current UTC time as RFC3339 at seconds precision (`2026-01-05T12:00:00Z`).
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
