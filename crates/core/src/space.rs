// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Space metadata record for `space.json`

use crate::id::SpaceId;
use serde::{Deserialize, Serialize};

pub const SPACE_SCHEMA_VERSION: u32 = 1;

/// Space lifecycle status. A space exists on disk iff its directory and a
/// valid `space.json` exist; `closed` is terminal for one attachment but a
/// space can be reopened by resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceStatus {
    Active,
    Closed,
}

impl SpaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceStatus::Active => "active",
            SpaceStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current serialized form of one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRecord {
    pub schema_version: u32,
    pub id: SpaceId,
    pub name: Option<String>,
    pub status: SpaceStatus,
    pub created_at: String,
    pub finished_at: Option<String>,
}
