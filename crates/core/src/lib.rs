// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdn-core: Domain types for the Meridian run-execution engine

pub mod budget;
pub mod config;
pub mod error;
pub mod id;
pub mod permissions;
pub mod ports;
pub mod run;
pub mod secret;
pub mod session;
pub mod space;
pub mod stream;
pub mod usage;

pub use budget::{normalize_budget, Budget, BudgetBreach, BudgetScope};
pub use config::{MeridianConfig, OutputConfig};
pub use error::ConfigError;
pub use id::{ChatId, HarnessId, ModelId, RunId, SpaceId};
pub use permissions::{build_permission_config, parse_permission_tier, PermissionConfig, PermissionTier};
pub use ports::{make_artifact_key, ArtifactError, ArtifactKey, ArtifactStore, StreamObserver};
pub use run::{RunEvent, RunRecord, RunStatus};
pub use secret::{redact_secret_bytes, redact_secret_text, secrets_env_overrides, SecretSpec};
pub use session::{SessionEvent, SessionRecord};
pub use space::{SpaceRecord, SpaceStatus, SPACE_SCHEMA_VERSION};
pub use stream::{EventCategory, StreamEvent};
pub use usage::TokenUsage;
