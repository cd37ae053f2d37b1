// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for workspace specs

pub use mdn_core::{
    make_artifact_key, ArtifactStore, Budget, ChatId, ModelId, RunId, RunStatus, SecretSpec,
};
pub use mdn_engine::{execute_run, ExecuteContext, RunOutcome, RunRequest};
pub use mdn_storage::InMemoryStore;

use mdn_adapters::{SafeDefaultResolver, ScriptedAdapter};
use std::sync::Once;

/// Install a test tracing subscriber once, honoring `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One temp repo with a single space directory and an artifact store.
pub struct SpecSpace {
    pub repo: tempfile::TempDir,
    pub space_dir: std::path::PathBuf,
    pub artifacts: InMemoryStore,
}

impl SpecSpace {
    /// Fresh fixture. Callers hold `#[serial]`; the state-root override is
    /// cleared so paths resolve under the temp repo.
    pub fn new() -> Self {
        init_tracing();
        std::env::remove_var("MERIDIAN_STATE_ROOT");
        std::env::remove_var("MERIDIAN_DEPTH");
        std::env::remove_var("MERIDIAN_MAX_DEPTH");
        std::env::remove_var("MERIDIAN_PARENT_RUN_ID");
        std::env::remove_var("MERIDIAN_HARNESS_COMMAND");
        let repo = tempfile::tempdir().expect("tempdir");
        let space_dir = repo.path().join(".meridian/.spaces/s1");
        std::fs::create_dir_all(&space_dir).expect("space dir");
        Self {
            repo,
            space_dir,
            artifacts: InMemoryStore::new(),
        }
    }

    pub fn request(&self, prompt: &str) -> RunRequest {
        RunRequest {
            run_id: None,
            chat_id: ChatId::from_number(1),
            prompt: prompt.to_string(),
            model: ModelId::new("gpt-5.3-codex"),
            agent: None,
            skills: Vec::new(),
            extra_args: Vec::new(),
            continue_session_id: None,
            continue_fork: false,
        }
    }

    pub fn context(&self) -> ExecuteContext {
        let mut ctx = ExecuteContext::new(self.repo.path());
        ctx.env_overrides
            .push(("PATH".to_string(), std::env::var("PATH").unwrap_or_default()));
        ctx.retry_backoff_secs = 0.0;
        ctx.kill_grace_secs = 0.5;
        ctx
    }

    /// Execute one scripted run through the full engine path.
    pub async fn run_script(&self, script: &str, ctx: &ExecuteContext) -> RunOutcome {
        self.run_script_with_prompt(script, "Fix bug", ctx).await
    }

    pub async fn run_script_with_prompt(
        &self,
        script: &str,
        prompt: &str,
        ctx: &ExecuteContext,
    ) -> RunOutcome {
        let adapter = ScriptedAdapter::new(script);
        execute_run(
            &self.request(prompt),
            self.repo.path(),
            &self.space_dir,
            &self.artifacts,
            &adapter,
            &SafeDefaultResolver,
            ctx,
        )
        .await
        .expect("execute_run")
    }

    pub fn artifact_text(&self, run_id: &RunId, name: &str) -> String {
        self.artifacts
            .get(&make_artifact_key(run_id, name))
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
            .unwrap_or_default()
    }

    pub fn runs(&self) -> Vec<mdn_core::RunRecord> {
        mdn_storage::list_runs(&self.space_dir).expect("list_runs")
    }

    pub fn raw_runs_log(&self) -> String {
        std::fs::read_to_string(self.space_dir.join("runs.jsonl")).unwrap_or_default()
    }
}
