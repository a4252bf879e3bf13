//! Logging setup and per-call request/response artifacts.

use async_trait::async_trait;
use fs_err as fs;
use serde::Serialize;
use serde_json::{json, to_string_pretty};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::Result;
use crate::provider::{DynProvider, Provider};
use crate::wire::{CompletionRequest, CompletionResponse};

/// `RUST_LOG` wins; otherwise `info`, or `debug` for this crate when asked.
pub fn init_tracing(debug: bool) {
    let fallback = if debug { "info,draftdesk=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join("tx").join(tx.to_string())
}

fn save_json(path: &Path, value: &impl Serialize) {
    let written = to_string_pretty(value)
        .map_err(anyhow::Error::from)
        .and_then(|body| Ok(fs::write(path, body)?));
    if let Err(e) = written {
        tracing::warn!(path = %path.display(), error = %e, "could not save artifact");
    }
}

/// Writes every request and response that passes through it under
/// `<root>/tx/<uuid>/NN-<label>.{request,response}.json`.
pub struct RecordingProvider {
    inner: DynProvider,
    dir: PathBuf,
    seq: AtomicUsize,
}

impl RecordingProvider {
    pub fn new(inner: DynProvider, artifacts_root: &Path) -> Self {
        Self { inner, dir: tx_dir(artifacts_root, Uuid::new_v4()), seq: AtomicUsize::new(0) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stem = format!("{n:02}-{}", req.label);
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "could not create artifact dir");
        }
        save_json(&self.dir.join(format!("{stem}.request.json")), req);

        let outcome = self.inner.complete(req).await;
        let response_path = self.dir.join(format!("{stem}.response.json"));
        match &outcome {
            Ok(resp) => save_json(&response_path, resp),
            Err(e) => save_json(&response_path, &json!({ "error": e.to_string() })),
        }
        tracing::debug!(artifacts = %self.dir.display(), %stem, "artifacts saved");
        outcome
    }
}

/// Wraps `provider` in a recorder when artifacts are switched on.
pub fn with_artifacts(provider: DynProvider, cfg: &Config) -> DynProvider {
    if !cfg.save_artifacts {
        return provider;
    }
    let recorder = RecordingProvider::new(provider, &cfg.artifacts_root);
    tracing::info!(dir = %recorder.dir().display(), "saving request/response artifacts");
    Arc::new(recorder)
}
