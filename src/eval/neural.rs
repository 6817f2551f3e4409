//! Policy inference via ONNX Runtime.
//!
//! `PolicyEngine` owns one loaded policy model for one game session. It is
//! built empty, resolves and downloads its model in `initialize`, and then
//! answers `predict` with one score per action index. A session that never
//! reaches `Ready` still plays: the selector falls back to the first legal
//! move.
//!
//! Lifecycle: `Uninitialized -> Loading -> Ready | Failed`. There is no
//! built-in retry; a caller that wants one builds a new engine.

use std::fmt;
use std::future::Future;
#[cfg(feature = "neural")]
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
#[cfg(feature = "neural")]
use ort::session::{builder::GraphOptimizationLevel, Session};
use reqwest::header::CACHE_CONTROL;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nn::action::ACTION_SPACE;
#[cfg(feature = "neural")]
use crate::nn::encoding::INPUT_SHAPE;
use crate::nn::encoding::{flatten, EncodedTensor};

/// Errors raised while loading or running the policy model.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to load model: {0}")]
    LoadFailure(String),

    #[error("inference engine is not ready (state: {0})")]
    NotReady(EngineState),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("cannot initialize an engine in state {0}")]
    InvalidState(EngineState),
}

/// Lifecycle of a [`PolicyEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Where to find the model. A direct `model_url` wins over the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub manifest_url: Option<String>,
    pub model_url: Option<String>,
}

/// The published model manifest: `{ "model_url": ..., "version": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelManifest {
    pub model_url: Option<String>,
    pub version: Option<String>,
}

/// A loaded policy network.
///
/// Takes one flattened [1, 10, 10, 5] input and returns the policy scores.
pub trait PolicyModel: Send + Sync {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, EngineError>;
}

/// Fetches the manifest and the model bytes.
pub trait ModelFetcher {
    fn fetch_manifest(&self, url: &str)
        -> impl Future<Output = Result<ModelManifest, EngineError>>;

    fn fetch_model(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, EngineError>>;
}

/// Builds a [`PolicyModel`] from downloaded bytes.
pub trait ModelLoader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PolicyModel>, EngineError>;
}

/// HTTP fetcher. The manifest is always requested with `Cache-Control: no-store`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl ModelFetcher for HttpFetcher {
    async fn fetch_manifest(&self, url: &str) -> Result<ModelManifest, EngineError> {
        debug!("fetching model manifest {}", url);
        let resp = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::LoadFailure(format!("manifest {}: {}", url, e)))?;
        resp.json::<ModelManifest>()
            .await
            .map_err(|e| EngineError::LoadFailure(format!("manifest {}: {}", url, e)))
    }

    async fn fetch_model(&self, url: &str) -> Result<Vec<u8>, EngineError> {
        debug!("fetching model {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::LoadFailure(format!("model {}: {}", url, e)))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| EngineError::LoadFailure(format!("model {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

/// Loads ONNX models. Without the `neural` feature every load fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PolicyModel>, EngineError> {
        #[cfg(feature = "neural")]
        {
            let session = load_session(bytes)?;
            Ok(Box::new(OnnxModel {
                session: Mutex::new(session),
            }))
        }
        #[cfg(not(feature = "neural"))]
        {
            let _ = bytes;
            Err(EngineError::LoadFailure(
                "compiled without the 'neural' feature".to_string(),
            ))
        }
    }
}

/// Builds an ONNX session from in-memory model bytes.
#[cfg(feature = "neural")]
fn load_session(bytes: &[u8]) -> Result<Session, EngineError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(4))
        .and_then(|b| b.commit_from_memory(bytes))
        .map_err(|e| EngineError::LoadFailure(e.to_string()))
}

#[cfg(feature = "neural")]
fn inference_err<E: fmt::Display>(e: E) -> EngineError {
    EngineError::Inference(e.to_string())
}

#[cfg(feature = "neural")]
struct OnnxModel {
    session: Mutex<Session>,
}

#[cfg(feature = "neural")]
impl PolicyModel for OnnxModel {
    /// Input and output tensors live only for this call and are released on
    /// every return path, success or failure.
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
        use ort::value::Value;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::Inference("session lock poisoned".to_string()))?;
        let input_tensor =
            Value::from_array((INPUT_SHAPE, input.to_vec())).map_err(inference_err)?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(inference_err)?;
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        Ok(data.to_vec())
    }
}

/// Appends the cache-busting query parameter to a model URL: `v=<version>`
/// when the version is known, otherwise `t=<unix millis>`. The parameter goes
/// into the query ahead of any fragment, percent-encoded.
pub fn cache_busted_url(
    url: &str,
    version: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, EngineError> {
    let mut parsed = Url::parse(url)
        .map_err(|e| EngineError::Configuration(format!("invalid model URL {}: {}", url, e)))?;
    match version.filter(|v| !v.is_empty()) {
        Some(v) => {
            parsed.query_pairs_mut().append_pair("v", v);
        }
        None => {
            parsed
                .query_pairs_mut()
                .append_pair("t", &now.timestamp_millis().to_string());
        }
    }
    Ok(parsed.into())
}

/// Resolves a manifest's `model_url` against the manifest location.
fn join_manifest_url(manifest_url: &str, model_url: &str) -> Result<Url, EngineError> {
    Url::parse(manifest_url)
        .and_then(|base| base.join(model_url))
        .map_err(|e| {
            EngineError::Configuration(format!(
                "cannot resolve {} against {}: {}",
                model_url, manifest_url, e
            ))
        })
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Works out the final model URL, fetching the manifest when no direct
/// model URL is configured.
pub async fn resolve_model_url<F: ModelFetcher>(
    config: &InferenceConfig,
    fetcher: &F,
    now: DateTime<Utc>,
) -> Result<String, EngineError> {
    if let Some(url) = non_empty(&config.model_url) {
        return cache_busted_url(url, None, now);
    }

    let manifest_url = non_empty(&config.manifest_url).ok_or_else(|| {
        EngineError::Configuration("neither a model URL nor a manifest URL is set".to_string())
    })?;
    let manifest = fetcher.fetch_manifest(manifest_url).await?;
    let model_url = non_empty(&manifest.model_url).ok_or_else(|| {
        EngineError::Configuration(format!("manifest {} has no model_url", manifest_url))
    })?;

    let absolute = join_manifest_url(manifest_url, model_url)?;
    cache_busted_url(absolute.as_str(), manifest.version.as_deref(), now)
}

/// Caller-owned policy model for one session.
pub struct PolicyEngine {
    state: EngineState,
    model: Option<Box<dyn PolicyModel>>,
    model_url: Option<String>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    /// Creates an engine with no model.
    pub fn new() -> Self {
        PolicyEngine {
            state: EngineState::Uninitialized,
            model: None,
            model_url: None,
        }
    }

    /// Creates a ready engine around an already-loaded model.
    pub fn with_model(model: Box<dyn PolicyModel>) -> Self {
        PolicyEngine {
            state: EngineState::Ready,
            model: Some(model),
            model_url: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// The resolved URL the model was loaded from.
    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    /// Resolves, downloads and loads the model over HTTP using ONNX Runtime.
    pub async fn initialize(&mut self, config: &InferenceConfig) -> Result<(), EngineError> {
        self.initialize_with(config, &HttpFetcher::new(), &OnnxLoader)
            .await
    }

    /// Like [`PolicyEngine::initialize`] with an explicit fetcher and loader.
    pub async fn initialize_with<F: ModelFetcher, L: ModelLoader>(
        &mut self,
        config: &InferenceConfig,
        fetcher: &F,
        loader: &L,
    ) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::InvalidState(self.state));
        }
        self.state = EngineState::Loading;

        match load_model(config, fetcher, loader).await {
            Ok((url, model)) => {
                info!("policy model loaded from {}", url);
                self.model = Some(model);
                self.model_url = Some(url);
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!("policy model unavailable: {}", e);
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    /// Scores every action for an encoded board.
    ///
    /// Returns exactly [`ACTION_SPACE`] scores. Fails with `NotReady` unless
    /// the engine finished loading.
    pub fn predict(&self, tensor: &EncodedTensor) -> Result<Vec<f32>, EngineError> {
        let model = match (self.state, self.model.as_ref()) {
            (EngineState::Ready, Some(m)) => m,
            (state, _) => return Err(EngineError::NotReady(state)),
        };

        let input = flatten(tensor);
        let mut scores = model.predict(&input)?;
        if scores.len() < ACTION_SPACE {
            return Err(EngineError::Inference(format!(
                "expected {} policy scores, got {}",
                ACTION_SPACE,
                scores.len()
            )));
        }
        scores.truncate(ACTION_SPACE);
        Ok(scores)
    }
}

async fn load_model<F: ModelFetcher, L: ModelLoader>(
    config: &InferenceConfig,
    fetcher: &F,
    loader: &L,
) -> Result<(String, Box<dyn PolicyModel>), EngineError> {
    let url = resolve_model_url(config, fetcher, Utc::now()).await?;
    let bytes = fetcher.fetch_model(&url).await?;
    let model = loader.load(&bytes)?;
    Ok((url, model))
}
