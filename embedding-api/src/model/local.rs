use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use fastembed::{
    InitOptionsUserDefined, Pooling, TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use tracing::info;

use super::{Embedder, ModelError};
use crate::config::PoolingStrategy;

const ONNX_CANDIDATES: &[&str] = &["model.onnx", "onnx/model.onnx"];

/// A pretrained ONNX embedding model loaded from a directory on disk.
///
/// Inference is CPU bound, so it runs on the blocking thread pool. The session
/// is shared behind a mutex, one embedding at a time.
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_id: String,
}

impl LocalEmbedder {
    pub fn load(directory: &str, pooling: PoolingStrategy) -> Result<Self, ModelError> {
        let directory = Path::new(directory);

        let onnx_path = find_onnx_file(directory)?;
        let tokenizer_files = TokenizerFiles {
            tokenizer_file: read_file(&directory.join("tokenizer.json"))?,
            config_file: read_file(&directory.join("config.json"))?,
            special_tokens_map_file: read_file(&directory.join("special_tokens_map.json"))?,
            tokenizer_config_file: read_file(&directory.join("tokenizer_config.json"))?,
        };
        let model_id = model_id_from_config(&tokenizer_files.config_file, directory);

        let user_model = UserDefinedEmbeddingModel::new(read_file(&onnx_path)?, tokenizer_files)
            .with_pooling(match pooling {
                PoolingStrategy::Mean => Pooling::Mean,
                PoolingStrategy::Cls => Pooling::Cls,
            });

        let model =
            TextEmbedding::try_new_from_user_defined(user_model, InitOptionsUserDefined::default())
                .map_err(|e| ModelError::Load(e.to_string()))?;

        info!(
            model_id = %model_id,
            path = %onnx_path.display(),
            "loaded embedding model"
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_id,
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>, ModelError> {
        let model = self.model.clone();
        let text = text.to_owned();

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| ModelError::Inference("model lock poisoned".to_owned()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| ModelError::Inference(e.to_string()))
        })
        .await
        .map_err(|e| ModelError::Inference(e.to_string()))??;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("model returned no embedding".to_owned()))?;

        Ok(embedding.into_iter().map(f64::from).collect())
    }
}

fn find_onnx_file(directory: &Path) -> Result<PathBuf, ModelError> {
    ONNX_CANDIDATES
        .iter()
        .map(|candidate| directory.join(candidate))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            ModelError::Load(format!(
                "no ONNX model found in {}, expected one of {:?}",
                directory.display(),
                ONNX_CANDIDATES
            ))
        })
}

fn read_file(path: &Path) -> Result<Vec<u8>, ModelError> {
    fs::read(path).map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))
}

/// The `model_type` declared in the model's `config.json`, or the directory
/// name when the config doesn't carry one.
fn model_id_from_config(config_file: &[u8], directory: &Path) -> String {
    serde_json::from_slice::<serde_json::Value>(config_file)
        .ok()
        .and_then(|config| {
            config
                .get("model_type")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_owned())
        })
}
