use std::path::PathBuf;

use tokenizers::PaddingDirection;

use crate::embedding::device::DevicePreference;
use crate::embedding::error::EmbeddingError;
use crate::embedding::instruction::DEFAULT_TASK;
use crate::embedding::pooling::Pooling;

/// Default output embedding dimension.
pub const ENCODER_EMBEDDING_DIM: usize = crate::constants::DEFAULT_EMBEDDING_DIM;

/// Default max sequence length (tokens).
pub const ENCODER_MAX_SEQ_LEN: usize = crate::constants::DEFAULT_MAX_SEQ_LEN;

/// Native vector size of the stub backend.
pub const STUB_HIDDEN_SIZE: usize = 1024;

#[derive(Debug, Clone)]
/// Configuration for [`TextEncoder`](super::TextEncoder).
pub struct EncoderConfig {
    /// Path to the GGUF model file.
    pub model_path: PathBuf,
    /// Path to `tokenizer.json`.
    pub tokenizer_path: PathBuf,
    /// Sequences longer than this are truncated.
    pub max_seq_len: usize,
    /// Output embedding dimension (leading components of the hidden state).
    pub embedding_dim: usize,
    /// Compute device request.
    pub device: DevicePreference,
    /// Hidden-state reduction.
    pub pooling: Pooling,
    /// Which side padding tokens go on.
    pub padding: PaddingDirection,
    /// Retrieval intent prepended to queries.
    pub task: String,
    /// If true, run in deterministic stub mode (no model files required).
    pub testing_stub: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            tokenizer_path: PathBuf::new(),
            max_seq_len: ENCODER_MAX_SEQ_LEN,
            embedding_dim: ENCODER_EMBEDDING_DIM,
            device: DevicePreference::Auto,
            pooling: Pooling::LastToken,
            padding: PaddingDirection::Left,
            task: DEFAULT_TASK.to_string(),
            testing_stub: false,
        }
    }
}

impl EncoderConfig {
    /// Creates a config for a model file, inferring `tokenizer.json` from its directory.
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        let model_path = model_path.into();
        let tokenizer_path = model_path
            .parent()
            .map(|p| p.join("tokenizer.json"))
            .unwrap_or_default();

        Self {
            model_path,
            tokenizer_path,
            ..Default::default()
        }
    }

    /// Creates a stub config (no model files; produces deterministic embeddings).
    pub fn stub() -> Self {
        Self {
            testing_stub: true,
            ..Default::default()
        }
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_tokenizer_path<P: Into<PathBuf>>(mut self, tokenizer_path: P) -> Self {
        self.tokenizer_path = tokenizer_path.into();
        self
    }

    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Validates the config; model files are only required outside stub mode.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.embedding_dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding_dim must be greater than zero".to_string(),
            });
        }

        if self.max_seq_len == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "max_seq_len must be greater than zero".to_string(),
            });
        }

        if self.testing_stub {
            if self.embedding_dim > STUB_HIDDEN_SIZE {
                return Err(EmbeddingError::InvalidConfig {
                    reason: format!(
                        "embedding_dim ({}) exceeds stub hidden size ({})",
                        self.embedding_dim, STUB_HIDDEN_SIZE
                    ),
                });
            }
            return Ok(());
        }

        if self.model_path.as_os_str().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model_path is required (stubbing is disabled)".to_string(),
            });
        }

        if !self.model_available() {
            return Err(EmbeddingError::ModelNotFound {
                path: self.model_path.clone(),
            });
        }

        if !self.tokenizer_available() {
            return Err(EmbeddingError::TokenizerNotFound {
                path: self.tokenizer_path.clone(),
            });
        }

        Ok(())
    }

    /// Returns `true` if the model file path exists.
    pub fn model_available(&self) -> bool {
        !self.model_path.as_os_str().is_empty() && self.model_path.exists()
    }

    /// Returns `true` if the tokenizer path exists.
    pub fn tokenizer_available(&self) -> bool {
        !self.tokenizer_path.as_os_str().is_empty() && self.tokenizer_path.exists()
    }
}
