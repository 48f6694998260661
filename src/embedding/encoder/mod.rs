//! Text encoder (GGUF decoder + tokenizer).
//!
//! Use [`EncoderConfig::stub`] for tests and model-less runs.

/// Encoder configuration.
pub mod config;
pub(crate) mod model;


pub use config::{ENCODER_EMBEDDING_DIM, ENCODER_MAX_SEQ_LEN, EncoderConfig, STUB_HIDDEN_SIZE};

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::constants::PAD_TO_MULTIPLE_OF;
use crate::embedding::device::select_device;
use crate::embedding::error::EmbeddingError;
use crate::embedding::instruction::InstructionFormatter;
use crate::embedding::pooling::truncate_and_normalize;
use crate::embedding::utils::load_tokenizer_for_batching;

use model::QwenForEmbedding;

/// Buckets touched per word by the stub backend.
const STUB_BUCKETS_PER_WORD: usize = 4;

/// Truncates and normalizes pooled rows; rows with no real tokens become zero vectors.
fn finish_rows(pooled: Vec<Vec<f32>>, lengths: &[u32], dim: usize) -> Vec<Vec<f32>> {
    pooled
        .into_iter()
        .zip(lengths)
        .map(|(row, &len)| {
            if len == 0 {
                vec![0.0; dim]
            } else {
                truncate_and_normalize(row, dim)
            }
        })
        .collect()
}

enum EncoderBackend {
    Model {
        model: Arc<QwenForEmbedding>,
        tokenizer: Arc<Tokenizer>,
        device: Device,
    },
    Stub,
}

/// Turns text into unit-length embedding vectors.
///
/// Immutable after [`TextEncoder::load`]; share it behind an `Arc`.
pub struct TextEncoder {
    backend: EncoderBackend,
    formatter: InstructionFormatter,
    config: EncoderConfig,
}

impl std::fmt::Debug for TextEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEncoder")
            .field(
                "backend",
                &match &self.backend {
                    EncoderBackend::Model { device, .. } => format!("Model({:?})", device),
                    EncoderBackend::Stub => "Stub".to_string(),
                },
            )
            .field("embedding_dim", &self.config.embedding_dim)
            .field("max_seq_len", &self.config.max_seq_len)
            .field("task", &self.formatter.task())
            .finish()
    }
}

impl TextEncoder {
    /// Loads the encoder from a config. Blocking; call once at startup.
    pub fn load(config: EncoderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;
        let formatter = InstructionFormatter::new(config.task.clone());

        if config.testing_stub {
            warn!("Text encoder running in STUB mode (testing only)");
            return Ok(Self {
                backend: EncoderBackend::Stub,
                formatter,
                config,
            });
        }

        let device = select_device(config.device)?;
        debug!(?device, "Selected compute device for text encoder");

        let (model, tokenizer) = Self::load_model(&config, &device)?;

        info!(
            model_path = %config.model_path.display(),
            architecture = %model.config().architecture,
            embedding_dim = config.embedding_dim,
            max_seq_len = config.max_seq_len,
            hidden_size = model.config().hidden_size,
            num_layers = model.config().num_layers,
            "Text encoder model loaded"
        );

        Ok(Self {
            backend: EncoderBackend::Model {
                model: Arc::new(model),
                tokenizer: Arc::new(tokenizer),
                device,
            },
            formatter,
            config,
        })
    }

    fn load_model(
        config: &EncoderConfig,
        device: &Device,
    ) -> Result<(QwenForEmbedding, Tokenizer), EmbeddingError> {
        let tokenizer = load_tokenizer_for_batching(
            &config.tokenizer_path,
            config.max_seq_len,
            PAD_TO_MULTIPLE_OF,
            config.padding,
        )
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: format!("Failed to load tokenizer: {}", e),
        })?;

        let mut model_file = std::fs::File::open(&config.model_path)?;
        let content = candle_core::quantized::gguf_file::Content::read(&mut model_file)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to read GGUF content: {}", e),
            })?;

        let qwen_config = model::QwenConfig::from_gguf(&content)?;
        if !qwen_config.is_supported() {
            return Err(EmbeddingError::UnsupportedArchitecture {
                arch: qwen_config.architecture,
            });
        }

        let model =
            QwenForEmbedding::from_gguf(content, &mut model_file, device, config.max_seq_len)
                .map_err(|e| EmbeddingError::ModelLoadFailed {
                    reason: format!("Failed to load transformer: {}", e),
                })?;

        if config.embedding_dim > model.config().hidden_size {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "embedding_dim ({}) exceeds model hidden_size ({})",
                    config.embedding_dim,
                    model.config().hidden_size
                ),
            });
        }

        Ok((model, tokenizer))
    }

    /// Encodes `texts` verbatim, one vector per input in input order.
    pub fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            EncoderBackend::Model {
                model,
                tokenizer,
                device,
            } => self.encode_with_model(texts, model, tokenizer, device),
            EncoderBackend::Stub => Ok(texts.iter().map(|text| self.encode_stub(text)).collect()),
        }
    }

    /// Encodes a stored document (no instruction).
    pub fn encode_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encode_one(text)
    }

    /// Encodes a free-text query wrapped in the retrieval instruction.
    pub fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let formatted = self.formatter.format_query(text);
        self.encode_one(&formatted)
    }

    fn encode_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encode(&[text])?
            .pop()
            .ok_or_else(|| EmbeddingError::InferenceFailed {
                reason: "encoder returned no vector".to_string(),
            })
    }

    fn encode_with_model(
        &self,
        texts: &[&str],
        model: &QwenForEmbedding,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let dim = self.config.embedding_dim;
        let encodings = tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let masks: Vec<Vec<u32>> = encodings
            .iter()
            .map(|e| e.get_attention_mask().to_vec())
            .collect();
        let lengths: Vec<u32> = masks.iter().map(|m| m.iter().sum()).collect();

        if lengths.iter().all(|&len| len == 0) {
            return Ok(vec![vec![0.0; dim]; texts.len()]);
        }

        let batch = encodings.len();
        let seq_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
        if encodings.iter().any(|e| e.len() != seq_len) {
            return Err(EmbeddingError::TokenizationFailed {
                reason: "batch was not padded to a common length".to_string(),
            });
        }

        debug!(batch, seq_len, "Running transformer forward pass");

        let ids: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().copied())
            .collect();
        let input_ids = Tensor::from_vec(ids, (batch, seq_len), device)?;
        let mask_tensor = Tensor::from_vec(masks.concat(), (batch, seq_len), device)?;

        let hidden = model.forward(&input_ids, &masks)?;
        let pooled = self
            .config
            .pooling
            .pool(&hidden, &mask_tensor)?
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()?;

        Ok(finish_rows(pooled, &lengths, dim))
    }

    /// Deterministic hashed bag-of-words.
    ///
    /// Each lowercase alphanumeric word adds ±1 to a few buckets of a native-size vector,
    /// which then goes through the same truncate-then-normalize step as the model path.
    /// Texts sharing words get positive cosine similarity.
    fn encode_stub(&self, text: &str) -> Vec<f32> {
        let mut native = vec![0.0f32; STUB_HIDDEN_SIZE];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = blake3::hash(word.to_lowercase().as_bytes());

            for chunk in digest
                .as_bytes()
                .chunks_exact(8)
                .take(STUB_BUCKETS_PER_WORD)
            {
                let mut lane = [0u8; 8];
                lane.copy_from_slice(chunk);
                let state = u64::from_le_bytes(lane);
                let bucket = (state % STUB_HIDDEN_SIZE as u64) as usize;
                let sign = if state >> 63 == 0 { 1.0 } else { -1.0 };
                native[bucket] += sign;
            }
        }

        truncate_and_normalize(native, self.config.embedding_dim)
    }

    /// Returns the configured output embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    /// Native vector size before truncation.
    pub fn hidden_size(&self) -> usize {
        match &self.backend {
            EncoderBackend::Model { model, .. } => model.config().hidden_size,
            EncoderBackend::Stub => STUB_HIDDEN_SIZE,
        }
    }

    /// Returns `true` if running in stub mode.
    pub fn is_stub(&self) -> bool {
        matches!(self.backend, EncoderBackend::Stub)
    }

    pub fn formatter(&self) -> &InstructionFormatter {
        &self.formatter
    }

    /// Returns the encoder configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}
