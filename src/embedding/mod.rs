//! Embedding + model utilities.
//!
//! - [`encoder`] turns text into unit-length vectors.
//! - [`instruction`] wraps queries in the retrieval instruction.

/// Device selection (CPU / Metal / CUDA).
pub mod device;
/// Text encoder (GGUF decoder or deterministic stub).
pub mod encoder;
mod error;
/// Query instruction template.
pub mod instruction;
/// Hidden-state pooling and normalization.
pub mod pooling;
/// Tokenizer loading helpers.
pub mod utils;

pub use device::DevicePreference;
pub use encoder::{
    ENCODER_EMBEDDING_DIM, ENCODER_MAX_SEQ_LEN, EncoderConfig, STUB_HIDDEN_SIZE, TextEncoder,
};
pub use error::EmbeddingError;
pub use instruction::{DEFAULT_TASK, InstructionFormatter, format_query};
pub use pooling::Pooling;
