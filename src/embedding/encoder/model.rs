//! Qwen-family decoder returning final hidden states (not logits).
//!
//! Loads Qwen2 and Qwen3 GGUF checkpoints (e.g. Qwen3-Embedding-0.6B). Qwen3 differs by
//! per-head RMS norms on queries and keys and by an explicit attention head size.

use std::sync::Arc;

use candle_core::quantized::{QMatMul, gguf_file};
use candle_core::{D, Device, Module, Result, Tensor};
use candle_nn::RmsNorm;

/// Architectures whose GGUF tensor layout this module understands.
pub const SUPPORTED_ARCHITECTURES: &[&str] = &["qwen2", "qwen3"];

/// Model configuration extracted from GGUF metadata.
#[derive(Debug, Clone)]
pub struct QwenConfig {
    pub architecture: String,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub num_attention_heads: usize,
    pub num_kv_heads: usize,
    pub head_dim: usize,
    pub rms_norm_eps: f64,
    pub rope_theta: f64,
    pub max_seq_len: usize,
}

impl QwenConfig {
    /// Reads `general.architecture` and the `{arch}.*` hyperparameters.
    pub fn from_gguf(content: &gguf_file::Content) -> Result<Self> {
        let architecture = content
            .metadata
            .get("general.architecture")
            .and_then(|v| v.to_string().ok())
            .cloned()
            .unwrap_or_else(|| "qwen2".to_string());

        let get_u64 = |key: &str, default: u64| -> u64 {
            content
                .metadata
                .get(&format!("{architecture}.{key}"))
                .and_then(|v| v.to_u64().ok())
                .unwrap_or(default)
        };

        let get_f64 = |key: &str, default: f64| -> f64 {
            content
                .metadata
                .get(&format!("{architecture}.{key}"))
                .and_then(|v| v.to_f64().ok())
                .unwrap_or(default)
        };

        let hidden_size = get_u64("embedding_length", 1024) as usize;
        let num_layers = get_u64("block_count", 28) as usize;
        let num_attention_heads = get_u64("attention.head_count", 16) as usize;
        let num_kv_heads = get_u64("attention.head_count_kv", 8) as usize;
        let head_dim = get_u64(
            "attention.key_length",
            (hidden_size / num_attention_heads.max(1)) as u64,
        ) as usize;
        let rms_norm_eps = get_f64("attention.layer_norm_rms_epsilon", 1e-6);
        let rope_theta = get_f64("rope.freq_base", 1_000_000.0);
        let max_seq_len = get_u64("context_length", 32768) as usize;

        Ok(Self {
            architecture,
            hidden_size,
            num_layers,
            num_attention_heads,
            num_kv_heads,
            head_dim,
            rms_norm_eps,
            rope_theta,
            max_seq_len,
        })
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_ARCHITECTURES.contains(&self.architecture.as_str())
    }
}

/// Precomputed rotary position embeddings.
struct RotaryEmbedding {
    cos: Tensor,
    sin: Tensor,
}

impl RotaryEmbedding {
    fn new(config: &QwenConfig, max_seq_len: usize, device: &Device) -> Result<Self> {
        let half_dim = config.head_dim / 2;
        let inv_freq: Vec<f32> = (0..half_dim)
            .map(|i| 1.0 / (config.rope_theta as f32).powf((2 * i) as f32 / config.head_dim as f32))
            .collect();

        let inv_freq = Tensor::new(inv_freq, device)?;
        let positions: Vec<f32> = (0..max_seq_len).map(|p| p as f32).collect();
        let positions = Tensor::new(positions, device)?;

        // [max_seq_len, half_dim]
        let freqs = positions.unsqueeze(1)?.matmul(&inv_freq.unsqueeze(0)?)?;
        // [max_seq_len, head_dim]
        let freqs = Tensor::cat(&[&freqs, &freqs], D::Minus1)?;

        Ok(Self {
            cos: freqs.cos()?,
            sin: freqs.sin()?,
        })
    }

    fn apply(&self, x: &Tensor) -> Result<Tensor> {
        let (_batch, _heads, seq_len, head_dim) = x.dims4()?;

        let cos = self.cos.narrow(0, 0, seq_len)?.unsqueeze(0)?.unsqueeze(0)?;
        let sin = self.sin.narrow(0, 0, seq_len)?.unsqueeze(0)?.unsqueeze(0)?;

        let half = head_dim / 2;
        let x1 = x.narrow(D::Minus1, 0, half)?;
        let x2 = x.narrow(D::Minus1, half, half)?;
        let rotated = Tensor::cat(&[&x2.neg()?, &x1], D::Minus1)?;

        x.broadcast_mul(&cos)? + rotated.broadcast_mul(&sin)?
    }
}

/// Reads tensors of one checkpoint.
struct GgufReader<'a> {
    content: &'a gguf_file::Content,
    file: &'a mut std::fs::File,
    device: &'a Device,
}

impl GgufReader<'_> {
    fn qmatmul(&mut self, name: &str) -> Result<QMatMul> {
        let qtensor = self.content.tensor(self.file, name, self.device)?;
        QMatMul::from_arc(Arc::new(qtensor))
    }

    fn dense(&mut self, name: &str) -> Result<Tensor> {
        self.content
            .tensor(self.file, name, self.device)?
            .dequantize(self.device)
    }

    fn optional_dense(&mut self, name: &str) -> Option<Tensor> {
        if !self.content.tensor_infos.contains_key(name) {
            return None;
        }
        self.dense(name).ok()
    }

    fn rms_norm(&mut self, name: &str, eps: f64) -> Result<RmsNorm> {
        Ok(RmsNorm::new(self.dense(name)?, eps))
    }

    fn optional_rms_norm(&mut self, name: &str, eps: f64) -> Option<RmsNorm> {
        self.optional_dense(name).map(|w| RmsNorm::new(w, eps))
    }
}

struct DecoderLayer {
    attn_q: QMatMul,
    attn_k: QMatMul,
    attn_v: QMatMul,
    attn_o: QMatMul,
    attn_q_bias: Option<Tensor>,
    attn_k_bias: Option<Tensor>,
    attn_v_bias: Option<Tensor>,
    q_norm: Option<RmsNorm>,
    k_norm: Option<RmsNorm>,
    attn_norm: RmsNorm,
    ffn_norm: RmsNorm,
    ffn_gate: QMatMul,
    ffn_up: QMatMul,
    ffn_down: QMatMul,
    num_heads: usize,
    num_kv_heads: usize,
    head_dim: usize,
}

impl DecoderLayer {
    fn load(reader: &mut GgufReader<'_>, config: &QwenConfig, layer_idx: usize) -> Result<Self> {
        let p = format!("blk.{layer_idx}");
        let eps = config.rms_norm_eps;

        Ok(Self {
            attn_q: reader.qmatmul(&format!("{p}.attn_q.weight"))?,
            attn_k: reader.qmatmul(&format!("{p}.attn_k.weight"))?,
            attn_v: reader.qmatmul(&format!("{p}.attn_v.weight"))?,
            attn_o: reader.qmatmul(&format!("{p}.attn_output.weight"))?,
            // Qwen2 carries QKV biases; Qwen3 carries per-head q/k norms instead.
            attn_q_bias: reader.optional_dense(&format!("{p}.attn_q.bias")),
            attn_k_bias: reader.optional_dense(&format!("{p}.attn_k.bias")),
            attn_v_bias: reader.optional_dense(&format!("{p}.attn_v.bias")),
            q_norm: reader.optional_rms_norm(&format!("{p}.attn_q_norm.weight"), eps),
            k_norm: reader.optional_rms_norm(&format!("{p}.attn_k_norm.weight"), eps),
            attn_norm: reader.rms_norm(&format!("{p}.attn_norm.weight"), eps)?,
            ffn_norm: reader.rms_norm(&format!("{p}.ffn_norm.weight"), eps)?,
            ffn_gate: reader.qmatmul(&format!("{p}.ffn_gate.weight"))?,
            ffn_up: reader.qmatmul(&format!("{p}.ffn_up.weight"))?,
            ffn_down: reader.qmatmul(&format!("{p}.ffn_down.weight"))?,
            num_heads: config.num_attention_heads,
            num_kv_heads: config.num_kv_heads,
            head_dim: config.head_dim,
        })
    }

    fn forward(&self, x: &Tensor, mask: &Tensor, rope: &RotaryEmbedding) -> Result<Tensor> {
        let residual = x;
        let h = self.attn_norm.forward(x)?;
        let h = self.self_attention(&h, mask, rope)?;
        let x = (residual + h)?;

        let residual = &x;
        let h = self.ffn_norm.forward(&x)?;
        // SwiGLU: down(silu(gate(x)) * up(x))
        let gate = self.ffn_gate.forward(&h)?;
        let up = self.ffn_up.forward(&h)?;
        let h = self.ffn_down.forward(&(candle_nn::ops::silu(&gate)? * up)?)?;

        residual + h
    }

    fn self_attention(&self, x: &Tensor, mask: &Tensor, rope: &RotaryEmbedding) -> Result<Tensor> {
        let (batch, seq_len, _hidden) = x.dims3()?;

        let q = with_bias(self.attn_q.forward(x)?, self.attn_q_bias.as_ref())?;
        let k = with_bias(self.attn_k.forward(x)?, self.attn_k_bias.as_ref())?;
        let v = with_bias(self.attn_v.forward(x)?, self.attn_v_bias.as_ref())?;

        // [batch, seq, heads, head_dim]
        let q = q.reshape((batch, seq_len, self.num_heads, self.head_dim))?;
        let k = k.reshape((batch, seq_len, self.num_kv_heads, self.head_dim))?;
        let v = v.reshape((batch, seq_len, self.num_kv_heads, self.head_dim))?;

        let q = match &self.q_norm {
            Some(norm) => norm.forward(&q)?,
            None => q,
        };
        let k = match &self.k_norm {
            Some(norm) => norm.forward(&k)?,
            None => k,
        };

        // [batch, heads, seq, head_dim]
        let q = rope.apply(&q.transpose(1, 2)?.contiguous()?)?;
        let k = rope.apply(&k.transpose(1, 2)?.contiguous()?)?;
        let v = v.transpose(1, 2)?.contiguous()?;

        let k = self.repeat_kv(k)?;
        let v = self.repeat_kv(v)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let attn = (q.matmul(&k.transpose(D::Minus2, D::Minus1)?)? * scale)?;
        let attn = attn.broadcast_add(mask)?;
        let attn = candle_nn::ops::softmax_last_dim(&attn)?;
        let out = attn.matmul(&v)?;

        let out = out
            .transpose(1, 2)?
            .reshape((batch, seq_len, self.num_heads * self.head_dim))?;

        self.attn_o.forward(&out)
    }

    fn repeat_kv(&self, x: Tensor) -> Result<Tensor> {
        let n_rep = self.num_heads / self.num_kv_heads;
        if n_rep == 1 {
            return Ok(x);
        }
        let (batch, num_kv_heads, seq_len, head_dim) = x.dims4()?;
        x.unsqueeze(2)?
            .expand((batch, num_kv_heads, n_rep, seq_len, head_dim))?
            .reshape((batch, num_kv_heads * n_rep, seq_len, head_dim))
    }
}

fn with_bias(x: Tensor, bias: Option<&Tensor>) -> Result<Tensor> {
    match bias {
        Some(bias) => x.broadcast_add(bias),
        None => Ok(x),
    }
}

/// Qwen decoder stack without the language-model head.
pub struct QwenForEmbedding {
    tok_embeddings: Tensor,
    layers: Vec<DecoderLayer>,
    final_norm: RmsNorm,
    rope: RotaryEmbedding,
    config: QwenConfig,
    device: Device,
}

impl QwenForEmbedding {
    /// Loads all layers from a GGUF file. `max_seq_len` bounds the rotary table.
    pub fn from_gguf(
        content: gguf_file::Content,
        file: &mut std::fs::File,
        device: &Device,
        max_seq_len: usize,
    ) -> Result<Self> {
        let config = QwenConfig::from_gguf(&content)?;
        if !config.is_supported() {
            candle_core::bail!("unsupported architecture '{}'", config.architecture);
        }

        let mut reader = GgufReader {
            content: &content,
            file,
            device,
        };

        let tok_embeddings = reader.dense("token_embd.weight")?;

        let mut layers = Vec::with_capacity(config.num_layers);
        for layer_idx in 0..config.num_layers {
            layers.push(DecoderLayer::load(&mut reader, &config, layer_idx)?);
        }

        let final_norm = reader.rms_norm("output_norm.weight", config.rms_norm_eps)?;
        let rope = RotaryEmbedding::new(&config, max_seq_len.min(config.max_seq_len), device)?;

        Ok(Self {
            tok_embeddings,
            layers,
            final_norm,
            rope,
            config,
            device: device.clone(),
        })
    }

    /// Runs the decoder over `input_ids` (`[batch, seq]`).
    ///
    /// `padding_mask` holds one row per sequence (1 = real token, 0 = padding). Returns
    /// hidden states of shape `[batch, seq, hidden_size]`.
    pub fn forward(&self, input_ids: &Tensor, padding_mask: &[Vec<u32>]) -> Result<Tensor> {
        let (batch, seq_len) = input_ids.dims2()?;
        let flat_ids = input_ids.flatten_all()?;
        let mut hidden = self
            .tok_embeddings
            .index_select(&flat_ids, 0)?
            .reshape((batch, seq_len, self.config.hidden_size))?;

        let mask = attention_bias(padding_mask, seq_len, &self.device)?;

        for layer in &self.layers {
            hidden = layer.forward(&hidden, &mask, &self.rope)?;
        }

        self.final_norm.forward(&hidden)
    }

    pub fn config(&self) -> &QwenConfig {
        &self.config
    }
}

/// Builds the additive attention bias `[batch, 1, seq, seq]`.
///
/// Position `i` may attend to `j` when `j <= i` and `j` is a real token. Every position
/// may always attend to itself so fully masked (padding) rows never softmax to NaN.
pub(crate) fn attention_bias(
    padding_mask: &[Vec<u32>],
    seq_len: usize,
    device: &Device,
) -> Result<Tensor> {
    let batch = padding_mask.len();
    let mut data = Vec::with_capacity(batch * seq_len * seq_len);

    for row in padding_mask {
        for i in 0..seq_len {
            for j in 0..seq_len {
                let visible = j <= i && (j == i || row.get(j) == Some(&1));
                data.push(if visible { 0.0f32 } else { f32::NEG_INFINITY });
            }
        }
    }

    Tensor::from_vec(data, (batch, 1, seq_len, seq_len), device)
}
