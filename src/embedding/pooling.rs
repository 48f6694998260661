//! Pooling strategies and post-processing for encoder hidden states.

use candle_core::{DType, IndexOp, Result, Tensor};

/// How per-token hidden states are reduced to one vector per sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pooling {
    /// Hidden state of the last non-padding token (decoder-style embedders).
    #[default]
    LastToken,
    /// Mask-weighted mean over all non-padding tokens.
    Mean,
}

impl Pooling {
    /// Pools `hidden` (`[batch, seq, hidden]`) with `attention_mask` (`[batch, seq]`, u32)
    /// into `[batch, hidden]`.
    pub fn pool(&self, hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        match self {
            Self::LastToken => last_token_pool(hidden, attention_mask),
            Self::Mean => mean_pool(hidden, attention_mask),
        }
    }
}

/// Last-token pooling.
///
/// When every row's mask ends in 1 (left padding, or no padding at all) the final
/// position is the last real token of every row. Otherwise padding sits on the right and
/// each row is indexed at `sum(mask) - 1`.
pub fn last_token_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (_batch, seq_len, _hidden) = hidden.dims3()?;
    let mask = attention_mask.to_dtype(DType::U32)?.to_vec2::<u32>()?;

    let left_padded = mask.iter().all(|row| row.last() == Some(&1));
    if left_padded {
        return hidden.i((.., seq_len - 1, ..));
    }

    let rows = mask
        .iter()
        .enumerate()
        .map(|(row, row_mask)| {
            let length: u32 = row_mask.iter().sum();
            let last = (length as usize).saturating_sub(1);
            hidden.i((row, last, ..))
        })
        .collect::<Result<Vec<_>>>()?;

    Tensor::stack(&rows, 0)
}

/// Mean pooling over non-padding positions; fully padded rows pool to zero.
pub fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let mask = attention_mask.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?.maximum(1.0f32)?;
    summed.broadcast_div(&counts)
}

/// Keeps the first `dim` components (nested-dimension truncation) and L2-normalizes.
///
/// Truncation happens before normalization. A zero vector stays zero.
pub fn truncate_and_normalize(mut vector: Vec<f32>, dim: usize) -> Vec<f32> {
    vector.truncate(dim);
    l2_normalize(&mut vector);
    vector
}

/// Normalizes in place to unit length; leaves zero vectors untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Euclidean norm of `vector`.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    /// `[2, 3, 2]` hidden states where position p of row r is `[10r + p, -(10r + p)]`.
    fn hidden_states() -> Tensor {
        let data: Vec<f32> = (0..2)
            .flat_map(|r| (0..3).flat_map(move |p| {
                let v = (10 * r + p) as f32;
                [v, -v]
            }))
            .collect();
        Tensor::from_vec(data, (2, 3, 2), &Device::Cpu).unwrap()
    }

    fn mask(rows: [[u32; 3]; 2]) -> Tensor {
        let flat: Vec<u32> = rows.iter().flatten().copied().collect();
        Tensor::from_vec(flat, (2, 3), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_last_token_left_padding_uses_final_position() {
        let pooled = last_token_pool(&hidden_states(), &mask([[0, 1, 1], [1, 1, 1]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(pooled, vec![vec![2.0, -2.0], vec![12.0, -12.0]]);
    }

    #[test]
    fn test_last_token_right_padding_uses_sequence_length() {
        let pooled = last_token_pool(&hidden_states(), &mask([[1, 0, 0], [1, 1, 0]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(pooled, vec![vec![0.0, 0.0], vec![11.0, -11.0]]);
    }

    #[test]
    fn test_last_token_mixed_batch_with_full_row() {
        // Row 1 is unpadded; row 0 is right-padded so the fast path must not apply.
        let pooled = last_token_pool(&hidden_states(), &mask([[1, 1, 0], [1, 1, 1]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(pooled, vec![vec![1.0, -1.0], vec![12.0, -12.0]]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let pooled = mean_pool(&hidden_states(), &mask([[1, 1, 0], [1, 1, 1]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(pooled, vec![vec![0.5, -0.5], vec![11.0, -11.0]]);
    }

    #[test]
    fn test_mean_pool_fully_padded_row_is_zero() {
        let pooled = Pooling::Mean
            .pool(&hidden_states(), &mask([[0, 0, 0], [1, 0, 0]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(pooled[0], vec![0.0, 0.0]);
        assert_eq!(pooled[1], vec![10.0, -10.0]);
    }

    #[test]
    fn test_truncate_then_normalize() {
        let v = truncate_and_normalize(vec![3.0, 4.0, 100.0, -7.0], 2);
        assert_eq!(v.len(), 2);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_truncate_larger_than_vector_keeps_all() {
        let v = truncate_and_normalize(vec![1.0, 1.0], 8);
        assert_eq!(v.len(), 2);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        let v = truncate_and_normalize(vec![0.0; 16], 8);
        assert_eq!(v, vec![0.0; 8]);
        assert!(v.iter().all(|x| !x.is_nan()));
    }
}
