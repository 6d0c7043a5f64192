use anyhow::{ensure, Result};
use candle_core::Tensor;

/// Mean over the unmasked token states of a `[B, T, H]` tensor, `[B, H]` out.
///
/// The token count is clamped at 1e-9 so fully padded rows pool to zeros.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor, normalize: bool) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {:?}", dims);
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_b = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_b)?.sum(1)?;
    let lengths = mask.sum_keepdim(1)?.maximum(1e-9f32)?;
    let mut pooled = sum.broadcast_div(&lengths)?;
    if normalize {
        pooled = l2_normalize(&pooled)?;
    }
    ensure!(pooled.dims() == [batch, hidden_dim], "pooled shape {:?}", pooled.dims());
    Ok(pooled)
}

/// Row-wise L2 normalization of a `[B, H]` tensor.
pub fn l2_normalize(rows: &Tensor) -> Result<Tensor> {
    let norm = rows.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12f32)?;
    Ok(rows.broadcast_div(&norm)?)
}
