use candle_core::{DType, Device, Tensor};
use coldata_embed::masked_mean;

fn hidden() -> Tensor {
    // two tokens, hidden dim 4
    Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &Device::Cpu).unwrap()
}

fn mask(values: &[i64]) -> Tensor {
    Tensor::from_slice(values, (1, values.len()), &Device::Cpu).unwrap().to_dtype(DType::F32).unwrap()
}

#[test]
fn masked_mean_normalized() {
    let out = masked_mean(&hidden(), &mask(&[1, 0]), true).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    for (a, b) in v[0].iter().zip([1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm]) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn masked_mean_without_normalization_averages_tokens() {
    let out = masked_mean(&hidden(), &mask(&[1, 1]), false).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    assert_eq!(v[0], vec![3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn fully_masked_row_pools_to_zeros() {
    let out = masked_mean(&hidden(), &mask(&[0, 0]), false).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    assert!(v[0].iter().all(|x| *x == 0.0));
}
