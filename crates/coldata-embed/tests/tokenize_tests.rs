use candle_core::Device;
use std::str::FromStr;
use tokenizers::Tokenizer;

use coldata_embed::tokenize::{pad_id, tokenize_batch};

const WORD_LEVEL: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": { "[UNK]": 0, "ocean": 1, "salinity": 2, "profiles": 3, "by": 4, "depth": 5, "[PAD]": 9 },
    "unk_token": "[UNK]"
  }
}"#;

fn tokenizer() -> Tokenizer { Tokenizer::from_str(WORD_LEVEL).unwrap() }

fn texts(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

#[test]
fn pad_id_falls_back_to_vocab_token() {
    assert_eq!(pad_id(&tokenizer()), 9);
}

#[test]
fn pads_to_longest_row_with_zero_mask() {
    let batch = tokenize_batch(&tokenizer(), &texts(&["ocean salinity profiles", "ocean"]), 16, &Device::Cpu).unwrap();
    let ids: Vec<Vec<u32>> = batch.input_ids.to_vec2().unwrap();
    let mask: Vec<Vec<u32>> = batch.attention_mask.to_vec2().unwrap();
    assert_eq!(ids, vec![vec![1, 2, 3], vec![1, 9, 9]]);
    assert_eq!(mask, vec![vec![1, 1, 1], vec![1, 0, 0]]);
}

#[test]
fn truncates_to_max_len() {
    let batch = tokenize_batch(&tokenizer(), &texts(&["ocean salinity profiles by depth", "depth"]), 2, &Device::Cpu).unwrap();
    let ids: Vec<Vec<u32>> = batch.input_ids.to_vec2().unwrap();
    let mask: Vec<Vec<u32>> = batch.attention_mask.to_vec2().unwrap();
    assert_eq!(batch.input_ids.dims(), &[2, 2]);
    assert_eq!(ids, vec![vec![1, 2], vec![5, 9]]);
    assert_eq!(mask, vec![vec![1, 1], vec![1, 0]]);
}

#[test]
fn unknown_words_map_to_unk() {
    let batch = tokenize_batch(&tokenizer(), &texts(&["ocean kelp"]), 8, &Device::Cpu).unwrap();
    let ids: Vec<Vec<u32>> = batch.input_ids.to_vec2().unwrap();
    assert_eq!(ids, vec![vec![1, 0]]);
}
