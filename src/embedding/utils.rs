use std::io;
use std::path::Path;

use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams,
};

/// Candidate pad tokens, tried in order when the tokenizer has no padding configured.
const PAD_TOKEN_CANDIDATES: &[&str] = &["<|endoftext|>", "<pad>", "[PAD]", "</s>"];

/// Loads a tokenizer from a model directory or explicit tokenizer.json path.
pub fn load_tokenizer(model_path: &Path) -> io::Result<Tokenizer> {
    let tokenizer_path = if model_path
        .file_name()
        .is_some_and(|name| name == std::ffi::OsStr::new("tokenizer.json"))
    {
        model_path.to_path_buf()
    } else if model_path.is_dir() {
        model_path.join("tokenizer.json")
    } else {
        model_path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Model path has no parent"))?
            .join("tokenizer.json")
    };

    Tokenizer::from_file(&tokenizer_path).map_err(io::Error::other)
}

/// Loads a tokenizer configured for batched encoding.
///
/// Sequences are truncated at `max_len` and padded to the longest sequence in the
/// batch, rounded up to a multiple of `pad_multiple`.
pub fn load_tokenizer_for_batching(
    tokenizer_path: &Path,
    max_len: usize,
    pad_multiple: usize,
    direction: PaddingDirection,
) -> io::Result<Tokenizer> {
    let mut tokenizer = load_tokenizer(tokenizer_path)?;

    let truncation = TruncationParams {
        max_length: max_len,
        ..Default::default()
    };
    tokenizer
        .with_truncation(Some(truncation))
        .map_err(|e| io::Error::other(format!("Failed to configure truncation: {}", e)))?;

    let mut padding = tokenizer.get_padding().cloned().unwrap_or_else(|| {
        let (pad_token, pad_id) = PAD_TOKEN_CANDIDATES
            .iter()
            .find_map(|token| tokenizer.token_to_id(token).map(|id| (token.to_string(), id)))
            .unwrap_or_else(|| ("<pad>".to_string(), 0));
        PaddingParams {
            pad_token,
            pad_id,
            ..Default::default()
        }
    });
    padding.strategy = PaddingStrategy::BatchLongest;
    padding.direction = direction;
    padding.pad_to_multiple_of = Some(pad_multiple);
    tokenizer.with_padding(Some(padding));

    Ok(tokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &[&str] = &[
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
        "twelve",
    ];

    /// Writes a whitespace word-level `tokenizer.json` with `<|endoftext|>` as id 0.
    fn write_word_tokenizer(dir: &Path) -> std::path::PathBuf {
        let mut vocab = serde_json::Map::new();
        vocab.insert("<|endoftext|>".to_string(), 0.into());
        vocab.insert("[UNK]".to_string(), 1.into());
        for (i, word) in WORDS.iter().enumerate() {
            vocab.insert(word.to_string(), (i + 2).into());
        }

        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });

        let path = dir.join("tokenizer.json");
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    #[test]
    fn test_load_tokenizer_resolves_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        write_word_tokenizer(dir.path());

        assert!(load_tokenizer(dir.path()).is_ok());
        assert!(load_tokenizer(&dir.path().join("model.gguf")).is_ok());
        assert!(load_tokenizer(&dir.path().join("tokenizer.json")).is_ok());
        assert!(load_tokenizer(Path::new("/nonexistent/model.gguf")).is_err());
    }

    #[test]
    fn test_batch_is_left_padded_to_multiple_of_eight() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_word_tokenizer(dir.path());
        let tokenizer = load_tokenizer_for_batching(&path, 64, 8, PaddingDirection::Left).unwrap();

        let encodings = tokenizer
            .encode_batch(vec!["one two", "one two three four five six seven eight nine"], true)
            .unwrap();

        for encoding in &encodings {
            assert_eq!(encoding.len(), 16);
        }

        let short = &encodings[0];
        assert_eq!(short.get_attention_mask()[..14], [0; 14]);
        assert_eq!(short.get_attention_mask()[14..], [1, 1]);
        assert_eq!(short.get_ids()[..14], [0; 14]);
        assert_eq!(short.get_ids()[14..], [2, 3]);

        let long = &encodings[1];
        assert_eq!(long.get_attention_mask().iter().sum::<u32>(), 9);
        assert_eq!(long.get_ids()[15], 10);
    }

    #[test]
    fn test_inputs_are_truncated_at_max_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_word_tokenizer(dir.path());
        let tokenizer = load_tokenizer_for_batching(&path, 10, 8, PaddingDirection::Left).unwrap();

        let text = WORDS.join(" ");
        let encodings = tokenizer.encode_batch(vec![text.as_str()], true).unwrap();
        let encoding = &encodings[0];

        // Ten real tokens, padded up to the next multiple of eight.
        assert_eq!(encoding.len(), 16);
        assert_eq!(encoding.get_attention_mask().iter().sum::<u32>(), 10);
        assert_eq!(encoding.get_ids()[6..], [2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }
}
