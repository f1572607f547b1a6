//! The bundled demonstration tokenizer: tags palindromic words.
//!
//! Ported from the original `hl-server`'s `is_polyndrom` + `RequestHandler`
//! word-splitting logic (`\w+` over each line, byte-offset column and
//! length, 1-indexed row/column). Case-sensitive: `"Abba"` is not a
//! palindrome here because `"abbA"` is not its own reverse.

use std::sync::LazyLock;

use hl_protocol::{Token, TokenLocation};
use regex::Regex;

use crate::{Tokenizer, TokenizeError};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

fn is_polyndrom(word: &str) -> bool {
    word.chars().eq(word.chars().rev())
}

pub struct PolyndromTokenizer;

impl Tokenizer for PolyndromTokenizer {
    fn tokenize(
        &self,
        _buf_type: &str,
        buf_body: &str,
        _additional_info: &str,
    ) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();

        for (line_index, line) in buf_body.split('\n').enumerate() {
            let row = line_index as u64 + 1;
            for word_match in WORD.find_iter(line) {
                let word = word_match.as_str();
                if !is_polyndrom(word) {
                    continue;
                }
                let column = word_match.start() as u64 + 1;
                let length = word.len() as u64;
                tokens.push(Token::new("Label", TokenLocation::new(row, column, length)));
            }
        }

        Ok(tokens)
    }
}
