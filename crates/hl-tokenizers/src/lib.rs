//! The tokenizer interface and the `buf_type` registry.
//!
//! A tokenizer is a pluggable backend: given a buffer's declared type,
//! its body, and an opaque handler-specific string, it produces an
//! ordered list of tokens or fails with a human-readable message. A
//! tokenizer failure is never a connection-level event — see
//! `hl_protocol::ResponseMessage::echo_failure` at the call site.

pub mod polyndrom;

use std::collections::HashMap;
use std::sync::Arc;

use hl_protocol::Token;
use thiserror::Error;

/// A tokenizer's own failure is just a message; the caller is
/// responsible for turning it into a well-formed response.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TokenizeError(pub String);

impl From<String> for TokenizeError {
    fn from(message: String) -> Self {
        TokenizeError(message)
    }
}

/// A pluggable tokenization backend, addressed by `buf_type`.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `buf_body`. `buf_type` is passed through verbatim (some
    /// backends serve more than one type); `additional_info` is opaque
    /// to the server and interpreted only by the tokenizer.
    fn tokenize(
        &self,
        buf_type: &str,
        buf_body: &str,
        additional_info: &str,
    ) -> Result<Vec<Token>, TokenizeError>;
}

type Constructor = Arc<dyn Fn() -> Box<dyn Tokenizer> + Send + Sync>;

/// A static, process-global mapping from `buf_type` to a tokenizer
/// constructor. Lookups are lock-free reads of an immutable map built
/// once at startup.
#[derive(Clone)]
pub struct Registry {
    constructors: HashMap<&'static str, Constructor>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// The registry this server ships with: just the palindrome
    /// demonstration tokenizer. A real deployment would call
    /// [`Registry::register`] to add more backends (e.g. one that
    /// shells out to a compiler frontend) without touching the core
    /// session/handler/server engine.
    pub fn with_bundled_tokenizers() -> Self {
        let mut registry = Self::empty();
        registry.register("polyndrom", || Box::new(polyndrom::PolyndromTokenizer));
        registry
    }

    pub fn register<F>(&mut self, buf_type: &'static str, constructor: F)
    where
        F: Fn() -> Box<dyn Tokenizer> + Send + Sync + 'static,
    {
        self.constructors.insert(buf_type, Arc::new(constructor));
    }

    /// Look up and construct a tokenizer for `buf_type`. Returns `None`
    /// on a miss — the caller turns that into a well-formed failure
    /// response, never a connection drop.
    pub fn get(&self, buf_type: &str) -> Option<Box<dyn Tokenizer>> {
        let tokenizer = self.constructors.get(buf_type).map(|ctor| ctor());
        if tokenizer.is_none() {
            tracing::debug!(buf_type, "no tokenizer registered for buffer type");
        }
        tokenizer
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_bundled_tokenizers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_registry_serves_polyndrom() {
        let registry = Registry::with_bundled_tokenizers();
        assert!(registry.get("polyndrom").is_some());
    }

    #[test]
    fn unknown_buf_type_is_a_miss_not_a_panic() {
        let registry = Registry::with_bundled_tokenizers();
        assert!(registry.get("klingon").is_none());
    }

    #[test]
    fn registry_is_open_to_new_backends() {
        struct Null;
        impl Tokenizer for Null {
            fn tokenize(&self, _: &str, _: &str, _: &str) -> Result<Vec<Token>, TokenizeError> {
                Ok(Vec::new())
            }
        }
        let mut registry = Registry::empty();
        registry.register("null", || Box::new(Null));
        assert!(registry.get("null").is_some());
        assert!(registry.get("polyndrom").is_none());
    }
}
