use std::sync::Arc;

/// Token encoder/decoder used for all chunk and section budgeting.
///
/// Implementations must round-trip exactly: `decode(&encode(text)) == text`. Overlap windows
/// and rendered sections are cut on token boundaries and then decoded, so a lossy tokenizer
/// produces text that no longer lines up with the source document.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn decode(&self, tokens: &[u32]) -> String;

    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn encode(&self, text: &str) -> Vec<u32> {
        (**self).encode(text)
    }

    fn decode(&self, tokens: &[u32]) -> String {
        (**self).decode(tokens)
    }

    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn encode(&self, text: &str) -> Vec<u32> {
        (**self).encode(text)
    }

    fn decode(&self, tokens: &[u32]) -> String {
        (**self).decode(tokens)
    }

    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

/// One token per Unicode scalar value (the token id is the code point).
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[u32]) -> String {
        tokens
            .iter()
            .map(|&t| char::from_u32(t).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_tokenizer_round_trips() {
        let text = "héllo, wörld 🚀\n";
        let tokens = CharTokenizer.encode(text);
        assert_eq!(tokens.len(), text.chars().count());
        assert_eq!(CharTokenizer.decode(&tokens), text);
        assert_eq!(CharTokenizer.count(text), tokens.len());
    }

    #[test]
    fn shared_tokenizer_delegates() {
        let shared: Arc<dyn Tokenizer> = Arc::new(CharTokenizer);
        assert_eq!(shared.count("abc"), 3);
        assert_eq!(shared.decode(&shared.encode("xyz")), "xyz");
    }
}
