//! Lowercase + trim + whitespace tokenization. No stemming and no
//! punctuation stripping, so tokens keep attached commas and `!`.

/// Normalized texts shorter than this (in chars) are not scored.
pub const MIN_TEXT_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    text: String,
}

impl Normalized {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_too_short(&self) -> bool {
        self.char_len() < MIN_TEXT_CHARS
    }
}

pub fn normalize(raw: &str) -> Normalized {
    Normalized {
        text: raw.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_cyrillic_and_trims() {
        let n = normalize("  Фильм ПРОСТО Великолепен!\n");
        assert_eq!(n.text(), "фильм просто великолепен!");
        assert_eq!(n.tokens(), vec!["фильм", "просто", "великолепен!"]);
    }

    #[test]
    fn length_is_counted_in_chars() {
        // Two Cyrillic letters are four bytes but still too short.
        assert!(normalize(" Да ").is_too_short());
        assert!(!normalize("Нет").is_too_short());
        assert!(normalize("").is_too_short());
    }
}
