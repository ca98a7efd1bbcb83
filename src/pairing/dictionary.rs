//! Key rendering from a character dictionary
//!
//! The store only needs "give me a random string of N characters"; how the
//! characters are picked is behind the [`KeyRenderer`] trait so tests can
//! swap in a deterministic renderer.

use rand::Rng;

/// Upper-case Latin letters
pub const DICT_ALPHA: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Decimal digits
pub const DICT_DIGITS: &str = "0123456789";

/// Upper-case letters and digits without easily confused characters (0/O, 1/I)
pub const DICT_ALNUM: &str = "23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Produces random key candidates of a given length
pub trait KeyRenderer: Send + Sync {
    fn render(&self, length: usize) -> String;
}

/// Renders keys by drawing characters uniformly from an alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    chars: Vec<char>,
}

impl Dictionary {
    /// Build a dictionary from a custom alphabet
    ///
    /// Repeated characters are collapsed so every character is equally likely.
    pub fn new(alphabet: &str) -> anyhow::Result<Self> {
        let mut chars: Vec<char> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if c.is_whitespace() {
                anyhow::bail!("whitespace is not allowed in a key alphabet");
            }
            if !chars.contains(&c) {
                chars.push(c);
            }
        }
        if chars.is_empty() {
            anyhow::bail!("key alphabet must not be empty");
        }
        Ok(Self { chars })
    }

    /// Resolve a named preset (`alpha`, `digits`, `alnum`)
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "alpha" => Ok(Self::alpha()),
            "digits" => Ok(Self::preset(DICT_DIGITS)),
            "alnum" => Ok(Self::preset(DICT_ALNUM)),
            other => Err(anyhow::anyhow!("Unknown dictionary: {}", other)),
        }
    }

    pub fn alpha() -> Self {
        Self::preset(DICT_ALPHA)
    }

    fn preset(alphabet: &str) -> Self {
        Self {
            chars: alphabet.chars().collect(),
        }
    }

    /// Number of distinct characters
    pub fn symbol_count(&self) -> usize {
        self.chars.len()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::alpha()
    }
}

impl KeyRenderer for Dictionary {
    fn render(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| self.chars[rng.gen_range(0..self.chars.len())])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_dictionary_chars() {
        let key = Dictionary::alpha().render(6);
        assert_eq!(key.chars().count(), 6);
        assert!(key.chars().all(|c| DICT_ALPHA.contains(c)));
    }

    #[test]
    fn test_render_zero_length() {
        assert_eq!(Dictionary::alpha().render(0), "");
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(Dictionary::from_name("alpha").unwrap().symbol_count(), 26);
        assert_eq!(Dictionary::from_name("DIGITS").unwrap().symbol_count(), 10);

        let alnum = Dictionary::from_name("alnum").unwrap();
        assert_eq!(alnum.symbol_count(), 32);
        let key = alnum.render(200);
        assert!(!key.contains(['0', 'O', '1', 'I']));
    }

    #[test]
    fn test_unknown_preset_fails() {
        assert!(Dictionary::from_name("klingon").is_err());
    }

    #[test]
    fn test_custom_alphabet_dedup() {
        let dict = Dictionary::new("AABBC").unwrap();
        assert_eq!(dict.symbol_count(), 3);
        assert!(dict.render(20).chars().all(|c| "ABC".contains(c)));
    }

    #[test]
    fn test_custom_alphabet_rejects_empty_and_whitespace() {
        assert!(Dictionary::new("").is_err());
        assert!(Dictionary::new("AB C").is_err());
    }

    #[test]
    fn test_render_non_ascii() {
        let key = Dictionary::new("αβγ").unwrap().render(4);
        assert_eq!(key.chars().count(), 4);
        assert!(key.chars().all(|c| "αβγ".contains(c)));
    }
}
