//! Random component of a sign token.

use rand::Rng;

/// Nonce returned when randomness is disabled. Both supported vendors treat
/// `"0"` as "no random value".
pub const NO_RANDOM: &str = "0";

const HEX: &[u8] = b"0123456789abcdef";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Character set a nonce is drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alphabet {
    /// Lowercase hexadecimal digits
    Hex,
    /// Digits plus lower- and uppercase ASCII letters
    #[default]
    Alphanumeric,
}

impl Alphabet {
    fn chars(self) -> &'static [u8] {
        match self {
            Alphabet::Hex => HEX,
            Alphabet::Alphanumeric => ALPHANUMERIC,
        }
    }
}

/// Draw `len` characters uniformly from `alphabet`.
///
/// Uses the thread-local generator, so concurrent callers never contend.
pub fn random_string(alphabet: Alphabet, len: usize) -> String {
    let chars = alphabet.chars();
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| chars[rng.gen_range(0..chars.len())] as char)
        .collect()
}

/// Produces the `rand` field of a sign token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceGenerator {
    enabled: bool,
    alphabet: Alphabet,
    length: usize,
}

impl NonceGenerator {
    /// A non-positive `length` falls back to `default_length`.
    pub fn new(enabled: bool, alphabet: Alphabet, length: i64, default_length: usize) -> Self {
        let length = usize::try_from(length)
            .ok()
            .filter(|len| *len > 0)
            .unwrap_or(default_length);

        Self {
            enabled,
            alphabet,
            length,
        }
    }

    /// Generator that always yields [`NO_RANDOM`]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            alphabet: Alphabet::default(),
            length: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate(&self) -> String {
        if !self.enabled {
            return NO_RANDOM.to_string();
        }
        random_string(self.alphabet, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_yields_zero() {
        let nonce = NonceGenerator::new(false, Alphabet::Alphanumeric, 16, 16);
        assert_eq!(nonce.generate(), "0");
        assert_eq!(NonceGenerator::disabled().generate(), "0");
    }

    #[test]
    fn test_exact_length() {
        let nonce = NonceGenerator::new(true, Alphabet::Alphanumeric, 24, 6);
        let value = nonce.generate();
        assert_eq!(value.len(), 24);
        assert!(value.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_hex_alphabet() {
        let value = random_string(Alphabet::Hex, 64);
        assert_eq!(value.len(), 64);
        assert!(value.bytes().all(|b| HEX.contains(&b)));
    }

    #[test]
    fn test_non_positive_length_uses_default() {
        assert_eq!(NonceGenerator::new(true, Alphabet::Hex, 0, 16).length(), 16);
        assert_eq!(NonceGenerator::new(true, Alphabet::Hex, -3, 6).length(), 6);
        assert_eq!(NonceGenerator::new(true, Alphabet::Hex, 0, 6).generate().len(), 6);
    }

    #[test]
    fn test_values_differ() {
        let nonce = NonceGenerator::new(true, Alphabet::Alphanumeric, 32, 6);
        assert_ne!(nonce.generate(), nonce.generate());
    }
}
