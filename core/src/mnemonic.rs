//! BIP-39 mnemonic generation, validation and seed stretching.

use crate::error::{Error, Result};
use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entropy strength of a generated mnemonic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Strength {
    /// 128 bits, 12 words.
    #[default]
    Bits128,
    /// 160 bits, 15 words.
    Bits160,
    /// 192 bits, 18 words.
    Bits192,
    /// 224 bits, 21 words.
    Bits224,
    /// 256 bits, 24 words.
    Bits256,
}

impl Strength {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            128 => Ok(Strength::Bits128),
            160 => Ok(Strength::Bits160),
            192 => Ok(Strength::Bits192),
            224 => Ok(Strength::Bits224),
            256 => Ok(Strength::Bits256),
            other => Err(Error::InvalidStrength(other)),
        }
    }

    pub fn from_word_count(words: usize) -> Result<Self> {
        match words {
            12 | 15 | 18 | 21 | 24 => Self::from_bits(words as u32 / 3 * 32),
            other => Err(Error::InvalidMnemonic(format!(
                "unsupported word count {other}"
            ))),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Strength::Bits128 => 128,
            Strength::Bits160 => 160,
            Strength::Bits192 => 192,
            Strength::Bits224 => 224,
            Strength::Bits256 => 256,
        }
    }

    /// Number of words: one word per 11 bits of entropy plus checksum.
    pub fn word_count(self) -> usize {
        (self.bits() / 32 * 3) as usize
    }
}

impl TryFrom<u32> for Strength {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        Self::from_bits(bits)
    }
}

impl From<Strength> for u32 {
    fn from(strength: Strength) -> Self {
        strength.bits()
    }
}

/// 64-byte BIP-39 seed.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Generate a fresh English mnemonic from OS randomness.
pub fn generate(strength: Strength) -> Result<Mnemonic> {
    Mnemonic::generate_in_with(&mut OsRng, Language::English, strength.word_count())
        .map_err(|e| Error::KeyDerivation(format!("Failed to generate mnemonic: {}", e)))
}

/// Generate a mnemonic from a raw bit count (128, 160, 192, 224 or 256).
pub fn generate_with_bits(bits: u32) -> Result<Mnemonic> {
    generate(Strength::from_bits(bits)?)
}

/// Parse a phrase, reporting why it is not a valid mnemonic.
///
/// Leading/trailing whitespace, repeated whitespace and upper case are tolerated.
pub fn parse(phrase: &str) -> Result<Mnemonic> {
    let normalized = normalize(phrase);
    Ok(Mnemonic::parse_in_normalized(Language::English, &normalized)?)
}

/// Whether `phrase` is a valid English mnemonic with a correct checksum.
pub fn validate(phrase: &str) -> bool {
    parse(phrase).is_ok()
}

/// Stretch a mnemonic into its seed (PBKDF2-HMAC-SHA512, 2048 rounds).
pub fn to_seed(mnemonic: &Mnemonic, passphrase: &str) -> Seed {
    Seed(mnemonic.to_seed(passphrase))
}

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_word_counts() {
        for (bits, words) in [(128, 12), (160, 15), (192, 18), (224, 21), (256, 24)] {
            let mnemonic = generate_with_bits(bits).unwrap();
            assert_eq!(mnemonic.word_count(), words);
            assert!(validate(&mnemonic.to_string()));
        }
    }

    #[test]
    fn test_generate_rejects_unsupported_strength() {
        for bits in [0, 64, 127, 129, 512] {
            assert!(matches!(
                generate_with_bits(bits),
                Err(Error::InvalidStrength(b)) if b == bits
            ));
        }
    }

    #[test]
    fn test_generated_mnemonics_differ() {
        let a = generate(Strength::Bits256).unwrap();
        let b = generate(Strength::Bits256).unwrap();
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_validate_returns_false_instead_of_failing() {
        assert!(validate(ABANDON));
        assert!(!validate(""));
        assert!(!validate("abandon abandon abandon"));
        assert!(!validate(&ABANDON.replace("about", "abandon")));
        assert!(!validate(&ABANDON.replace("about", "notaword")));
    }

    #[test]
    fn test_validate_normalizes_whitespace_and_case() {
        let messy = format!("  {}\n", ABANDON.to_uppercase().replace(' ', "   "));
        assert!(validate(&messy));
        assert_eq!(parse(&messy).unwrap().to_string(), ABANDON);
    }

    #[test]
    fn test_last_word_checksum_space() {
        // The last word of a 12-word phrase carries 7 entropy bits and 4 checksum bits, so
        // exactly one in sixteen candidates completes a valid phrase.
        let prefix = ABANDON.rsplit_once(' ').unwrap().0;
        let valid = Language::English
            .word_list()
            .iter()
            .filter(|word| validate(&format!("{prefix} {word}")))
            .count();
        assert_eq!(valid, 128);
    }

    #[test]
    fn test_single_word_substitution_is_detected() {
        let words = Language::English.word_list();
        let neighbour = |word: &str| {
            let index = words.iter().position(|w| *w == word).unwrap();
            words[(index + 1) % words.len()]
        };

        // A 4-bit checksum lets one substitution in sixteen through.
        let mut trials = 0;
        let mut rejected = 0;
        for _ in 0..200 {
            let phrase = generate(Strength::Bits128).unwrap().to_string();
            let original: Vec<&str> = phrase.split(' ').collect();

            for position in 0..original.len() {
                let mut mutated = original.clone();
                mutated[position] = neighbour(original[position]);
                let mutated = mutated.join(" ");

                trials += 1;
                if !validate(&mutated) {
                    rejected += 1;
                    assert!(matches!(parse(&mutated), Err(Error::InvalidMnemonic(_))));
                }
            }
        }
        assert_eq!(trials, 2400);
        assert!(rejected * 100 >= trials * 85, "{rejected} of {trials} rejected");
    }

    #[test]
    fn test_seed_vector() {
        // BIP-39 reference vector with passphrase "TREZOR".
        let mnemonic = parse(ABANDON).unwrap();
        let seed = to_seed(&mnemonic, "TREZOR");
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_seed_depends_on_passphrase() {
        let mnemonic = parse(ABANDON).unwrap();
        assert_eq!(to_seed(&mnemonic, ""), to_seed(&mnemonic, ""));
        assert_ne!(to_seed(&mnemonic, ""), to_seed(&mnemonic, "extra"));
    }

    #[test]
    fn test_strength_word_counts() {
        assert_eq!(Strength::from_word_count(24).unwrap(), Strength::Bits256);
        assert_eq!(Strength::Bits160.word_count(), 15);
        assert!(Strength::from_word_count(13).is_err());
    }
}
