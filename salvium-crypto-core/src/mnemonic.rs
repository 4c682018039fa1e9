//! 25-word mnemonic seed codec.
//!
//! A 32-byte seed maps to 24 data words (base 1626 with a wrap-around
//! twist, three words per 4-byte little-endian group) plus one checksum
//! word. The checksum word is the data word at index
//! `CRC32(concat(prefix of each word)) mod 24`, where the prefix length is
//! a property of the word list.
//!
//! Word lists themselves are boundary data supplied by the caller; this
//! module implements the codec over any 1626-word list.

use std::collections::HashMap;

use crate::errors::{CryptoError, CryptoResult};

/// Number of words in the base alphabet.
pub const WORDLIST_LEN: usize = 1626;

/// Data words in a mnemonic (excluding the checksum word).
pub const DATA_WORDS: usize = 24;

/// A mnemonic word list with its unique-prefix length.
pub struct WordList {
    words: Vec<String>,
    index: HashMap<String, u32>,
    prefix_len: usize,
}

impl WordList {
    /// Build a word list. `words` must hold exactly 1626 distinct entries.
    pub fn new(words: Vec<String>, prefix_len: usize) -> CryptoResult<Self> {
        if words.len() != WORDLIST_LEN {
            return Err(CryptoError::InvalidLength {
                field: "word list".into(),
                expected: WORDLIST_LEN,
                actual: words.len(),
            });
        }
        let mut index = HashMap::with_capacity(WORDLIST_LEN);
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.to_lowercase(), i as u32).is_some() {
                return Err(CryptoError::Internal(format!(
                    "duplicate word list entry: {word}"
                )));
            }
        }
        Ok(WordList {
            words,
            index,
            prefix_len,
        })
    }

    fn word(&self, i: u32) -> &str {
        &self.words[i as usize]
    }

    fn lookup(&self, word: &str) -> CryptoResult<u32> {
        self.index
            .get(&word.to_lowercase())
            .copied()
            .ok_or_else(|| CryptoError::UnknownMnemonicWord(word.into()))
    }

    fn prefix(&self, word: &str) -> String {
        word.to_lowercase().chars().take(self.prefix_len).collect()
    }
}

/// Encode a 32-byte seed as 25 words.
pub fn seed_to_mnemonic(seed: &[u8; 32], list: &WordList) -> Vec<String> {
    let n = WORDLIST_LEN as u32;
    let mut words = Vec::with_capacity(DATA_WORDS + 1);

    for group in seed.chunks_exact(4) {
        let v = u32::from_le_bytes([group[0], group[1], group[2], group[3]]);
        let w1 = v % n;
        let w2 = (v / n + w1) % n;
        let w3 = (v / n / n + w2) % n;
        words.push(list.word(w1).to_string());
        words.push(list.word(w2).to_string());
        words.push(list.word(w3).to_string());
    }

    let checksum_index = checksum_word_index(&words, list);
    words.push(words[checksum_index].clone());
    words
}

/// Decode 25 words back into the 32-byte seed.
///
/// Case-insensitive and whitespace-tolerant; rejects unknown words, a
/// mangled checksum word, and out-of-range word triples.
pub fn mnemonic_to_seed(mnemonic: &str, list: &WordList) -> CryptoResult<[u8; 32]> {
    let words: Vec<&str> = mnemonic.split_whitespace().collect();
    if words.len() != DATA_WORDS + 1 {
        return Err(CryptoError::InvalidMnemonicLength {
            actual: words.len(),
        });
    }

    let data_words: Vec<String> = words[..DATA_WORDS]
        .iter()
        .map(|w| w.to_lowercase())
        .collect();

    // Checksum first: the 25th word must repeat the selected data word.
    let checksum_index = checksum_word_index(&data_words, list);
    if list.prefix(&data_words[checksum_index]) != list.prefix(words[DATA_WORDS]) {
        return Err(CryptoError::ChecksumMismatch {
            context: "mnemonic".into(),
        });
    }

    let n = WORDLIST_LEN as u64;
    let mut seed = [0u8; 32];
    for (group, chunk) in data_words.chunks_exact(3).enumerate() {
        let w1 = u64::from(list.lookup(&chunk[0])?);
        let w2 = u64::from(list.lookup(&chunk[1])?);
        let w3 = u64::from(list.lookup(&chunk[2])?);

        let v = w1 + n * ((n + w2 - w1) % n) + n * n * ((n + w3 - w2) % n);
        if v > u64::from(u32::MAX) {
            return Err(CryptoError::ChecksumMismatch {
                context: "mnemonic group out of range".into(),
            });
        }
        seed[group * 4..group * 4 + 4].copy_from_slice(&(v as u32).to_le_bytes());
    }
    Ok(seed)
}

fn checksum_word_index(data_words: &[String], list: &WordList) -> usize {
    let mut hasher = crc32fast::Hasher::new();
    for word in data_words.iter().take(DATA_WORDS) {
        hasher.update(list.prefix(word).as_bytes());
    }
    (hasher.finalize() as usize) % DATA_WORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Synthetic 1626-word list: "wa", "wb", ..., enumerated base-26 tails.
    fn test_list() -> WordList {
        let mut words = Vec::with_capacity(WORDLIST_LEN);
        for i in 0..WORDLIST_LEN {
            let a = (i / 26 / 26) % 26;
            let b = (i / 26) % 26;
            let c = i % 26;
            words.push(format!(
                "w{}{}{}",
                (b'a' + a as u8) as char,
                (b'a' + b as u8) as char,
                (b'a' + c as u8) as char
            ));
        }
        WordList::new(words, 4).unwrap()
    }

    #[test]
    fn test_roundtrip_various_seeds() {
        let list = test_list();
        for seed in [[0u8; 32], [0xffu8; 32], [0x5au8; 32]] {
            let words = seed_to_mnemonic(&seed, &list);
            assert_eq!(words.len(), 25);
            let joined = words.join(" ");
            assert_eq!(mnemonic_to_seed(&joined, &list).unwrap(), seed);
        }
    }

    #[test]
    fn test_roundtrip_structured_seed() {
        let list = test_list();
        let mut seed = [0u8; 32];
        for (i, b) in seed.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(11);
        }
        let joined = seed_to_mnemonic(&seed, &list).join(" ");
        assert_eq!(mnemonic_to_seed(&joined, &list).unwrap(), seed);
    }

    #[test]
    fn test_case_and_whitespace_tolerance() {
        let list = test_list();
        let seed = [0x33u8; 32];
        let words = seed_to_mnemonic(&seed, &list);
        let sloppy = format!(
            "  {}   {} ",
            words[..12].join("  "),
            words[12..].join(" ").to_uppercase()
        );
        assert_eq!(mnemonic_to_seed(&sloppy, &list).unwrap(), seed);
    }

    #[test]
    fn test_checksum_word_altered_rejected() {
        let list = test_list();
        let seed = [0x44u8; 32];
        let mut words = seed_to_mnemonic(&seed, &list);
        // Replace the checksum word with a different valid word.
        let replacement = if words[24] == "waaa" { "waab" } else { "waaa" };
        words[24] = replacement.into();
        let joined = words.join(" ");
        assert!(matches!(
            mnemonic_to_seed(&joined, &list),
            Err(CryptoError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_word_rejected() {
        let list = test_list();
        let seed = [0x55u8; 32];
        let mut words = seed_to_mnemonic(&seed, &list);
        words[3] = "zzzzzz".into();
        let joined = words.join(" ");
        assert!(mnemonic_to_seed(&joined, &list).is_err());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let list = test_list();
        assert!(matches!(
            mnemonic_to_seed("waaa waab", &list),
            Err(CryptoError::InvalidMnemonicLength { actual: 2 })
        ));
    }
}
