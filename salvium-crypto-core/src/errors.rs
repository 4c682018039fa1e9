//! Error types for cryptographic operations.

use core::fmt;

/// Result type alias for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Error type for all cryptographic operations in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A 32-byte value failed Edwards point decompression.
    PointDecompressionFailed(String),

    /// A 32-byte value was not a canonical scalar mod l.
    NonCanonicalScalar(String),

    /// Input had the wrong length.
    InvalidLength {
        /// Name of the offending field.
        field: String,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// Hex decoding failed.
    HexDecodeFailed(String),

    /// Base58 decoding failed.
    Base58DecodeFailed(String),

    /// Address or mnemonic checksum did not match.
    ChecksumMismatch {
        /// What was being checked.
        context: String,
    },

    /// The varint address tag is not one of the 18 known variants.
    UnknownAddressTag(u64),

    /// A varint was malformed or overflowed 64 bits.
    VarintOverflow,

    /// Ring has fewer members than the protocol minimum.
    RingSizeTooSmall {
        /// Actual ring size.
        actual: usize,
        /// Minimum required.
        minimum: usize,
    },

    /// The real-spend index does not fit in the ring.
    RingIndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Ring size.
        ring_size: usize,
    },

    /// Ring signature verification failed.
    SignatureInvalid(String),

    /// The recomputed amount commitment does not match the on-chain one.
    CommitmentMismatch,

    /// A mnemonic word is not in the active word list.
    UnknownMnemonicWord(String),

    /// The mnemonic had the wrong number of words.
    InvalidMnemonicLength {
        /// Number of words seen.
        actual: usize,
    },

    /// Internal invariant violated; must not occur in production.
    Internal(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::PointDecompressionFailed(ctx) => {
                write!(f, "Point decompression failed: {ctx}")
            }
            CryptoError::NonCanonicalScalar(ctx) => {
                write!(f, "Non-canonical scalar: {ctx}")
            }
            CryptoError::InvalidLength {
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Invalid {field} length: expected {expected}, got {actual}"
                )
            }
            CryptoError::HexDecodeFailed(msg) => write!(f, "Hex decode failed: {msg}"),
            CryptoError::Base58DecodeFailed(msg) => write!(f, "Base58 decode failed: {msg}"),
            CryptoError::ChecksumMismatch { context } => {
                write!(f, "Checksum mismatch in {context}")
            }
            CryptoError::UnknownAddressTag(tag) => {
                write!(f, "Unknown address tag: {tag:#x}")
            }
            CryptoError::VarintOverflow => write!(f, "Varint overflow"),
            CryptoError::RingSizeTooSmall { actual, minimum } => {
                write!(f, "Ring size {actual} too small, minimum is {minimum}")
            }
            CryptoError::RingIndexOutOfBounds { index, ring_size } => {
                write!(f, "Ring index {index} out of bounds for ring size {ring_size}")
            }
            CryptoError::SignatureInvalid(msg) => write!(f, "Signature invalid: {msg}"),
            CryptoError::CommitmentMismatch => {
                write!(f, "Amount commitment mismatch")
            }
            CryptoError::UnknownMnemonicWord(word) => {
                write!(f, "Unknown mnemonic word: {word}")
            }
            CryptoError::InvalidMnemonicLength { actual } => {
                write!(f, "Invalid mnemonic length: {actual} words (expected 25)")
            }
            CryptoError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lengths() {
        let err = CryptoError::InvalidLength {
            field: "spend_key".into(),
            expected: 32,
            actual: 31,
        };
        let msg = err.to_string();
        assert!(msg.contains("spend_key"));
        assert!(msg.contains("32"));
        assert!(msg.contains("31"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(CryptoError::VarintOverflow, CryptoError::VarintOverflow);
        assert_ne!(
            CryptoError::CommitmentMismatch,
            CryptoError::VarintOverflow
        );
    }
}
