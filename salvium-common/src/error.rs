//! Wallet-level error taxonomy.
//!
//! A single flat enum crosses every crate boundary in the workspace. The
//! crypto core keeps its own richer `CryptoError`; it is folded into
//! [`WalletError`] at the wallet API surface.

use salvium_crypto_core::CryptoError;
use thiserror::Error;

/// Result type alias for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Flat error taxonomy for the wallet engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Malformed address, amount, hex string, or option.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Selection cannot reach the requested amount plus fee.
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    /// Timeout, transport failure, or unreachable node.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The node returned an error body.
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// The node reports a key image as already spent.
    #[error("Double spend: key image {0} already spent")]
    DoubleSpend(String),

    /// A binary blob or JSON document could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Base58 or mnemonic checksum failed.
    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// A 32-byte value was not a canonical scalar.
    #[error("Invalid scalar: {0}")]
    ScalarInvalid(String),

    /// A 32-byte value was not a valid curve point.
    #[error("Invalid point: {0}")]
    PointInvalid(String),

    /// Output unlock not met, asset mismatch, or a carrot output missing
    /// its shared secret.
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Caller-requested abort.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invariant violated; must not occur in production.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Whether the node adapter may transparently retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::NetworkError(_) | WalletError::RpcError { .. }
        )
    }
}

impl From<CryptoError> for WalletError {
    fn from(err: CryptoError) -> Self {
        match &err {
            CryptoError::PointDecompressionFailed(_) => {
                WalletError::PointInvalid(err.to_string())
            }
            CryptoError::NonCanonicalScalar(_) => WalletError::ScalarInvalid(err.to_string()),
            CryptoError::ChecksumMismatch { .. } => {
                WalletError::ChecksumMismatch(err.to_string())
            }
            CryptoError::HexDecodeFailed(_)
            | CryptoError::Base58DecodeFailed(_)
            | CryptoError::InvalidLength { .. }
            | CryptoError::VarintOverflow
            | CryptoError::UnknownAddressTag(_)
            | CryptoError::UnknownMnemonicWord(_)
            | CryptoError::InvalidMnemonicLength { .. } => {
                WalletError::ParseError(err.to_string())
            }
            CryptoError::CommitmentMismatch => WalletError::PolicyViolation(err.to_string()),
            CryptoError::RingSizeTooSmall { .. }
            | CryptoError::RingIndexOutOfBounds { .. }
            | CryptoError::SignatureInvalid(_)
            | CryptoError::Internal(_) => WalletError::Internal(err.to_string()),
        }
    }
}
