//! The abstract remote-node interface and its wire types.
//!
//! Any transport (HTTP/JSON, binary portable-storage, a test double) can
//! back the wallet by implementing [`NodeClient`]. Wire values stay in
//! their JSON shapes (hex strings); byte conversion happens in the scanner
//! and builder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use salvium_common::{WalletError, WalletResult};

/// Chain tip summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub height: u64,
    pub top_block_hash: String,
}

/// One block header as reported by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub timestamp: u64,
    #[serde(default)]
    pub reward: u64,
    #[serde(default)]
    pub major_version: u8,
    #[serde(default)]
    pub minor_version: u8,
    /// Serialized block weight in bytes.
    #[serde(default)]
    pub weight: u64,
}

/// A full block: header fields plus the transactions the wallet scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub timestamp: u64,
    pub miner_tx: Transaction,
    /// The per-block protocol transaction (staking yield, conversions).
    #[serde(default)]
    pub protocol_tx: Option<Transaction>,
    #[serde(default)]
    pub tx_hashes: Vec<String>,
}

/// An input of a parsed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    pub key_image: String,
    #[serde(default)]
    pub amount: u64,
    /// Relative ring-member offsets into the per-asset global output set.
    #[serde(default)]
    pub key_offsets: Vec<u64>,
    #[serde(default)]
    pub asset_type: Option<String>,
}

/// Output target, tagged by generation.
///
/// The variant is decided by which fields the node serialized: a bare key
/// (pre view tags), a 1-byte-tagged key, or a carrot v1 enote with its
/// 3-byte view tag and encrypted Janus anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputTarget {
    CarrotV1 {
        key: String,
        /// 3 bytes, hex.
        view_tag: String,
        asset_type: String,
        encrypted_janus_anchor: String,
    },
    Tagged {
        key: String,
        /// 1 byte, hex.
        view_tag: String,
        asset_type: String,
    },
    Regular {
        key: String,
    },
}

impl OutputTarget {
    /// The one-time output key, hex.
    pub fn key(&self) -> &str {
        match self {
            OutputTarget::CarrotV1 { key, .. }
            | OutputTarget::Tagged { key, .. }
            | OutputTarget::Regular { key } => key,
        }
    }

    /// The asset tag, when the output carries one.
    pub fn asset_type(&self) -> Option<&str> {
        match self {
            OutputTarget::CarrotV1 { asset_type, .. } | OutputTarget::Tagged { asset_type, .. } => {
                Some(asset_type)
            }
            OutputTarget::Regular { .. } => None,
        }
    }
}

/// An output of a parsed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    /// Plain amount; zero for RingCT outputs.
    #[serde(default)]
    pub amount: u64,
    pub target: OutputTarget,
}

/// RingCT envelope of a transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RctData {
    /// RCT type byte (6..=9 on current forks).
    #[serde(default)]
    pub rct_type: u8,
    #[serde(default)]
    pub fee: u64,
    /// Per-output 8-byte encrypted amounts, hex.
    #[serde(default)]
    pub encrypted_amounts: Vec<String>,
    /// Per-output commitments, hex.
    #[serde(default)]
    pub out_commitments: Vec<String>,
}

/// A parsed transaction as served by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u64,
    #[serde(default)]
    pub unlock_time: u64,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    /// Raw extra field, hex.
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub rct: RctData,
}

/// One entry of a `get_outs` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutEntry {
    pub key: String,
    /// The output's commitment ("mask" in daemon parlance), hex.
    pub mask: String,
    pub unlocked: bool,
    pub height: u64,
    #[serde(default)]
    pub txid: Option<String>,
}

/// Response of `get_output_indexes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputIndexes {
    /// Global index per output, in output order.
    pub indices: Vec<u64>,
    /// Within-asset global indices, present on carrot-era nodes.
    #[serde(default)]
    pub asset_type_output_indices: Option<Vec<u64>>,
}

/// The wallet's view of a remote node.
///
/// All calls return a uniform result; transports map their error bodies to
/// [`WalletError::RpcError`] and transport failures to
/// [`WalletError::NetworkError`].
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_info(&self) -> WalletResult<NodeInfo>;

    async fn get_block(&self, height: u64) -> WalletResult<Block>;

    async fn get_block_headers_range(&self, lo: u64, hi: u64) -> WalletResult<Vec<BlockHeader>>;

    async fn get_transactions(&self, hashes: &[String]) -> WalletResult<Vec<Transaction>>;

    /// Fetch ring-member data for the given within-asset global indices.
    async fn get_outs(&self, asset_type: &str, indices: &[u64]) -> WalletResult<Vec<OutEntry>>;

    /// Cumulative output counts per height for the asset.
    async fn get_output_distribution(
        &self,
        asset_type: &str,
        start: u64,
        end: Option<u64>,
    ) -> WalletResult<Vec<u64>>;

    async fn get_output_indexes(&self, tx_hash: &str) -> WalletResult<OutputIndexes>;

    async fn get_tx_pool(&self) -> WalletResult<Vec<Transaction>>;

    async fn send_raw_transaction(&self, tx_hex: &str, source_asset: &str) -> WalletResult<()>;

    /// 0/1 per queried key image.
    async fn is_key_image_spent(&self, key_images: &[String]) -> WalletResult<Vec<bool>>;
}

/// Retry policy applied around node calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first failure.
    pub retries: u32,
    /// Delay between attempts.
    pub delay: Duration,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 2,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Run a node call under the retry policy.
///
/// Network and RPC errors are retried up to `policy.retries` times; every
/// other error kind surfaces immediately. A per-call timeout maps to
/// [`WalletError::NetworkError`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> WalletResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WalletResult<T>>,
{
    let mut last_err = WalletError::Internal("retry loop ran zero attempts".into());
    for attempt in 0..=policy.retries {
        if attempt > 0 {
            tokio::time::sleep(policy.delay).await;
        }
        let result = tokio::time::timeout(policy.timeout, call()).await;
        match result {
            Err(_) => {
                last_err = WalletError::NetworkError(format!(
                    "node call timed out after {:?}",
                    policy.timeout
                ));
            }
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) if err.is_retryable() => {
                tracing::warn!(attempt, error = %err, "node call failed, retrying");
                last_err = err;
            }
            Ok(Err(err)) => return Err(err),
        }
    }
    Err(last_err)
}
