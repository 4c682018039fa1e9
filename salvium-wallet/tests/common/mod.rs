//! Shared test support: an in-memory mock node.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use curve25519_dalek::Scalar;

use salvium_common::{WalletError, WalletResult};
use salvium_crypto_core::curve::{commit, scalar_mul_base};
use salvium_crypto_core::hash::keccak256_to_scalar;
use salvium_wallet::node::{
    Block, BlockHeader, NodeClient, NodeInfo, OutEntry, OutputIndexes, RctData, Transaction,
};

/// Scriptable in-memory node.
#[derive(Default)]
pub struct MockNode {
    pub state: Mutex<MockState>,
}

#[derive(Default)]
pub struct MockState {
    /// Blocks by height (index == height).
    pub blocks: Vec<Block>,
    pub txs: HashMap<String, Transaction>,
    pub output_indexes: HashMap<String, OutputIndexes>,
    /// Cumulative output distribution per asset.
    pub distribution: HashMap<String, Vec<u64>>,
    pub spent_key_images: HashSet<String>,
    /// `(tx_hex, source_asset)` pairs accepted for broadcast.
    pub submitted: Vec<(String, String)>,
}

pub fn empty_tx() -> Transaction {
    Transaction {
        version: 2,
        unlock_time: 0,
        inputs: vec![],
        outputs: vec![],
        extra: String::new(),
        rct: RctData::default(),
    }
}

pub fn empty_block(height: u64, branch: &str) -> Block {
    let prev = if height == 0 {
        "genesis_parent".to_string()
    } else {
        block_hash(height - 1, branch)
    };
    Block {
        height,
        hash: block_hash(height, branch),
        prev_hash: prev,
        timestamp: 1_700_000_000 + height * 120,
        miner_tx: empty_tx(),
        protocol_tx: None,
        tx_hashes: vec![],
    }
}

pub fn block_hash(height: u64, branch: &str) -> String {
    format!("{branch}_{height}")
}

impl MockNode {
    pub fn with_empty_chain(tip: u64, branch: &str) -> Self {
        let node = MockNode::default();
        {
            let mut state = node.state.lock().unwrap();
            for h in 0..=tip {
                state.blocks.push(empty_block(h, branch));
            }
        }
        node
    }

    /// Replace the suffix above `split` with a different branch and extend
    /// it to `new_tip`.
    pub fn reorg_to_branch(&self, split: u64, new_tip: u64, branch: &str) {
        let mut state = self.state.lock().unwrap();
        state.blocks.truncate((split + 1) as usize);
        for h in (split + 1)..=new_tip {
            let mut block = empty_block(h, branch);
            if h == split + 1 {
                block.prev_hash = state.blocks[split as usize].hash.clone();
            }
            state.blocks.push(block);
        }
    }

    /// Place a transaction into the block at `height`.
    pub fn add_tx(&self, height: u64, tx_hash: &str, tx: Transaction) {
        let mut state = self.state.lock().unwrap();
        state.blocks[height as usize].tx_hashes.push(tx_hash.to_string());
        state.txs.insert(tx_hash.to_string(), tx);
    }
}

/// Deterministic valid-looking ring member for a global index.
fn decoy_entry(asset: &str, index: u64) -> OutEntry {
    let key_scalar = keccak256_to_scalar(format!("decoy_key_{asset}_{index}").as_bytes());
    let mask_scalar = keccak256_to_scalar(format!("decoy_mask_{asset}_{index}").as_bytes());
    OutEntry {
        key: hex::encode(scalar_mul_base(&key_scalar).compress().to_bytes()),
        mask: hex::encode(commit(1, &mask_scalar).compress().to_bytes()),
        unlocked: true,
        height: index / 10,
        txid: None,
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn get_info(&self) -> WalletResult<NodeInfo> {
        let state = self.state.lock().unwrap();
        let top = state.blocks.last().ok_or_else(|| {
            WalletError::RpcError {
                code: -1,
                message: "empty mock chain".into(),
            }
        })?;
        Ok(NodeInfo {
            height: top.height,
            top_block_hash: top.hash.clone(),
        })
    }

    async fn get_block(&self, height: u64) -> WalletResult<Block> {
        let state = self.state.lock().unwrap();
        state
            .blocks
            .get(height as usize)
            .cloned()
            .ok_or_else(|| WalletError::RpcError {
                code: -1,
                message: format!("no block {height}"),
            })
    }

    async fn get_block_headers_range(&self, lo: u64, hi: u64) -> WalletResult<Vec<BlockHeader>> {
        let state = self.state.lock().unwrap();
        let mut headers = Vec::new();
        for h in lo..=hi {
            if let Some(block) = state.blocks.get(h as usize) {
                headers.push(BlockHeader {
                    height: block.height,
                    hash: block.hash.clone(),
                    prev_hash: block.prev_hash.clone(),
                    timestamp: block.timestamp,
                    reward: 0,
                    major_version: 1,
                    minor_version: 0,
                    weight: 10_000,
                });
            }
        }
        Ok(headers)
    }

    async fn get_transactions(&self, hashes: &[String]) -> WalletResult<Vec<Transaction>> {
        let state = self.state.lock().unwrap();
        hashes
            .iter()
            .map(|h| {
                state.txs.get(h).cloned().ok_or_else(|| WalletError::RpcError {
                    code: -1,
                    message: format!("unknown tx {h}"),
                })
            })
            .collect()
    }

    async fn get_outs(&self, asset_type: &str, indices: &[u64]) -> WalletResult<Vec<OutEntry>> {
        Ok(indices
            .iter()
            .map(|&i| decoy_entry(asset_type, i))
            .collect())
    }

    async fn get_output_distribution(
        &self,
        asset_type: &str,
        _start: u64,
        _end: Option<u64>,
    ) -> WalletResult<Vec<u64>> {
        let state = self.state.lock().unwrap();
        state
            .distribution
            .get(asset_type)
            .cloned()
            .ok_or_else(|| WalletError::RpcError {
                code: -1,
                message: format!("no distribution for {asset_type}"),
            })
    }

    async fn get_output_indexes(&self, tx_hash: &str) -> WalletResult<OutputIndexes> {
        let state = self.state.lock().unwrap();
        state
            .output_indexes
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| WalletError::RpcError {
                code: -1,
                message: format!("no indexes for {tx_hash}"),
            })
    }

    async fn get_tx_pool(&self) -> WalletResult<Vec<Transaction>> {
        Ok(vec![])
    }

    async fn send_raw_transaction(&self, tx_hex: &str, source_asset: &str) -> WalletResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .submitted
            .push((tx_hex.to_string(), source_asset.to_string()));
        Ok(())
    }

    async fn is_key_image_spent(&self, key_images: &[String]) -> WalletResult<Vec<bool>> {
        let state = self.state.lock().unwrap();
        Ok(key_images
            .iter()
            .map(|ki| state.spent_key_images.contains(ki))
            .collect())
    }
}

/// Build a legacy RingCT transaction paying `amount` to the wallet's main
/// address, returning `(tx, one-time output key)`.
pub fn legacy_payment_tx(
    legacy_keys: &salvium_crypto_core::keys::LegacyKeys,
    amount: u64,
    asset: &str,
    salt: u64,
) -> Transaction {
    use salvium_crypto_core::ecdh;
    use salvium_crypto_core::keys::legacy;
    use salvium_wallet::node::{OutputTarget, TxInput, TxOutput};

    let tx_secret = keccak256_to_scalar(format!("tx_secret_{salt}").as_bytes());
    let tx_public = scalar_mul_base(&tx_secret).compress();
    let derivation = legacy::generate_key_derivation(&tx_secret, &legacy_keys.view_public).unwrap();
    let output_key =
        legacy::derive_one_time_public(&derivation, 0, &legacy_keys.spend_public).unwrap();
    let (shared, mask) = ecdh::output_secrets(&derivation, 0);
    let commitment = commit(amount, &mask).compress();
    let encrypted = ecdh::encrypt_amount(amount, &shared);
    let view_tag = ecdh::legacy_view_tag(&derivation, 0);

    let mut extra = vec![0x01u8];
    extra.extend_from_slice(tx_public.as_bytes());

    Transaction {
        version: 2,
        unlock_time: 0,
        inputs: vec![TxInput {
            key_image: hex::encode(keccak256_to_scalar(format!("ki_{salt}").as_bytes()).to_bytes()),
            amount: 0,
            key_offsets: vec![1, 1, 1],
            asset_type: Some(asset.to_string()),
        }],
        outputs: vec![TxOutput {
            amount: 0,
            target: OutputTarget::Tagged {
                key: hex::encode(output_key.as_bytes()),
                view_tag: hex::encode([view_tag]),
                asset_type: asset.to_string(),
            },
        }],
        extra: hex::encode(extra),
        rct: RctData {
            rct_type: 6,
            fee: 1_000,
            encrypted_amounts: vec![hex::encode(encrypted)],
            out_commitments: vec![hex::encode(commitment.as_bytes())],
        },
    }
}

#[allow(dead_code)]
pub fn scalar_from(label: &str) -> Scalar {
    keccak256_to_scalar(label.as_bytes())
}

/// Build a carrot RingCT transaction paying `amount` to the wallet's main
/// carrot address.
#[allow(dead_code)]
pub fn carrot_payment_tx(
    carrot_keys: &salvium_crypto_core::carrot::CarrotKeys,
    amount: u64,
    asset: &str,
    salt: u64,
) -> Transaction {
    use salvium_crypto_core::carrot;
    use salvium_wallet::node::{OutputTarget, TxInput, TxOutput};

    let mut anchor = [0u8; 16];
    anchor[..8].copy_from_slice(&salt.to_le_bytes());
    let mut first_ki = [0u8; 32];
    first_ki[..8].copy_from_slice(&salt.to_le_bytes());
    first_ki[8] = 0xc1;

    let input_context = carrot::input_context_ringct(&first_ki);
    let d_e = carrot::derive_ephemeral_secret(
        &anchor,
        &input_context,
        &carrot_keys.account_spend_public,
        &[0u8; 8],
    );
    let ephemeral =
        carrot::make_ephemeral_pubkey(&d_e, &carrot_keys.account_spend_public).unwrap();
    let s_sr = carrot::ecdh_sender(&d_e, &carrot_keys.main_view_public).unwrap();
    let s_ctx = carrot::sender_receiver_secret(&s_sr, &ephemeral, &input_context);
    let blinding = carrot::make_amount_blinding_factor(
        &s_ctx,
        amount,
        &carrot_keys.account_spend_public,
        carrot::EnoteType::Payment,
    );
    let commitment = carrot::make_amount_commitment(amount, &blinding);
    let output_key =
        carrot::one_time_address(&carrot_keys.account_spend_public, &s_ctx, &commitment).unwrap();
    let view_tag = carrot::view_tag(&s_sr, &input_context, &output_key);
    let enc_amount = carrot::make_encrypted_amount(amount, &s_ctx, &output_key);
    let enc_anchor = carrot::encrypt_anchor(&anchor, &s_ctx, &output_key);

    let mut extra = vec![0x01u8];
    extra.extend_from_slice(ephemeral.as_bytes());

    Transaction {
        version: 4,
        unlock_time: 0,
        inputs: vec![TxInput {
            key_image: hex::encode(first_ki),
            amount: 0,
            key_offsets: vec![1, 1, 1],
            asset_type: Some(asset.to_string()),
        }],
        outputs: vec![TxOutput {
            amount: 0,
            target: OutputTarget::CarrotV1 {
                key: hex::encode(output_key.as_bytes()),
                view_tag: hex::encode(view_tag),
                asset_type: asset.to_string(),
                encrypted_janus_anchor: hex::encode(enc_anchor),
            },
        }],
        extra: hex::encode(extra),
        rct: RctData {
            rct_type: 9,
            fee: 600,
            encrypted_amounts: vec![hex::encode(enc_amount)],
            out_commitments: vec![hex::encode(commitment.as_bytes())],
        },
    }
}
