//! Reorg-safe wallet storage.
//!
//! [`WalletStorage`] is the narrow mutation surface the scanner, builder and
//! session share. The in-memory [`MemoryStorage`] is the reference
//! implementation; a durable backend must provide the same per-call
//! semantics plus either an outer lock or a batch-write API so the reorg
//! recipe stays atomic from the session's point of view.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use salvium_common::{WalletError, WalletResult};

/// Direction of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    In,
    Out,
    Both,
}

/// One owned on-chain output.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletOutput {
    /// Unique index of the output; at most one record per key image.
    pub key_image: [u8; 32],
    pub tx_hash: String,
    /// Index within the transaction's outputs.
    pub output_index: u64,
    /// Tx pubkey (legacy) or enote ephemeral pubkey (carrot).
    pub tx_pub_key: [u8; 32],
    pub output_public_key: [u8; 32],
    pub amount: u64,
    /// Commitment blinding; the identity scalar for coinbase outputs.
    pub mask: [u8; 32],
    /// Pedersen commitment; derivable for coinbase, hence optional.
    pub commitment: Option<[u8; 32]>,
    /// `(major, minor)`; `(0, 0)` is the main address.
    pub subaddress_index: (u32, u32),
    pub is_carrot: bool,
    /// Contextualized sender-receiver secret, required to spend carrot
    /// outputs.
    pub carrot_shared_secret: Option<[u8; 32]>,
    pub encrypted_anchor: Option<[u8; 16]>,
    pub asset_type: String,
    pub block_height: u64,
    /// Spendable once the chain tip reaches this height.
    pub unlock_height: u64,
    /// Within-asset global position; resolved lazily from the node.
    pub global_index: Option<u64>,
    pub is_spent: bool,
    pub spent_tx_hash: Option<String>,
    pub spent_height: Option<u64>,
    pub is_frozen: bool,
}

impl WalletOutput {
    /// Whether the output can enter a spend at the given chain height.
    pub fn is_spendable(&self, tip_height: u64) -> bool {
        if self.is_spent || self.is_frozen || tip_height < self.unlock_height {
            return false;
        }
        // A carrot output without its shared secret or commitment cannot
        // produce a valid ring entry.
        if self.is_carrot && (self.carrot_shared_secret.is_none() || self.commitment.is_none()) {
            return false;
        }
        true
    }
}

/// One wallet-relevant transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub tx_hash: String,
    pub block_height: u64,
    pub direction: TransferDirection,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: u64,
    /// Decrypted payment id, when the transaction carried one for us.
    pub payment_id: Option<[u8; 8]>,
}

/// Filter for [`WalletStorage::get_outputs`].
#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    pub asset_type: Option<String>,
    pub unspent_only: bool,
    pub unfrozen_only: bool,
    /// Keep only outputs unlocked at this height.
    pub spendable_at: Option<u64>,
}

/// The storage surface. All operations are idempotent where meaningful.
pub trait WalletStorage: Send {
    fn put_output(&mut self, output: WalletOutput) -> WalletResult<()>;
    fn get_output(&self, key_image: &[u8; 32]) -> Option<WalletOutput>;
    fn get_outputs(&self, filter: &OutputFilter) -> Vec<WalletOutput>;
    /// Remove outputs with `block_height > height`.
    fn delete_outputs_above(&mut self, height: u64) -> WalletResult<()>;

    fn mark_output_spent(
        &mut self,
        key_image: &[u8; 32],
        tx_hash: &str,
        spent_height: u64,
    ) -> WalletResult<()>;
    /// Clear spent state recorded above `height`.
    fn unspend_outputs_above(&mut self, height: u64) -> WalletResult<()>;

    fn set_global_index(&mut self, key_image: &[u8; 32], global_index: u64) -> WalletResult<()>;
    fn freeze_output(&mut self, key_image: &[u8; 32], frozen: bool) -> WalletResult<()>;

    fn put_transaction(&mut self, tx: WalletTransaction) -> WalletResult<()>;
    fn get_transactions(&self) -> Vec<WalletTransaction>;
    fn delete_transactions_above(&mut self, height: u64) -> WalletResult<()>;

    fn put_block_hash(&mut self, height: u64, hash: &str) -> WalletResult<()>;
    fn get_block_hash(&self, height: u64) -> Option<String>;
    fn delete_block_hashes_above(&mut self, height: u64) -> WalletResult<()>;
    /// Highest height with a stored block hash.
    fn last_block_height(&self) -> Option<u64>;

    fn clear(&mut self) -> WalletResult<()>;

    /// The reorg recipe: forget everything the chain no longer contains.
    ///
    /// Applied as one uninterruptible sequence; after it returns, no output,
    /// transaction, spent mark or block hash refers to a height above
    /// `height`.
    fn rollback_to(&mut self, height: u64) -> WalletResult<()> {
        self.delete_outputs_above(height)?;
        self.delete_transactions_above(height)?;
        self.unspend_outputs_above(height)?;
        self.delete_block_hashes_above(height)?;
        Ok(())
    }
}

/// The in-memory reference storage.
#[derive(Default)]
pub struct MemoryStorage {
    outputs: HashMap<[u8; 32], WalletOutput>,
    transactions: HashMap<String, WalletTransaction>,
    block_hashes: BTreeMap<u64, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStorage for MemoryStorage {
    fn put_output(&mut self, output: WalletOutput) -> WalletResult<()> {
        self.outputs.insert(output.key_image, output);
        Ok(())
    }

    fn get_output(&self, key_image: &[u8; 32]) -> Option<WalletOutput> {
        self.outputs.get(key_image).cloned()
    }

    fn get_outputs(&self, filter: &OutputFilter) -> Vec<WalletOutput> {
        let mut found: Vec<WalletOutput> = self
            .outputs
            .values()
            .filter(|o| {
                if let Some(asset) = &filter.asset_type {
                    if &o.asset_type != asset {
                        return false;
                    }
                }
                if filter.unspent_only && o.is_spent {
                    return false;
                }
                if filter.unfrozen_only && o.is_frozen {
                    return false;
                }
                if let Some(tip) = filter.spendable_at {
                    if tip < o.unlock_height {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        // Deterministic order: oldest first, then tx position.
        found.sort_by(|a, b| {
            (a.block_height, &a.tx_hash, a.output_index)
                .cmp(&(b.block_height, &b.tx_hash, b.output_index))
        });
        found
    }

    fn delete_outputs_above(&mut self, height: u64) -> WalletResult<()> {
        self.outputs.retain(|_, o| o.block_height <= height);
        Ok(())
    }

    fn mark_output_spent(
        &mut self,
        key_image: &[u8; 32],
        tx_hash: &str,
        spent_height: u64,
    ) -> WalletResult<()> {
        let output = self.outputs.get_mut(key_image).ok_or_else(|| {
            WalletError::Internal(format!(
                "mark_output_spent: unknown key image {}",
                hex::encode(key_image)
            ))
        })?;
        output.is_spent = true;
        output.spent_tx_hash = Some(tx_hash.to_string());
        output.spent_height = Some(spent_height);
        Ok(())
    }

    fn unspend_outputs_above(&mut self, height: u64) -> WalletResult<()> {
        for output in self.outputs.values_mut() {
            if matches!(output.spent_height, Some(h) if h > height) {
                output.is_spent = false;
                output.spent_tx_hash = None;
                output.spent_height = None;
            }
        }
        Ok(())
    }

    fn set_global_index(&mut self, key_image: &[u8; 32], global_index: u64) -> WalletResult<()> {
        if let Some(output) = self.outputs.get_mut(key_image) {
            output.global_index = Some(global_index);
        }
        Ok(())
    }

    fn freeze_output(&mut self, key_image: &[u8; 32], frozen: bool) -> WalletResult<()> {
        let output = self.outputs.get_mut(key_image).ok_or_else(|| {
            WalletError::InvalidInput(format!(
                "freeze_output: unknown key image {}",
                hex::encode(key_image)
            ))
        })?;
        output.is_frozen = frozen;
        Ok(())
    }

    fn put_transaction(&mut self, tx: WalletTransaction) -> WalletResult<()> {
        self.transactions.insert(tx.tx_hash.clone(), tx);
        Ok(())
    }

    fn get_transactions(&self) -> Vec<WalletTransaction> {
        let mut txs: Vec<WalletTransaction> = self.transactions.values().cloned().collect();
        txs.sort_by(|a, b| (a.block_height, &a.tx_hash).cmp(&(b.block_height, &b.tx_hash)));
        txs
    }

    fn delete_transactions_above(&mut self, height: u64) -> WalletResult<()> {
        self.transactions.retain(|_, tx| tx.block_height <= height);
        Ok(())
    }

    fn put_block_hash(&mut self, height: u64, hash: &str) -> WalletResult<()> {
        self.block_hashes.insert(height, hash.to_string());
        Ok(())
    }

    fn get_block_hash(&self, height: u64) -> Option<String> {
        self.block_hashes.get(&height).cloned()
    }

    fn delete_block_hashes_above(&mut self, height: u64) -> WalletResult<()> {
        self.block_hashes.split_off(&(height + 1));
        Ok(())
    }

    fn last_block_height(&self) -> Option<u64> {
        self.block_hashes.keys().next_back().copied()
    }

    fn clear(&mut self) -> WalletResult<()> {
        self.outputs.clear();
        self.transactions.clear();
        self.block_hashes.clear();
        Ok(())
    }
}
