//! The wallet session: key trees, sync loop, reorg handling, and the
//! transfer entry points.
//!
//! A session owns one wallet's key material, its storage, a node handle and
//! the chain bookkeeping. [`WalletSession::sync`] drives the scanner across
//! the missing block range; a block-hash mismatch against the node triggers
//! the reorg recipe before scanning resumes.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use salvium_common::{Network, WalletError, WalletResult};
use salvium_crypto_core::address::{Address, AddressFormat, AddressKind, AddressNetwork};
use salvium_crypto_core::carrot::CarrotKeys;
use salvium_crypto_core::keys::LegacyKeys;

use crate::builder::{
    BuiltTransaction, TransferDestination, TransferOptions, TxBuilder, WalletContext,
};
use crate::chain::{BlockAdmission, ChainTracker};
use crate::node::{with_retry, NodeClient, RetryPolicy};
use crate::scanner::Scanner;
use crate::storage::{OutputFilter, WalletStorage};
use crate::subaddress::SubaddressTable;

/// Sync behaviour knobs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// First height the wallet cares about (its birthday).
    pub start_height: u64,
    /// Blocks fetched per header batch while locating a reorg point.
    pub reorg_batch: u64,
    /// Node retry policy.
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            start_height: 0,
            reorg_batch: 32,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub scanned_blocks: u64,
    pub found_outputs: u64,
    pub spent_outputs: u64,
    /// Height the reorg rolled back to, when one was detected.
    pub reorg_height: Option<u64>,
}

/// One open wallet.
pub struct WalletSession {
    legacy: LegacyKeys,
    carrot: CarrotKeys,
    table: SubaddressTable,
    scanner: Scanner,
    network: Network,
    node: Arc<dyn NodeClient>,
    storage: Box<dyn WalletStorage>,
    config: SyncConfig,
    cancel: CancellationToken,
    tracker: Option<ChainTracker>,
    tip_height: u64,
}

impl WalletSession {
    /// Open a wallet from its 32-byte master secret.
    ///
    /// Derives both key trees and precomputes the subaddress tables; key
    /// material is created here once and never rewritten.
    pub fn open(
        master: &[u8; 32],
        network: Network,
        node: Arc<dyn NodeClient>,
        storage: Box<dyn WalletStorage>,
        config: SyncConfig,
    ) -> WalletResult<Self> {
        let legacy = LegacyKeys::derive(master);
        let carrot = CarrotKeys::derive(master)?;
        let table = SubaddressTable::with_default_lookahead(&legacy, &carrot)?;
        let scanner = Scanner::new(legacy.clone(), carrot.clone(), network);
        info!(%network, "wallet session opened");
        Ok(WalletSession {
            legacy,
            carrot,
            table,
            scanner,
            network,
            node,
            storage,
            config,
            cancel: CancellationToken::new(),
            tracker: None,
            tip_height: 0,
        })
    }

    /// Token that aborts sync and builds between node calls.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The wallet's legacy main address.
    pub fn legacy_address(&self) -> Address {
        Address::standard(
            self.address_network(),
            AddressFormat::Legacy,
            self.legacy.spend_public,
            self.legacy.view_public,
        )
    }

    /// The wallet's carrot main address.
    pub fn carrot_address(&self) -> Address {
        Address::standard(
            self.address_network(),
            AddressFormat::Carrot,
            self.carrot.account_spend_public,
            self.carrot.main_view_public,
        )
    }

    fn address_network(&self) -> AddressNetwork {
        match self.network {
            Network::Mainnet => AddressNetwork::Mainnet,
            Network::Testnet => AddressNetwork::Testnet,
            Network::Stagenet => AddressNetwork::Stagenet,
        }
    }

    /// `(total, unlocked)` balance for an asset.
    pub fn balance(&self, asset_type: &str) -> (u64, u64) {
        let outputs = self.storage.get_outputs(&OutputFilter {
            asset_type: Some(asset_type.to_string()),
            unspent_only: true,
            unfrozen_only: false,
            spendable_at: None,
        });
        let total = outputs.iter().map(|o| o.amount).sum();
        let unlocked = outputs
            .iter()
            .filter(|o| o.is_spendable(self.tip_height))
            .map(|o| o.amount)
            .sum();
        (total, unlocked)
    }

    /// Direct read access to storage (listings, diagnostics).
    pub fn storage(&self) -> &dyn WalletStorage {
        self.storage.as_ref()
    }

    /// One sync pass: reorg check, then scan up to the node's tip.
    pub async fn sync(&mut self) -> WalletResult<SyncReport> {
        let mut report = SyncReport::default();

        let node = Arc::clone(&self.node);
        let retry = self.config.retry.clone();
        let info = with_retry(&retry, || node.get_info()).await?;
        self.tip_height = info.height;

        // Reorg detection before anything else.
        if let Some(rolled_back_to) = self.detect_and_rollback().await? {
            report.reorg_height = Some(rolled_back_to);
        }

        let resume = match self.storage.last_block_height() {
            Some(last) => last + 1,
            None => self.config.start_height,
        };
        if resume > info.height {
            return Ok(report);
        }

        debug!(from = resume, to = info.height, "scanning range");
        let mut known: HashSet<[u8; 32]> = self
            .storage
            .get_outputs(&OutputFilter::default())
            .into_iter()
            .map(|o| o.key_image)
            .collect();

        for height in resume..=info.height {
            if self.cancel.is_cancelled() {
                return Err(WalletError::Cancelled);
            }
            let block = with_retry(&retry, || node.get_block(height)).await?;

            // The parent must line up with what we stored; a mismatch means
            // the chain moved under us mid-scan.
            if height > self.config.start_height {
                if let Some(stored_prev) = self.storage.get_block_hash(height - 1) {
                    if stored_prev != block.prev_hash {
                        warn!(height, "parent hash moved mid-scan, deferring to next pass");
                        break;
                    }
                }
            }

            let txs = if block.tx_hashes.is_empty() {
                vec![]
            } else {
                let hashes = block.tx_hashes.clone();
                let fetched = with_retry(&retry, || node.get_transactions(&hashes)).await?;
                if fetched.len() != hashes.len() {
                    return Err(WalletError::RpcError {
                        code: -2,
                        message: format!(
                            "node returned {} of {} transactions for block {height}",
                            fetched.len(),
                            hashes.len()
                        ),
                    });
                }
                hashes.into_iter().zip(fetched).collect()
            };

            let scan = self.scanner.scan_block(&self.table, &block, &txs, &known)?;

            // Within a block outputs land in transaction order; spends are
            // applied afterwards so a same-block receive-then-spend settles
            // as spent.
            for output in scan.outputs {
                known.insert(output.key_image);
                report.found_outputs += 1;
                self.storage.put_output(output)?;
            }
            for spend in scan.spends {
                report.spent_outputs += 1;
                self.storage
                    .mark_output_spent(&spend.key_image, &spend.tx_hash, spend.height)?;
            }
            for tx in scan.transactions {
                self.storage.put_transaction(tx)?;
            }
            self.storage.put_block_hash(height, &block.hash)?;
            report.scanned_blocks += 1;

            self.track_header(&block);
        }

        if let Some(tracker) = &mut self.tracker {
            tracker.prune_alt();
        }
        info!(
            scanned = report.scanned_blocks,
            found = report.found_outputs,
            spent = report.spent_outputs,
            tip = info.height,
            "sync pass complete"
        );
        Ok(report)
    }

    /// Locate the lowest mismatching height and apply the rollback recipe.
    ///
    /// Returns the height rolled back to (`h* - 1`).
    async fn detect_and_rollback(&mut self) -> WalletResult<Option<u64>> {
        let Some(local_top) = self.storage.last_block_height() else {
            return Ok(None);
        };
        let node = Arc::clone(&self.node);
        let retry = self.config.retry.clone();

        // Fast path: our top block still matches.
        let headers = with_retry(&retry, || {
            node.get_block_headers_range(local_top, local_top)
        })
        .await?;
        let top_matches = headers
            .first()
            .map(|h| Some(h.hash.clone()) == self.storage.get_block_hash(local_top))
            .unwrap_or(false);
        if top_matches {
            return Ok(None);
        }

        // Walk back in batches to the highest height that still agrees.
        let mut hi = local_top;
        let mut agree_height: Option<u64> = None;
        while agree_height.is_none() {
            let lo = hi.saturating_sub(self.config.reorg_batch - 1).max(self.config.start_height);
            let headers = with_retry(&retry, || node.get_block_headers_range(lo, hi)).await?;
            for header in headers.iter().rev() {
                if self.storage.get_block_hash(header.height).as_deref() == Some(&header.hash) {
                    agree_height = Some(header.height);
                    break;
                }
            }
            if lo == self.config.start_height {
                break;
            }
            hi = lo - 1;
        }

        // Everything above the agreement point is gone; h* is the height
        // right after it.
        let rollback_to = match agree_height {
            Some(h) => h,
            None => self.config.start_height.saturating_sub(1),
        };
        warn!(rollback_to, "reorg detected, rolling back wallet state");
        self.storage.rollback_to(rollback_to)?;
        self.tracker = None;
        Ok(Some(rollback_to))
    }

    fn track_header(&mut self, block: &crate::node::Block) {
        let header = crate::node::BlockHeader {
            height: block.height,
            hash: block.hash.clone(),
            prev_hash: block.prev_hash.clone(),
            timestamp: block.timestamp,
            reward: 0,
            major_version: 0,
            minor_version: 0,
            weight: 0,
        };
        let local_time = now_unix();
        match &mut self.tracker {
            None => {
                self.tracker = Some(ChainTracker::new(
                    block.height,
                    &block.hash,
                    block.timestamp,
                ));
            }
            Some(tracker) => {
                let (admission, event) = tracker.handle_block(&header, local_time);
                if admission == BlockAdmission::Orphaned {
                    debug!(height = block.height, "tracker orphaned a node block");
                }
                if let Some(event) = event {
                    // The tracker switched chains underneath the scanner;
                    // the storage rollback happens on the next pass via the
                    // block-hash walk, which will disagree from the split.
                    warn!(?event, "tracker reported a chain switch");
                }
            }
        }
    }

    /// Send to one or more destinations.
    pub async fn transfer(
        &mut self,
        destinations: Vec<TransferDestination>,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        let builder = TxBuilder::new(
            self.node.as_ref(),
            WalletContext {
                legacy: &self.legacy,
                carrot: &self.carrot,
                table: &self.table,
                network: self.network,
            },
        )
        .with_cancel_token(self.cancel.child_token());
        builder
            .transfer(self.storage.as_mut(), destinations, options)
            .await
    }

    /// Sweep everything spendable to one destination.
    pub async fn sweep(
        &mut self,
        destination: Address,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        let builder = TxBuilder::new(
            self.node.as_ref(),
            WalletContext {
                legacy: &self.legacy,
                carrot: &self.carrot,
                table: &self.table,
                network: self.network,
            },
        )
        .with_cancel_token(self.cancel.child_token());
        builder.sweep(self.storage.as_mut(), destination, options).await
    }

    /// Stake funds with the network.
    pub async fn stake(
        &mut self,
        amount: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        let builder = TxBuilder::new(
            self.node.as_ref(),
            WalletContext {
                legacy: &self.legacy,
                carrot: &self.carrot,
                table: &self.table,
                network: self.network,
            },
        )
        .with_cancel_token(self.cancel.child_token());
        builder.stake(self.storage.as_mut(), amount, options).await
    }

    /// Burn funds.
    pub async fn burn(
        &mut self,
        amount: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        let builder = TxBuilder::new(
            self.node.as_ref(),
            WalletContext {
                legacy: &self.legacy,
                carrot: &self.carrot,
                table: &self.table,
                network: self.network,
            },
        )
        .with_cancel_token(self.cancel.child_token());
        builder.burn(self.storage.as_mut(), amount, options).await
    }

    /// Convert between ledger assets.
    #[allow(clippy::too_many_arguments)]
    pub async fn convert(
        &mut self,
        amount: u64,
        source_asset: &str,
        dest_asset: &str,
        destination: Address,
        slippage_limit: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        if destination.kind == AddressKind::Integrated && destination.payment_id.is_none() {
            return Err(WalletError::InvalidInput(
                "integrated destination without payment id".into(),
            ));
        }
        let builder = TxBuilder::new(
            self.node.as_ref(),
            WalletContext {
                legacy: &self.legacy,
                carrot: &self.carrot,
                table: &self.table,
                network: self.network,
            },
        )
        .with_cancel_token(self.cancel.child_token());
        builder
            .convert(
                self.storage.as_mut(),
                amount,
                source_asset,
                dest_asset,
                destination,
                slippage_limit,
                options,
            )
            .await
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
