//! Transaction builder.
//!
//! One pipeline serves all four transaction types plus sweeps: resolve the
//! fork policy, select UTXOs against a converging fee estimate, resolve
//! global indices, prepare rings and one-time secrets, construct outputs,
//! prove ranges, balance commitments, sign (CLSAG or TCLSAG per fork) and
//! serialize. The builder leaves storage untouched unless a broadcast
//! succeeds.

mod inputs;
mod outputs;
mod serialize;

pub use inputs::PreparedInput;
pub use outputs::{OutputRequest, PlannedOutput, PlannedOutputs};
pub use serialize::{
    from_relative_offsets, to_relative_offsets, ProtocolData, RctEnvelope, RingSignatures,
    SerializedTx, TxPrefix, WireInput, WireOutput,
};

use curve25519_dalek::Scalar;
use monero_bulletproofs_mirror::Bulletproof;
use monero_primitives_mirror::Commitment;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use salvium_common::consts::{ASSET_BURN, SWEEP_MAX_INPUTS};
use salvium_common::{Network, WalletError, WalletResult};
use salvium_crypto_core::address::{Address, AddressFormat, AddressNetwork};
use salvium_crypto_core::carrot::{self, CarrotKeys};
use salvium_crypto_core::clsag::{sign_clsag, sign_tclsag, RingMember, TaggedRingMember};
use salvium_crypto_core::keys::{key_image, LegacyKeys};

use crate::fee::{FeeEstimator, FeePriority};
use crate::node::NodeClient;
use crate::policy::{self, SigType, TxType};
use crate::ring_selection::DecoySelector;
use crate::storage::{OutputFilter, TransferDirection, WalletOutput, WalletStorage, WalletTransaction};
use crate::subaddress::SubaddressTable;

/// Maximum commitments one aggregated Bulletproof+ covers.
const MAX_BP_COMMITMENTS: usize = 16;

/// Fee/selection convergence bound.
const FEE_ITERATIONS: usize = 8;

/// The wallet key material and lookup tables the builder works against.
pub struct WalletContext<'a> {
    pub legacy: &'a LegacyKeys,
    pub carrot: &'a CarrotKeys,
    pub table: &'a SubaddressTable,
    pub network: Network,
}

/// One transfer destination.
#[derive(Debug, Clone)]
pub struct TransferDestination {
    pub address: Address,
    pub amount: u64,
}

/// Options shared by all builder entry points.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub priority: FeePriority,
    /// Deduct the fee from the first destination instead of adding it.
    pub subtract_fee_from_amount: bool,
    /// Build and return the blob without broadcasting or touching storage.
    pub dry_run: bool,
}

/// A fully built (and possibly broadcast) transaction.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub tx_hash: [u8; 32],
    pub tx_hex: String,
    pub tx_type: TxType,
    pub fee: u64,
    /// Total paid to destinations (or burnt/staked).
    pub amount: u64,
    pub change: u64,
    pub spent_key_images: Vec<[u8; 32]>,
    /// Per-input rings as signed (sorted indices plus real position).
    pub rings: Vec<crate::ring_selection::SelectedRing>,
    pub broadcast: bool,
}

fn address_network(network: Network) -> AddressNetwork {
    match network {
        Network::Mainnet => AddressNetwork::Mainnet,
        Network::Testnet => AddressNetwork::Testnet,
        Network::Stagenet => AddressNetwork::Stagenet,
    }
}

impl<'a> WalletContext<'a> {
    /// The wallet's own main address in the era's format.
    pub fn own_address(&self, carrot_era: bool) -> Address {
        if carrot_era {
            Address::standard(
                address_network(self.network),
                AddressFormat::Carrot,
                self.carrot.account_spend_public,
                self.carrot.main_view_public,
            )
        } else {
            Address::standard(
                address_network(self.network),
                AddressFormat::Legacy,
                self.legacy.spend_public,
                self.legacy.view_public,
            )
        }
    }
}

/// Internal description of what the pipeline should build.
struct TxPlan {
    tx_type: TxType,
    /// External destinations; empty for STAKE/BURN/CONVERT.
    destinations: Vec<TransferDestination>,
    /// Amount consumed without creating an output (stake/burn/convert).
    amount_consumed: u64,
    protocol: ProtocolData,
    /// Spend every spendable output, single destination, no change.
    sweep: bool,
    options: TransferOptions,
}

/// The transaction builder.
pub struct TxBuilder<'a> {
    node: &'a dyn NodeClient,
    ctx: WalletContext<'a>,
    fee_estimator: FeeEstimator,
    decoys: DecoySelector,
    cancel: CancellationToken,
}

impl<'a> TxBuilder<'a> {
    pub fn new(node: &'a dyn NodeClient, ctx: WalletContext<'a>) -> Self {
        TxBuilder {
            node,
            ctx,
            fee_estimator: FeeEstimator::default(),
            decoys: DecoySelector::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token; checked between node requests.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self) -> WalletResult<()> {
        if self.cancel.is_cancelled() {
            Err(WalletError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Plain transfer to one or more destinations.
    pub async fn transfer(
        &self,
        storage: &mut dyn WalletStorage,
        destinations: Vec<TransferDestination>,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        if destinations.is_empty() {
            return Err(WalletError::InvalidInput("no destinations".into()));
        }
        if destinations.iter().any(|d| d.amount == 0) {
            return Err(WalletError::InvalidInput("zero-amount destination".into()));
        }
        self.build(
            storage,
            TxPlan {
                tx_type: TxType::Transfer,
                destinations,
                amount_consumed: 0,
                protocol: ProtocolData::default(),
                sweep: false,
                options,
            },
        )
        .await
    }

    /// Sweep all spendable outputs of the current asset to one destination.
    pub async fn sweep(
        &self,
        storage: &mut dyn WalletStorage,
        destination: Address,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        self.build(
            storage,
            TxPlan {
                tx_type: TxType::Transfer,
                destinations: vec![TransferDestination {
                    address: destination,
                    amount: 0, // determined by the swept total minus fee
                }],
                amount_consumed: 0,
                protocol: ProtocolData::default(),
                sweep: true,
                options,
            },
        )
        .await
    }

    /// Stake: lock funds with the network; yield returns via protocol
    /// transactions to the wallet's own address.
    pub async fn stake(
        &self,
        storage: &mut dyn WalletStorage,
        amount: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        if amount == 0 {
            return Err(WalletError::InvalidInput("zero stake amount".into()));
        }
        let info = self.node.get_info().await?;
        let fork = policy::policy(info.height, self.ctx.network);
        let return_address = self.ctx.own_address(fork.carrot_active).encode()?;
        self.build(
            storage,
            TxPlan {
                tx_type: TxType::Stake,
                destinations: vec![],
                amount_consumed: amount,
                protocol: ProtocolData {
                    amount_burnt: amount,
                    return_address: Some(return_address),
                    ..ProtocolData::default()
                },
                sweep: false,
                options,
            },
        )
        .await
    }

    /// Burn: destroy funds; only change returns.
    pub async fn burn(
        &self,
        storage: &mut dyn WalletStorage,
        amount: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        if amount == 0 {
            return Err(WalletError::InvalidInput("zero burn amount".into()));
        }
        let info = self.node.get_info().await?;
        let fork = policy::policy(info.height, self.ctx.network);
        self.build(
            storage,
            TxPlan {
                tx_type: TxType::Burn,
                destinations: vec![],
                amount_consumed: amount,
                protocol: ProtocolData {
                    amount_burnt: amount,
                    source_asset_type: fork.asset_type.to_string(),
                    destination_asset_type: ASSET_BURN.to_string(),
                    ..ProtocolData::default()
                },
                sweep: false,
                options,
            },
        )
        .await
    }

    /// Convert between ledger assets; the network credits the destination
    /// on inclusion, subject to the slippage limit.
    pub async fn convert(
        &self,
        storage: &mut dyn WalletStorage,
        amount: u64,
        source_asset: &str,
        dest_asset: &str,
        destination: Address,
        slippage_limit: u64,
        options: TransferOptions,
    ) -> WalletResult<BuiltTransaction> {
        if amount == 0 {
            return Err(WalletError::InvalidInput("zero convert amount".into()));
        }
        if source_asset == dest_asset {
            return Err(WalletError::InvalidInput(
                "convert requires distinct assets".into(),
            ));
        }
        self.build(
            storage,
            TxPlan {
                tx_type: TxType::Convert,
                destinations: vec![],
                amount_consumed: amount,
                protocol: ProtocolData {
                    amount_burnt: amount,
                    amount_slippage_limit: slippage_limit,
                    source_asset_type: source_asset.to_string(),
                    destination_asset_type: dest_asset.to_string(),
                    return_address: Some(destination.encode()?),
                },
                sweep: false,
                options,
            },
        )
        .await
    }

    /// The shared pipeline.
    async fn build(
        &self,
        storage: &mut dyn WalletStorage,
        mut plan: TxPlan,
    ) -> WalletResult<BuiltTransaction> {
        // 1. Resolve the policy at the current height.
        self.check_cancelled()?;
        let info = self.node.get_info().await?;
        let tip_height = info.height;
        let fork = policy::policy(tip_height, self.ctx.network);
        let asset_type = if plan.protocol.source_asset_type.is_empty() {
            fork.asset_type.to_string()
        } else {
            plan.protocol.source_asset_type.clone()
        };
        info!(
            tx_type = ?plan.tx_type,
            hf = fork.hf_version,
            rct = fork.rct_type.as_u8(),
            asset = %asset_type,
            "building transaction"
        );

        // 2. Spendable candidates.
        let filter = OutputFilter {
            asset_type: Some(asset_type.clone()),
            unspent_only: true,
            unfrozen_only: true,
            spendable_at: Some(tip_height),
        };
        let mut candidates: Vec<WalletOutput> = storage
            .get_outputs(&filter)
            .into_iter()
            .filter(|o| o.is_spendable(tip_height))
            .collect();

        // 3..5. Fee/selection convergence.
        let total_sends: u64 = plan.destinations.iter().map(|d| d.amount).sum::<u64>()
            + plan.amount_consumed;
        let (mut selected, fee) = if plan.sweep {
            candidates.truncate(SWEEP_MAX_INPUTS);
            if candidates.is_empty() {
                return Err(WalletError::InsufficientBalance {
                    available: 0,
                    required: 1,
                });
            }
            let fee = self
                .fee_estimator
                .estimate_fee(candidates.len(), 1, plan.options.priority);
            (candidates.clone(), fee)
        } else {
            self.converge_selection(&candidates, total_sends, &plan)?
        };

        // Sweep pays everything minus fee to the single destination.
        if plan.sweep {
            let swept: u64 = selected.iter().map(|o| o.amount).sum();
            if swept <= fee {
                return Err(WalletError::InsufficientBalance {
                    available: swept,
                    required: fee + 1,
                });
            }
            plan.destinations[0].amount = swept - fee;
        } else if plan.options.subtract_fee_from_amount {
            let first = plan
                .destinations
                .first_mut()
                .ok_or_else(|| WalletError::InvalidInput("no destination to subtract fee".into()))?;
            if first.amount <= fee {
                return Err(WalletError::InvalidInput(format!(
                    "destination amount {} cannot cover the fee {fee}",
                    first.amount
                )));
            }
            first.amount -= fee;
        }

        // 6. Global-index resolution; deferred outputs force reselection.
        self.check_cancelled()?;
        let unresolved = inputs::resolve_global_indices(self.node, storage, &mut selected).await?;
        if !unresolved.is_empty() {
            return Err(WalletError::PolicyViolation(format!(
                "{} selected outputs have unresolved global indices",
                unresolved.len()
            )));
        }

        // 7..8. One-time secrets and rings.
        self.check_cancelled()?;
        let distribution = self
            .node
            .get_output_distribution(&asset_type, 0, None)
            .await?;
        let mut prepared: Vec<PreparedInput> = Vec::with_capacity(selected.len());
        for output in &selected {
            self.check_cancelled()?;
            let (secret_g, secret_t) = inputs::derive_input_secrets(&self.ctx, output)?;
            let mask = Scalar::from_bytes_mod_order(output.mask);
            let (ring, ring_keys, ring_commitments) =
                inputs::build_ring(self.node, &self.decoys, &distribution, output).await?;
            prepared.push(PreparedInput {
                source: output.clone(),
                one_time_secret: secret_g,
                one_time_secret_t: secret_t,
                mask,
                ring,
                ring_keys,
                ring_commitments,
            });
        }

        // Key images drive the input context for carrot outputs.
        let key_images: Vec<[u8; 32]> = prepared
            .iter()
            .map(|input| {
                key_image(
                    &input.one_time_secret,
                    &curve25519_dalek::edwards::CompressedEdwardsY(
                        input.source.output_public_key,
                    ),
                )
                .to_bytes()
            })
            .collect();

        // 9. Destination and change outputs.
        let input_sum: u64 = selected.iter().map(|o| o.amount).sum();
        let sends_after_fee: u64 = plan.destinations.iter().map(|d| d.amount).sum::<u64>()
            + plan.amount_consumed;
        let change = if plan.sweep {
            0
        } else if plan.options.subtract_fee_from_amount {
            input_sum - sends_after_fee - fee
        } else {
            input_sum - total_sends - fee
        };

        let mut requests: Vec<OutputRequest> = plan
            .destinations
            .iter()
            .map(|d| OutputRequest {
                address: d.address.clone(),
                amount: d.amount,
                is_change: false,
            })
            .collect();
        if !plan.sweep {
            // Always return change (possibly zero) so every transaction has
            // at least one output to range-prove.
            requests.push(OutputRequest {
                address: self.ctx.own_address(fork.carrot_active),
                amount: change,
                is_change: true,
            });
        }

        let planned = if fork.carrot_active {
            let input_context = carrot::input_context_ringct(&key_images[0]);
            outputs::plan_carrot_outputs(&requests, &asset_type, &input_context)?
        } else {
            outputs::plan_legacy_outputs(&requests, &asset_type)?
        };

        // 10..11. Range proofs and pseudo-output balancing.
        let output_masks: Vec<Scalar> = planned.outputs.iter().map(|o| o.mask).collect();
        let pseudo_masks = outputs::balance_pseudo_masks(prepared.len(), &output_masks);

        let mut proof_amounts: Vec<u64> = planned.outputs.iter().map(|o| o.amount).collect();
        let mut proof_masks = output_masks.clone();
        if fork.rct_type.as_u8() >= 8
            && proof_amounts.len() + prepared.len() <= MAX_BP_COMMITMENTS
        {
            // Fork 6+ aggregates pseudo-input commitments into the proof.
            proof_amounts.extend(prepared.iter().map(|i| i.source.amount));
            proof_masks.extend(pseudo_masks.iter().copied());
        }
        let range_proof = generate_range_proof(&proof_amounts, &proof_masks)?;

        // 12..13. Serialize the prefix, sign every input, assemble the blob.
        let extra = build_extra(&planned.output_pub_keys, &plan, &planned)?;
        let prefix = TxPrefix {
            version: fork.tx_version_for(plan.tx_type),
            unlock_time: 0,
            tx_type: plan.tx_type,
            inputs: prepared
                .iter()
                .zip(&key_images)
                .map(|(input, ki)| WireInput {
                    key_image: *ki,
                    asset_type: asset_type.clone(),
                    ring_indices: input.ring.indices.clone(),
                })
                .collect(),
            outputs: planned
                .outputs
                .iter()
                .map(|o| WireOutput {
                    key: o.output_key,
                    asset_type: o.asset_type.clone(),
                    view_tag_1: o.view_tag_1,
                    view_tag_3: o.view_tag_3,
                    encrypted_anchor: o.encrypted_anchor,
                })
                .collect(),
            extra,
            protocol: plan.protocol.clone(),
        };
        let prefix_bytes = serialize::serialize_prefix(&prefix);
        let message = salvium_crypto_core::hash::keccak256(&prefix_bytes);

        let mut pseudo_outs = Vec::with_capacity(prepared.len());
        let mut pseudo_asset_outs = Vec::new();
        let signatures = match fork.sig_type {
            SigType::Clsag => {
                let mut sigs = Vec::with_capacity(prepared.len());
                for (input, pseudo_mask) in prepared.iter().zip(&pseudo_masks) {
                    let ring: Vec<RingMember> = input
                        .ring_keys
                        .iter()
                        .zip(&input.ring_commitments)
                        .map(|(key, commitment)| RingMember {
                            key: *key,
                            commitment: *commitment,
                        })
                        .collect();
                    let signed = sign_clsag(
                        &message,
                        &ring,
                        input.ring.real_position,
                        &input.one_time_secret,
                        &input.mask,
                        pseudo_mask,
                        input.source.amount,
                    )?;
                    pseudo_outs.push(signed.pseudo_out);
                    sigs.push(signed.signature);
                }
                RingSignatures::Clsag(sigs)
            }
            SigType::Tclsag => {
                let mut sigs = Vec::with_capacity(prepared.len());
                let asset_point = salvium_crypto_core::clsag::asset_commitment_point(&asset_type)
                    .compress()
                    .to_bytes();
                for (input, pseudo_mask) in prepared.iter().zip(&pseudo_masks) {
                    let ring: Vec<TaggedRingMember> = input
                        .ring_keys
                        .iter()
                        .zip(&input.ring_commitments)
                        .map(|(key, commitment)| TaggedRingMember {
                            key: *key,
                            commitment: *commitment,
                            asset_commitment: asset_point,
                        })
                        .collect();
                    let asset_blind = random_scalar();
                    let signed = sign_tclsag(
                        &message,
                        &ring,
                        input.ring.real_position,
                        &input.one_time_secret,
                        &input.one_time_secret_t,
                        &input.mask,
                        pseudo_mask,
                        input.source.amount,
                        &asset_type,
                        &asset_blind,
                    )?;
                    pseudo_outs.push(signed.pseudo_out);
                    pseudo_asset_outs.push(signed.pseudo_asset_out);
                    sigs.push(signed.signature);
                }
                RingSignatures::Tclsag(sigs)
            }
        };

        let rct = RctEnvelope {
            rct_type: fork.rct_type.as_u8(),
            fee,
            encrypted_amounts: planned.outputs.iter().map(|o| o.encrypted_amount).collect(),
            out_commitments: planned.outputs.iter().map(|o| o.commitment).collect(),
            range_proof,
            signatures,
            pseudo_outs,
            pseudo_asset_outs,
        };
        // The commitments must balance against the public fee plus whatever
        // the network consumes (burnt/staked/converted amounts).
        if !outputs::commitments_balance(
            &rct.pseudo_outs,
            &rct.out_commitments,
            fee + plan.amount_consumed,
        )? {
            return Err(WalletError::Internal(
                "commitment balance check failed".into(),
            ));
        }

        let serialized = serialize::serialize_tx(&prefix, &rct);
        let tx_hex = hex::encode(&serialized.blob);
        debug!(
            tx_hash = %hex::encode(serialized.tx_hash),
            weight = serialized.blob.len(),
            fee,
            "transaction assembled"
        );

        let amount_total = sends_after_fee;
        let mut built = BuiltTransaction {
            tx_hash: serialized.tx_hash,
            tx_hex,
            tx_type: plan.tx_type,
            fee,
            amount: amount_total,
            change,
            spent_key_images: key_images.clone(),
            rings: prepared.iter().map(|i| i.ring.clone()).collect(),
            broadcast: false,
        };

        // 14. Broadcast and storage updates, unless this is a dry run.
        if plan.options.dry_run {
            return Ok(built);
        }

        self.check_cancelled()?;
        let ki_hex: Vec<String> = key_images.iter().map(hex::encode).collect();
        let spent_flags = self.node.is_key_image_spent(&ki_hex).await?;
        if let Some(pos) = spent_flags.iter().position(|&s| s) {
            return Err(WalletError::DoubleSpend(ki_hex[pos].clone()));
        }

        self.node
            .send_raw_transaction(&built.tx_hex, &asset_type)
            .await?;
        built.broadcast = true;

        let tx_hash_hex = hex::encode(serialized.tx_hash);
        for ki in &key_images {
            storage.mark_output_spent(ki, &tx_hash_hex, tip_height + 1)?;
        }
        storage.put_transaction(WalletTransaction {
            tx_hash: tx_hash_hex,
            block_height: tip_height + 1,
            direction: TransferDirection::Out,
            amount: amount_total,
            fee,
            timestamp: 0,
            payment_id: None,
        })?;

        info!(
            tx_hash = %hex::encode(built.tx_hash),
            amount = built.amount,
            fee = built.fee,
            "transaction broadcast"
        );
        Ok(built)
    }

    /// Iterate selection and fee until the estimate stops growing.
    fn converge_selection(
        &self,
        candidates: &[WalletOutput],
        total_sends: u64,
        plan: &TxPlan,
    ) -> WalletResult<(Vec<WalletOutput>, u64)> {
        let num_outputs = plan.destinations.len() + 1; // plus change
        let mut fee = self
            .fee_estimator
            .estimate_fee(2, num_outputs, plan.options.priority);
        let mut selected = Vec::new();
        for _ in 0..FEE_ITERATIONS {
            let target = if plan.options.subtract_fee_from_amount {
                total_sends
            } else {
                total_sends + fee
            };
            selected = inputs::select_utxos(candidates, target)?;
            let new_fee =
                self.fee_estimator
                    .estimate_fee(selected.len(), num_outputs, plan.options.priority);
            if new_fee <= fee {
                // The selection covered a target computed with a fee at
                // least this large, so the smaller estimate is safe.
                return Ok((selected, new_fee));
            }
            fee = new_fee;
        }
        Ok((selected, fee))
    }
}

fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    OsRng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Build the tx extra blob: first pubkey under tag 0x01, the rest under
/// 0x04, plus an encrypted payment id when a destination is integrated.
fn build_extra(
    output_pub_keys: &[[u8; 32]],
    plan: &TxPlan,
    planned: &PlannedOutputs,
) -> WalletResult<Vec<u8>> {
    let mut extra = Vec::with_capacity(2 + 33 * output_pub_keys.len());
    if let Some(first) = output_pub_keys.first() {
        extra.push(0x01);
        extra.extend_from_slice(first);
    }
    if output_pub_keys.len() > 1 {
        extra.push(0x04);
        salvium_crypto_core::varint::write_varint(&mut extra, output_pub_keys.len() as u64);
        for key in output_pub_keys {
            extra.extend_from_slice(key);
        }
    }

    // Encrypted payment id from the first integrated destination, masked
    // with that destination's output secret.
    for (i, dest) in plan.destinations.iter().enumerate() {
        if let Some(pid) = dest.address.payment_id {
            let mask = planned
                .outputs
                .get(i)
                .map(|o| o.pid_mask)
                .ok_or_else(|| WalletError::Internal("destination without output".into()))?;
            let mut encrypted = [0u8; 8];
            for b in 0..8 {
                encrypted[b] = pid[b] ^ mask[b];
            }
            extra.push(0x02);
            salvium_crypto_core::varint::write_varint(&mut extra, 9);
            extra.push(0x01);
            extra.extend_from_slice(&encrypted);
            break;
        }
    }
    Ok(extra)
}

/// Bulletproof+ over the given amounts and masks.
fn generate_range_proof(amounts: &[u64], masks: &[Scalar]) -> WalletResult<Vec<u8>> {
    if amounts.len() != masks.len() {
        return Err(WalletError::Internal(format!(
            "range proof inputs disagree: {} amounts, {} masks",
            amounts.len(),
            masks.len()
        )));
    }
    if amounts.is_empty() || amounts.len() > MAX_BP_COMMITMENTS {
        return Err(WalletError::Internal(format!(
            "range proof commitment count {} out of bounds",
            amounts.len()
        )));
    }

    let commitments: Vec<Commitment> = amounts
        .iter()
        .zip(masks)
        .map(|(&amount, mask)| Commitment {
            mask: *mask,
            amount,
        })
        .collect();

    let proof = Bulletproof::prove_plus(&mut OsRng, commitments)
        .map_err(|e| WalletError::Internal(format!("bulletproof+ generation: {e:?}")))?;
    let mut buf = Vec::new();
    proof
        .write(&mut buf)
        .map_err(|e| WalletError::Internal(format!("bulletproof+ serialization: {e}")))?;
    Ok(buf)
}
