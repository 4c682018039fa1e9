//! Output scanner: per-block detection of owned outputs and spends.
//!
//! Two recognition pipelines share the block walk. Legacy outputs go through
//! the `8*k_v*R` derivation with an optional 1-byte view-tag fast reject;
//! carrot enotes go through the X25519 shared secret with a 3-byte view-tag
//! fast reject. Both end in a subaddress-table lookup, an amount/mask
//! recovery that must reproduce the on-chain commitment, and a key image.

use std::collections::HashSet;

use curve25519_dalek::edwards::CompressedEdwardsY;
use tracing::{debug, warn};

use salvium_common::consts::{COINBASE_UNLOCK_WINDOW, DEFAULT_TX_SPENDABLE_AGE};
use salvium_common::{Network, WalletError, WalletResult};
use salvium_crypto_core::carrot::{self, CarrotKeys};
use salvium_crypto_core::curve::{scalar_mul_base, scalar_mul_gt, zero_commit};
use salvium_crypto_core::ecdh;
use salvium_crypto_core::keys::legacy::{self, LegacyKeys};
use salvium_crypto_core::keys::key_image;
use salvium_crypto_core::varint::decode_varint;

use crate::node::{Block, OutputTarget, Transaction};
use crate::policy;
use crate::storage::{TransferDirection, WalletOutput, WalletTransaction};
use crate::subaddress::SubaddressTable;

/// Extra-field tags.
const EXTRA_TAG_PADDING: u8 = 0x00;
const EXTRA_TAG_PUBKEY: u8 = 0x01;
const EXTRA_TAG_NONCE: u8 = 0x02;
const EXTRA_TAG_ADDITIONAL_PUBKEYS: u8 = 0x04;
const EXTRA_NONCE_ENCRYPTED_PID: u8 = 0x01;

/// A spend of one of our outputs observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentOutput {
    pub key_image: [u8; 32],
    pub tx_hash: String,
    pub height: u64,
}

/// Everything one block contributed to the wallet.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub outputs: Vec<WalletOutput>,
    pub spends: Vec<SpentOutput>,
    pub transactions: Vec<WalletTransaction>,
}

/// Fields of the tx extra blob the wallet cares about.
#[derive(Debug, Default, Clone)]
pub struct ParsedExtra {
    pub tx_pub_key: Option<[u8; 32]>,
    pub additional_pub_keys: Vec<[u8; 32]>,
    pub encrypted_payment_id: Option<[u8; 8]>,
}

/// Parse a raw tx extra blob.
///
/// Unknown tags end the parse without failing the transaction; a malformed
/// known tag is an error.
pub fn parse_extra(extra: &[u8]) -> WalletResult<ParsedExtra> {
    let mut parsed = ParsedExtra::default();
    let mut pos = 0usize;
    while pos < extra.len() {
        let tag = extra[pos];
        pos += 1;
        match tag {
            EXTRA_TAG_PADDING => {}
            EXTRA_TAG_PUBKEY => {
                let end = pos + 32;
                if end > extra.len() {
                    return Err(WalletError::ParseError("truncated extra pubkey".into()));
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&extra[pos..end]);
                if parsed.tx_pub_key.is_none() {
                    parsed.tx_pub_key = Some(key);
                }
                pos = end;
            }
            EXTRA_TAG_NONCE => {
                let (len, used) = decode_varint(&extra[pos..])
                    .map_err(|_| WalletError::ParseError("bad extra nonce length".into()))?;
                pos += used;
                let end = pos + len as usize;
                if end > extra.len() {
                    return Err(WalletError::ParseError("truncated extra nonce".into()));
                }
                let nonce = &extra[pos..end];
                if nonce.len() == 9 && nonce[0] == EXTRA_NONCE_ENCRYPTED_PID {
                    let mut pid = [0u8; 8];
                    pid.copy_from_slice(&nonce[1..9]);
                    parsed.encrypted_payment_id = Some(pid);
                }
                pos = end;
            }
            EXTRA_TAG_ADDITIONAL_PUBKEYS => {
                let (count, used) = decode_varint(&extra[pos..])
                    .map_err(|_| WalletError::ParseError("bad additional pubkey count".into()))?;
                pos += used;
                for _ in 0..count {
                    let end = pos + 32;
                    if end > extra.len() {
                        return Err(WalletError::ParseError(
                            "truncated additional pubkey".into(),
                        ));
                    }
                    let mut key = [0u8; 32];
                    key.copy_from_slice(&extra[pos..end]);
                    parsed.additional_pub_keys.push(key);
                    pos = end;
                }
            }
            _ => break,
        }
    }
    Ok(parsed)
}

/// The per-wallet scanner.
pub struct Scanner {
    legacy_keys: LegacyKeys,
    carrot_keys: CarrotKeys,
    network: Network,
}

impl Scanner {
    pub fn new(legacy_keys: LegacyKeys, carrot_keys: CarrotKeys, network: Network) -> Self {
        Scanner {
            legacy_keys,
            carrot_keys,
            network,
        }
    }

    /// Scan one block.
    ///
    /// `txs` are the non-coinbase transactions of the block, paired with
    /// their hashes, in block order. `known_key_images` is the set of key
    /// images the wallet currently owns (for spend detection); outputs found
    /// earlier in the same block are added to the set as the walk proceeds.
    pub fn scan_block(
        &self,
        table: &SubaddressTable,
        block: &Block,
        txs: &[(String, Transaction)],
        known_key_images: &HashSet<[u8; 32]>,
    ) -> WalletResult<ScanResult> {
        let mut result = ScanResult::default();
        let mut owned = known_key_images.clone();

        let coinbase_hash = format!("coinbase_{}", block.height);
        self.scan_transaction(
            table,
            &coinbase_hash,
            &block.miner_tx,
            block,
            true,
            &mut owned,
            &mut result,
        )?;
        if let Some(protocol_tx) = &block.protocol_tx {
            let protocol_hash = format!("protocol_{}", block.height);
            self.scan_transaction(
                table,
                &protocol_hash,
                protocol_tx,
                block,
                true,
                &mut owned,
                &mut result,
            )?;
        }
        for (tx_hash, tx) in txs {
            self.scan_transaction(table, tx_hash, tx, block, false, &mut owned, &mut result)?;
        }
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_transaction(
        &self,
        table: &SubaddressTable,
        tx_hash: &str,
        tx: &Transaction,
        block: &Block,
        is_coinbase: bool,
        owned: &mut HashSet<[u8; 32]>,
        result: &mut ScanResult,
    ) -> WalletResult<()> {
        let extra_bytes = hex::decode(&tx.extra)
            .map_err(|e| WalletError::ParseError(format!("tx extra hex: {e}")))?;
        let extra = parse_extra(&extra_bytes)?;

        // Outgoing detection: inputs spending our key images.
        let mut spent_amount = 0u64;
        for input in &tx.inputs {
            let ki = decode_key32(&input.key_image, "key image")?;
            if owned.contains(&ki) {
                spent_amount = spent_amount.saturating_add(input.amount);
                result.spends.push(SpentOutput {
                    key_image: ki,
                    tx_hash: tx_hash.to_string(),
                    height: block.height,
                });
            }
        }
        let spends_ours = result
            .spends
            .iter()
            .any(|s| s.tx_hash == tx_hash);

        // Incoming detection, in output order.
        let mut received = 0u64;
        for (index, output) in tx.outputs.iter().enumerate() {
            let found = match &output.target {
                OutputTarget::CarrotV1 {
                    key,
                    view_tag,
                    asset_type,
                    encrypted_janus_anchor,
                } => self.scan_carrot_output(
                    table,
                    tx,
                    tx_hash,
                    block,
                    is_coinbase,
                    index as u64,
                    key,
                    view_tag,
                    asset_type,
                    encrypted_janus_anchor,
                    &extra,
                )?,
                OutputTarget::Tagged {
                    key,
                    view_tag,
                    asset_type,
                } => self.scan_legacy_output(
                    table,
                    tx,
                    tx_hash,
                    block,
                    is_coinbase,
                    index as u64,
                    key,
                    Some(view_tag.as_str()),
                    Some(asset_type.as_str()),
                    output.amount,
                    &extra,
                )?,
                OutputTarget::Regular { key } => self.scan_legacy_output(
                    table,
                    tx,
                    tx_hash,
                    block,
                    is_coinbase,
                    index as u64,
                    key,
                    None,
                    None,
                    output.amount,
                    &extra,
                )?,
            };
            if let Some(wallet_output) = found {
                received = received.saturating_add(wallet_output.amount);
                owned.insert(wallet_output.key_image);
                debug!(
                    height = block.height,
                    tx = tx_hash,
                    index,
                    amount = wallet_output.amount,
                    asset = %wallet_output.asset_type,
                    "recognized output"
                );
                result.outputs.push(wallet_output);
            }
        }

        if received > 0 || spends_ours {
            let direction = match (received > 0, spends_ours) {
                (true, true) => TransferDirection::Both,
                (true, false) => TransferDirection::In,
                _ => TransferDirection::Out,
            };
            let payment_id = extra
                .encrypted_payment_id
                .and_then(|enc| self.decrypt_payment_id(tx_hash, &enc, result));
            result.transactions.push(WalletTransaction {
                tx_hash: tx_hash.to_string(),
                block_height: block.height,
                direction,
                amount: if received > 0 { received } else { spent_amount },
                fee: tx.rct.fee,
                timestamp: block.timestamp,
                payment_id,
            });
        }
        Ok(())
    }

    /// Decrypt the extra-field payment id against the first output we
    /// recognized in this transaction.
    fn decrypt_payment_id(
        &self,
        tx_hash: &str,
        encrypted: &[u8; 8],
        result: &ScanResult,
    ) -> Option<[u8; 8]> {
        let ours = result.outputs.iter().find(|o| o.tx_hash == tx_hash)?;
        let mask = if ours.is_carrot {
            let shared = ours.carrot_shared_secret?;
            carrot::encrypt_payment_id(
                &[0u8; 8],
                &shared,
                &CompressedEdwardsY(ours.output_public_key),
            )
        } else {
            let derivation = legacy::generate_key_derivation(
                &self.legacy_keys.view_secret,
                &CompressedEdwardsY(ours.tx_pub_key),
            )
            .ok()?;
            ecdh::payment_id_mask(&derivation)
        };
        let mut pid = [0u8; 8];
        for i in 0..8 {
            pid[i] = encrypted[i] ^ mask[i];
        }
        Some(pid)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_legacy_output(
        &self,
        table: &SubaddressTable,
        tx: &Transaction,
        tx_hash: &str,
        block: &Block,
        is_coinbase: bool,
        index: u64,
        key_hex: &str,
        view_tag_hex: Option<&str>,
        asset_type: Option<&str>,
        plain_amount: u64,
        extra: &ParsedExtra,
    ) -> WalletResult<Option<WalletOutput>> {
        let output_key_bytes = decode_key32(key_hex, "output key")?;
        let output_key = CompressedEdwardsY(output_key_bytes);

        // Candidate tx pubkeys: the main one, then this output's additional
        // key (subaddress sends carry one pubkey per output).
        let mut candidates = Vec::with_capacity(2);
        if let Some(main) = extra.tx_pub_key {
            candidates.push(main);
        }
        if let Some(additional) = extra.additional_pub_keys.get(index as usize) {
            candidates.push(*additional);
        }

        for tx_pub in candidates {
            let derivation = match legacy::generate_key_derivation(
                &self.legacy_keys.view_secret,
                &CompressedEdwardsY(tx_pub),
            ) {
                Ok(d) => d,
                Err(_) => continue,
            };

            // View-tag fast reject.
            if let Some(tag_hex) = view_tag_hex {
                let tag = decode_key1(tag_hex)?;
                if ecdh::legacy_view_tag(&derivation, index) != tag {
                    continue;
                }
            }

            // Ownership: K'_s = K_o - Hs(D||i)G, then table lookup.
            let h = legacy::derivation_to_scalar(&derivation, index);
            let candidate_spend = match salvium_crypto_core::curve::decompress(
                &output_key_bytes,
                "output key",
            ) {
                Ok(ko) => (ko - scalar_mul_base(&h)).compress(),
                Err(_) => continue,
            };
            let Some(sub_index) = table.lookup_legacy(&candidate_spend.0) else {
                continue;
            };

            // Amount and mask.
            let (amount, mask, commitment) = if is_coinbase || tx.rct.rct_type == 0 {
                let commitment = zero_commit(plain_amount).compress().to_bytes();
                (plain_amount, curve25519_dalek::Scalar::ONE, Some(commitment))
            } else {
                let Some(enc_hex) = tx.rct.encrypted_amounts.get(index as usize) else {
                    return Err(WalletError::ParseError(format!(
                        "missing ecdh blob for output {index} of {tx_hash}"
                    )));
                };
                let enc = decode_key8(enc_hex)?;
                let (shared, mask) = ecdh::output_secrets(&derivation, index);
                let amount = ecdh::decrypt_amount(&enc, &shared);

                let Some(commitment_hex) = tx.rct.out_commitments.get(index as usize) else {
                    return Err(WalletError::ParseError(format!(
                        "missing commitment for output {index} of {tx_hash}"
                    )));
                };
                let on_chain = decode_key32(commitment_hex, "commitment")?;
                let recomputed = salvium_crypto_core::curve::commit(amount, &mask)
                    .compress()
                    .to_bytes();
                if recomputed != on_chain {
                    warn!(
                        tx = tx_hash,
                        index, "commitment check failed, rejecting output"
                    );
                    continue;
                }
                (amount, mask, Some(on_chain))
            };

            // One-time secret and key image.
            let sub_scalar = table.legacy_scalar(&self.legacy_keys, sub_index);
            let one_time_secret = legacy::derive_one_time_secret(
                &derivation,
                index,
                &self.legacy_keys.spend_secret,
                sub_scalar,
            );
            if scalar_mul_base(&one_time_secret).compress() != output_key {
                continue;
            }
            let image = key_image(&one_time_secret, &output_key);

            let asset = asset_type
                .map(str::to_string)
                .unwrap_or_else(|| policy::policy(block.height, self.network).asset_type.to_string());

            return Ok(Some(WalletOutput {
                key_image: image.to_bytes(),
                tx_hash: tx_hash.to_string(),
                output_index: index,
                tx_pub_key: tx_pub,
                output_public_key: output_key_bytes,
                amount,
                mask: mask.to_bytes(),
                commitment,
                subaddress_index: sub_index,
                is_carrot: false,
                carrot_shared_secret: None,
                encrypted_anchor: None,
                asset_type: asset,
                block_height: block.height,
                unlock_height: unlock_height(block.height, tx.unlock_time, is_coinbase),
                global_index: None,
                is_spent: false,
                spent_tx_hash: None,
                spent_height: None,
                is_frozen: false,
            }));
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_carrot_output(
        &self,
        table: &SubaddressTable,
        tx: &Transaction,
        tx_hash: &str,
        block: &Block,
        is_coinbase: bool,
        index: u64,
        key_hex: &str,
        view_tag_hex: &str,
        asset_type: &str,
        anchor_hex: &str,
        extra: &ParsedExtra,
    ) -> WalletResult<Option<WalletOutput>> {
        let output_key_bytes = decode_key32(key_hex, "output key")?;
        let output_key = CompressedEdwardsY(output_key_bytes);
        let expected_tag: [u8; 3] = decode_key3(view_tag_hex)?;
        let encrypted_anchor: [u8; 16] = decode_key16(anchor_hex)?;

        // The ephemeral pubkey: per-output additional key, else the main one.
        let ephemeral_bytes = extra
            .additional_pub_keys
            .get(index as usize)
            .copied()
            .or(extra.tx_pub_key);
        let Some(ephemeral_bytes) = ephemeral_bytes else {
            return Ok(None);
        };
        let ephemeral = curve25519_dalek::MontgomeryPoint(ephemeral_bytes);

        let input_context = if is_coinbase {
            carrot::input_context_coinbase(block.height)
        } else {
            let Some(first_input) = tx.inputs.first() else {
                return Ok(None);
            };
            let ki = decode_key32(&first_input.key_image, "key image")?;
            carrot::input_context_ringct(&ki)
        };

        // View-tag fast reject before any Edwards work.
        let s_sr = carrot::ecdh_receiver(&self.carrot_keys.view_incoming, &ephemeral);
        if carrot::view_tag(&s_sr, &input_context, &output_key) != expected_tag {
            return Ok(None);
        }

        let s_ctx = carrot::sender_receiver_secret(&s_sr, &ephemeral, &input_context);

        // Commitment: on-chain for RingCT, implied for coinbase.
        let commitment_bytes = if let Some(hex) = tx.rct.out_commitments.get(index as usize) {
            decode_key32(hex, "commitment")?
        } else if is_coinbase {
            // Placeholder until the plain amount confirms below.
            zero_commit(tx.outputs[index as usize].amount).compress().to_bytes()
        } else {
            return Ok(None);
        };
        let commitment = CompressedEdwardsY(commitment_bytes);

        // Ownership: recover the nominal address spend key and look it up.
        let Ok(candidate_spend) =
            carrot::recover_address_spend_pubkey(&output_key, &s_ctx, &commitment)
        else {
            return Ok(None);
        };
        let Some(sub_index) = table.lookup_carrot(&candidate_spend.0) else {
            return Ok(None);
        };

        // Amount and mask.
        let (amount, mask) = if is_coinbase && tx.rct.encrypted_amounts.is_empty() {
            let amount = tx.outputs[index as usize].amount;
            (amount, curve25519_dalek::Scalar::ONE)
        } else {
            let Some(enc_hex) = tx.rct.encrypted_amounts.get(index as usize) else {
                return Ok(None);
            };
            let enc = decode_key8(enc_hex)?;
            let Some((amount, blinding, _enote_type)) = carrot::recover_amount(
                &s_ctx,
                &enc,
                &output_key,
                &candidate_spend,
                &commitment,
            ) else {
                warn!(tx = tx_hash, index, "carrot amount recovery failed");
                return Ok(None);
            };
            (amount, blinding)
        };

        // Janus protection: normal path, else the self-send special anchor.
        let anchor = carrot::decrypt_anchor(&encrypted_anchor, &s_ctx, &output_key);
        let janus_ok = carrot::verify_janus_normal(
            &anchor,
            &input_context,
            &candidate_spend,
            &[0u8; 8],
            &ephemeral,
        ) || anchor
            == carrot::janus_anchor_special(
                &ephemeral,
                &input_context,
                &output_key,
                &self.carrot_keys.view_incoming,
            );
        if !janus_ok {
            warn!(tx = tx_hash, index, "janus check failed, rejecting output");
            return Ok(None);
        }

        // One-time secrets; the G component feeds the key image.
        let ext_g = carrot::extension_g(&s_ctx, &commitment);
        let ext_t = carrot::extension_t(&s_ctx, &commitment);
        let (base_g, base_t) = match table.carrot_scalar(&self.carrot_keys, sub_index) {
            None => (self.carrot_keys.generate_image, self.carrot_keys.prove_spend),
            Some(sub_scalar) => (
                sub_scalar * self.carrot_keys.generate_image,
                sub_scalar * self.carrot_keys.prove_spend,
            ),
        };
        let x = base_g + ext_g;
        let y = base_t + ext_t;
        if scalar_mul_gt(&x, &y).compress() != output_key {
            return Ok(None);
        }
        let image = key_image(&x, &output_key);

        Ok(Some(WalletOutput {
            key_image: image.to_bytes(),
            tx_hash: tx_hash.to_string(),
            output_index: index,
            tx_pub_key: ephemeral_bytes,
            output_public_key: output_key_bytes,
            amount,
            mask: mask.to_bytes(),
            commitment: Some(commitment_bytes),
            subaddress_index: sub_index,
            is_carrot: true,
            carrot_shared_secret: Some(s_ctx),
            encrypted_anchor: Some(encrypted_anchor),
            asset_type: asset_type.to_string(),
            block_height: block.height,
            unlock_height: unlock_height(block.height, tx.unlock_time, is_coinbase),
            global_index: None,
            is_spent: false,
            spent_tx_hash: None,
            spent_height: None,
            is_frozen: false,
        }))
    }
}

fn unlock_height(block_height: u64, unlock_time: u64, is_coinbase: bool) -> u64 {
    let age = if is_coinbase {
        COINBASE_UNLOCK_WINDOW
    } else {
        DEFAULT_TX_SPENDABLE_AGE
    };
    (block_height + age).max(unlock_time)
}

fn decode_key32(hex_str: &str, field: &str) -> WalletResult<[u8; 32]> {
    let bytes =
        hex::decode(hex_str).map_err(|e| WalletError::ParseError(format!("{field} hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::ParseError(format!("{field}: expected 32 bytes")))
}

fn decode_key16(hex_str: &str) -> WalletResult<[u8; 16]> {
    let bytes =
        hex::decode(hex_str).map_err(|e| WalletError::ParseError(format!("anchor hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::ParseError("anchor: expected 16 bytes".into()))
}

fn decode_key8(hex_str: &str) -> WalletResult<[u8; 8]> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| WalletError::ParseError(format!("ecdh amount hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::ParseError("ecdh amount: expected 8 bytes".into()))
}

fn decode_key3(hex_str: &str) -> WalletResult<[u8; 3]> {
    let bytes =
        hex::decode(hex_str).map_err(|e| WalletError::ParseError(format!("view tag hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| WalletError::ParseError("view tag: expected 3 bytes".into()))
}

fn decode_key1(hex_str: &str) -> WalletResult<u8> {
    let bytes =
        hex::decode(hex_str).map_err(|e| WalletError::ParseError(format!("view tag hex: {e}")))?;
    if bytes.len() != 1 {
        return Err(WalletError::ParseError("view tag: expected 1 byte".into()));
    }
    Ok(bytes[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{RctData, TxInput, TxOutput};
    use curve25519_dalek::Scalar;
    use rand::rngs::OsRng;
    use rand::RngCore;
    use salvium_crypto_core::curve::commit;

    fn random_scalar() -> Scalar {
        let mut wide = [0u8; 64];
        OsRng.fill_bytes(&mut wide);
        Scalar::from_bytes_mod_order_wide(&wide)
    }

    fn wallet() -> (Scanner, SubaddressTable) {
        let legacy_keys = LegacyKeys::derive(&[23u8; 32]);
        let carrot_keys = CarrotKeys::derive(&[23u8; 32]).unwrap();
        let table = SubaddressTable::new(&legacy_keys, &carrot_keys, 2, 3).unwrap();
        (
            Scanner::new(legacy_keys, carrot_keys, Network::Testnet),
            table,
        )
    }

    fn empty_block(height: u64) -> Block {
        Block {
            height,
            hash: format!("hash_{height}"),
            prev_hash: format!("hash_{}", height.wrapping_sub(1)),
            timestamp: 1_700_000_000 + height * 120,
            miner_tx: Transaction {
                version: 2,
                unlock_time: 0,
                inputs: vec![],
                outputs: vec![],
                extra: String::new(),
                rct: RctData::default(),
            },
            protocol_tx: None,
            tx_hashes: vec![],
        }
    }

    /// Construct a legacy RingCT transaction paying the wallet.
    fn legacy_tx_to_wallet(scanner: &Scanner, amount: u64) -> (Transaction, [u8; 32]) {
        let keys = &scanner.legacy_keys;
        let tx_secret = random_scalar();
        let tx_public = scalar_mul_base(&tx_secret).compress();
        let derivation =
            legacy::generate_key_derivation(&tx_secret, &keys.view_public).unwrap();
        let output_key =
            legacy::derive_one_time_public(&derivation, 0, &keys.spend_public).unwrap();
        let (shared, mask) = ecdh::output_secrets(&derivation, 0);
        let commitment = commit(amount, &mask).compress();
        let encrypted = ecdh::encrypt_amount(amount, &shared);
        let view_tag = ecdh::legacy_view_tag(&derivation, 0);

        let mut extra = vec![EXTRA_TAG_PUBKEY];
        extra.extend_from_slice(tx_public.as_bytes());

        let tx = Transaction {
            version: 3,
            unlock_time: 0,
            inputs: vec![TxInput {
                key_image: hex::encode([0x66u8; 32]),
                amount: 0,
                key_offsets: vec![1, 2, 3],
                asset_type: Some("SAL1".into()),
            }],
            outputs: vec![TxOutput {
                amount: 0,
                target: OutputTarget::Tagged {
                    key: hex::encode(output_key.as_bytes()),
                    view_tag: hex::encode([view_tag]),
                    asset_type: "SAL1".into(),
                },
            }],
            extra: hex::encode(extra),
            rct: RctData {
                rct_type: 8,
                fee: 1000,
                encrypted_amounts: vec![hex::encode(encrypted)],
                out_commitments: vec![hex::encode(commitment.as_bytes())],
            },
        };
        (tx, output_key.to_bytes())
    }

    #[test]
    fn test_legacy_output_recognized() {
        let (scanner, table) = wallet();
        let amount = 4_000_000u64;
        let (tx, output_key) = legacy_tx_to_wallet(&scanner, amount);
        let block = empty_block(900);

        let result = scanner
            .scan_block(&table, &block, &[("tx_a".into(), tx)], &HashSet::new())
            .unwrap();

        assert_eq!(result.outputs.len(), 1);
        let found = &result.outputs[0];
        assert_eq!(found.amount, amount);
        assert_eq!(found.output_public_key, output_key);
        assert_eq!(found.subaddress_index, (0, 0));
        assert_eq!(found.asset_type, "SAL1");
        assert!(!found.is_carrot);
        assert_eq!(found.unlock_height, 900 + DEFAULT_TX_SPENDABLE_AGE);

        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].direction, TransferDirection::In);
    }

    #[test]
    fn test_foreign_output_ignored() {
        let (scanner, table) = wallet();
        let (other_scanner, _) = {
            let legacy_keys = LegacyKeys::derive(&[99u8; 32]);
            let carrot_keys = CarrotKeys::derive(&[99u8; 32]).unwrap();
            let t = SubaddressTable::new(&legacy_keys, &carrot_keys, 2, 2).unwrap();
            (Scanner::new(legacy_keys, carrot_keys, Network::Testnet), t)
        };
        let (tx, _) = legacy_tx_to_wallet(&other_scanner, 1_000);
        let block = empty_block(901);
        let result = scanner
            .scan_block(&table, &block, &[("tx_b".into(), tx)], &HashSet::new())
            .unwrap();
        assert!(result.outputs.is_empty());
        assert!(result.transactions.is_empty());
    }

    #[test]
    fn test_spend_detection() {
        let (scanner, table) = wallet();
        let (tx, _) = legacy_tx_to_wallet(&scanner, 1_000);
        let spent_ki = decode_key32(&tx.inputs[0].key_image, "ki").unwrap();
        let mut known = HashSet::new();
        known.insert(spent_ki);

        let block = empty_block(902);
        let result = scanner
            .scan_block(&table, &block, &[("tx_c".into(), tx)], &known)
            .unwrap();

        assert_eq!(result.spends.len(), 1);
        assert_eq!(result.spends[0].key_image, spent_ki);
        assert_eq!(result.spends[0].height, 902);
        // Both: the tx spends ours and pays us.
        assert_eq!(result.transactions[0].direction, TransferDirection::Both);
    }

    #[test]
    fn test_carrot_enote_recognized() {
        let (scanner, table) = wallet();
        let keys = &scanner.carrot_keys;
        let amount = 77_000_000u64;

        let anchor = [0x5eu8; 16];
        let first_ki = [0x31u8; 32];
        let input_context = carrot::input_context_ringct(&first_ki);
        let d_e = carrot::derive_ephemeral_secret(
            &anchor,
            &input_context,
            &keys.account_spend_public,
            &[0u8; 8],
        );
        let ephemeral =
            carrot::make_ephemeral_pubkey(&d_e, &keys.account_spend_public).unwrap();
        let s_sr = carrot::ecdh_sender(&d_e, &keys.main_view_public).unwrap();
        let s_ctx = carrot::sender_receiver_secret(&s_sr, &ephemeral, &input_context);
        let blinding = carrot::make_amount_blinding_factor(
            &s_ctx,
            amount,
            &keys.account_spend_public,
            carrot::EnoteType::Payment,
        );
        let commitment = carrot::make_amount_commitment(amount, &blinding);
        let output_key =
            carrot::one_time_address(&keys.account_spend_public, &s_ctx, &commitment).unwrap();
        let view_tag = carrot::view_tag(&s_sr, &input_context, &output_key);
        let enc_amount = carrot::make_encrypted_amount(amount, &s_ctx, &output_key);
        let enc_anchor = carrot::encrypt_anchor(&anchor, &s_ctx, &output_key);

        let mut extra = vec![EXTRA_TAG_PUBKEY];
        extra.extend_from_slice(ephemeral.as_bytes());

        let tx = Transaction {
            version: 4,
            unlock_time: 0,
            inputs: vec![TxInput {
                key_image: hex::encode(first_ki),
                amount: 0,
                key_offsets: vec![4, 4, 4],
                asset_type: Some("SAL1".into()),
            }],
            outputs: vec![TxOutput {
                amount: 0,
                target: OutputTarget::CarrotV1 {
                    key: hex::encode(output_key.as_bytes()),
                    view_tag: hex::encode(view_tag),
                    asset_type: "SAL1".into(),
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
        };

        let block = empty_block(1_200);
        let result = scanner
            .scan_block(&table, &block, &[("tx_carrot".into(), tx)], &HashSet::new())
            .unwrap();

        assert_eq!(result.outputs.len(), 1);
        let found = &result.outputs[0];
        assert!(found.is_carrot);
        assert_eq!(found.amount, amount);
        assert_eq!(found.subaddress_index, (0, 0));
        assert_eq!(found.carrot_shared_secret, Some(s_ctx));
        assert_eq!(found.encrypted_anchor, Some(enc_anchor));
        assert_eq!(found.asset_type, "SAL1");
    }

    #[test]
    fn test_extra_parser_handles_tags() {
        let mut extra = vec![EXTRA_TAG_PADDING, EXTRA_TAG_PUBKEY];
        extra.extend_from_slice(&[7u8; 32]);
        extra.push(EXTRA_TAG_NONCE);
        extra.push(9); // varint length
        extra.push(EXTRA_NONCE_ENCRYPTED_PID);
        extra.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        extra.push(EXTRA_TAG_ADDITIONAL_PUBKEYS);
        extra.push(2);
        extra.extend_from_slice(&[8u8; 32]);
        extra.extend_from_slice(&[9u8; 32]);

        let parsed = parse_extra(&extra).unwrap();
        assert_eq!(parsed.tx_pub_key, Some([7u8; 32]));
        assert_eq!(parsed.encrypted_payment_id, Some([1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(parsed.additional_pub_keys.len(), 2);
    }

    #[test]
    fn test_truncated_extra_rejected() {
        let mut extra = vec![EXTRA_TAG_PUBKEY];
        extra.extend_from_slice(&[7u8; 16]);
        assert!(parse_extra(&extra).is_err());
    }
}
