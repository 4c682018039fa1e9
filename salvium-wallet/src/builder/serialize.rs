//! Canonical transaction serialization.
//!
//! Layout: prefix (version, unlock time, inputs, outputs, extra, type data),
//! then the RCT base (type, fee, ecdh info, output commitments), then the
//! prunable section (range proof, ring signatures, pseudo-outs). The
//! transaction id hashes the three sections separately:
//!
//! ```text
//! tx_hash = Keccak256(H(prefix) || H(base) || H(prunable))
//! ```

use salvium_crypto_core::clsag::{ClsagSignature, TclsagSignature};
use salvium_crypto_core::hash::keccak256;
use salvium_crypto_core::varint::write_varint;

use crate::policy::TxType;

/// Input wire tag (`txin_to_key`).
const TXIN_TO_KEY: u8 = 0x02;
/// Output wire tags by generation.
const TXOUT_TO_KEY: u8 = 0x02;
const TXOUT_TO_TAGGED_KEY: u8 = 0x03;
const TXOUT_TO_CARROT_V1: u8 = 0x04;

/// One serialized-input description.
#[derive(Debug, Clone)]
pub struct WireInput {
    pub key_image: [u8; 32],
    pub asset_type: String,
    /// Ring member global indices, ascending.
    pub ring_indices: Vec<u64>,
}

/// One serialized-output description.
#[derive(Debug, Clone)]
pub struct WireOutput {
    pub key: [u8; 32],
    pub asset_type: String,
    pub view_tag_1: Option<u8>,
    pub view_tag_3: Option<[u8; 3]>,
    pub encrypted_anchor: Option<[u8; 16]>,
}

/// Non-transfer protocol data carried in the prefix.
#[derive(Debug, Clone, Default)]
pub struct ProtocolData {
    pub amount_burnt: u64,
    pub amount_slippage_limit: u64,
    pub source_asset_type: String,
    pub destination_asset_type: String,
    /// Encoded return/destination address, when the type carries one.
    pub return_address: Option<String>,
}

/// The transaction prefix.
#[derive(Debug, Clone)]
pub struct TxPrefix {
    pub version: u64,
    pub unlock_time: u64,
    pub tx_type: TxType,
    pub inputs: Vec<WireInput>,
    pub outputs: Vec<WireOutput>,
    pub extra: Vec<u8>,
    pub protocol: ProtocolData,
}

/// Ring signatures, one flavor per fork era.
#[derive(Debug, Clone)]
pub enum RingSignatures {
    Clsag(Vec<ClsagSignature>),
    Tclsag(Vec<TclsagSignature>),
}

/// The RCT envelope to serialize.
#[derive(Debug, Clone)]
pub struct RctEnvelope {
    pub rct_type: u8,
    pub fee: u64,
    /// 8-byte encrypted amount per output.
    pub encrypted_amounts: Vec<[u8; 8]>,
    /// Commitment per output.
    pub out_commitments: Vec<[u8; 32]>,
    /// Serialized Bulletproof+.
    pub range_proof: Vec<u8>,
    pub signatures: RingSignatures,
    pub pseudo_outs: Vec<[u8; 32]>,
    /// Pseudo asset commitments (RCT type 9 only).
    pub pseudo_asset_outs: Vec<[u8; 32]>,
}

/// Convert ascending absolute ring indices to relative offsets.
pub fn to_relative_offsets(absolute: &[u64]) -> Vec<u64> {
    let mut relative = Vec::with_capacity(absolute.len());
    let mut prev = 0u64;
    for (i, &index) in absolute.iter().enumerate() {
        if i == 0 {
            relative.push(index);
        } else {
            relative.push(index - prev);
        }
        prev = index;
    }
    relative
}

/// Recover absolute indices from relative offsets.
pub fn from_relative_offsets(relative: &[u64]) -> Vec<u64> {
    let mut absolute = Vec::with_capacity(relative.len());
    let mut acc = 0u64;
    for &offset in relative {
        acc += offset;
        absolute.push(acc);
    }
    absolute
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Serialize the prefix section.
pub fn serialize_prefix(prefix: &TxPrefix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512);
    write_varint(&mut buf, prefix.version);
    write_varint(&mut buf, prefix.unlock_time);

    write_varint(&mut buf, prefix.inputs.len() as u64);
    for input in &prefix.inputs {
        buf.push(TXIN_TO_KEY);
        write_varint(&mut buf, 0); // RCT amounts are committed, not plain
        write_string(&mut buf, &input.asset_type);
        let offsets = to_relative_offsets(&input.ring_indices);
        write_varint(&mut buf, offsets.len() as u64);
        for offset in offsets {
            write_varint(&mut buf, offset);
        }
        buf.extend_from_slice(&input.key_image);
    }

    write_varint(&mut buf, prefix.outputs.len() as u64);
    for output in &prefix.outputs {
        write_varint(&mut buf, 0);
        match (output.view_tag_3, output.view_tag_1) {
            (Some(tag3), _) => {
                buf.push(TXOUT_TO_CARROT_V1);
                buf.extend_from_slice(&output.key);
                buf.extend_from_slice(&tag3);
                buf.extend_from_slice(&output.encrypted_anchor.unwrap_or([0u8; 16]));
                write_string(&mut buf, &output.asset_type);
            }
            (None, Some(tag1)) => {
                buf.push(TXOUT_TO_TAGGED_KEY);
                buf.extend_from_slice(&output.key);
                buf.push(tag1);
                write_string(&mut buf, &output.asset_type);
            }
            (None, None) => {
                buf.push(TXOUT_TO_KEY);
                buf.extend_from_slice(&output.key);
            }
        }
    }

    write_varint(&mut buf, prefix.extra.len() as u64);
    buf.extend_from_slice(&prefix.extra);

    buf.push(prefix.tx_type.as_u8());
    match prefix.tx_type {
        TxType::Transfer => {}
        TxType::Stake => {
            write_varint(&mut buf, prefix.protocol.amount_burnt);
            write_string(&mut buf, prefix.protocol.return_address.as_deref().unwrap_or(""));
        }
        TxType::Burn => {
            write_varint(&mut buf, prefix.protocol.amount_burnt);
            write_string(&mut buf, &prefix.protocol.source_asset_type);
        }
        TxType::Convert => {
            write_varint(&mut buf, prefix.protocol.amount_burnt);
            write_varint(&mut buf, prefix.protocol.amount_slippage_limit);
            write_string(&mut buf, &prefix.protocol.source_asset_type);
            write_string(&mut buf, &prefix.protocol.destination_asset_type);
            write_string(&mut buf, prefix.protocol.return_address.as_deref().unwrap_or(""));
        }
    }
    buf
}

fn serialize_rct_base(rct: &RctEnvelope) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    buf.push(rct.rct_type);
    write_varint(&mut buf, rct.fee);
    for enc in &rct.encrypted_amounts {
        buf.extend_from_slice(enc);
    }
    for commitment in &rct.out_commitments {
        buf.extend_from_slice(commitment);
    }
    buf
}

fn serialize_prunable(rct: &RctEnvelope) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2048);
    write_varint(&mut buf, rct.range_proof.len() as u64);
    buf.extend_from_slice(&rct.range_proof);

    match &rct.signatures {
        RingSignatures::Clsag(signatures) => {
            for sig in signatures {
                write_varint(&mut buf, sig.s.len() as u64);
                for s in &sig.s {
                    buf.extend_from_slice(s);
                }
                buf.extend_from_slice(&sig.c1);
                buf.extend_from_slice(&sig.d);
            }
        }
        RingSignatures::Tclsag(signatures) => {
            for sig in signatures {
                write_varint(&mut buf, sig.s.len() as u64);
                for s in &sig.s {
                    buf.extend_from_slice(s);
                }
                for t in &sig.t {
                    buf.extend_from_slice(t);
                }
                buf.extend_from_slice(&sig.c1);
                buf.extend_from_slice(&sig.d);
                buf.extend_from_slice(&sig.e);
            }
        }
    }

    for pseudo in &rct.pseudo_outs {
        buf.extend_from_slice(pseudo);
    }
    for pseudo in &rct.pseudo_asset_outs {
        buf.extend_from_slice(pseudo);
    }
    buf
}

/// A fully serialized transaction with its component hashes.
#[derive(Debug, Clone)]
pub struct SerializedTx {
    pub blob: Vec<u8>,
    pub tx_hash: [u8; 32],
    pub prefix_hash: [u8; 32],
}

/// Serialize the full transaction and compute its id.
pub fn serialize_tx(prefix: &TxPrefix, rct: &RctEnvelope) -> SerializedTx {
    let prefix_bytes = serialize_prefix(prefix);
    let base_bytes = serialize_rct_base(rct);
    let prunable_bytes = serialize_prunable(rct);

    let prefix_hash = keccak256(&prefix_bytes);
    let base_hash = keccak256(&base_bytes);
    let prunable_hash = keccak256(&prunable_bytes);

    let mut hash_input = Vec::with_capacity(96);
    hash_input.extend_from_slice(&prefix_hash);
    hash_input.extend_from_slice(&base_hash);
    hash_input.extend_from_slice(&prunable_hash);
    let tx_hash = keccak256(&hash_input);

    let mut blob = prefix_bytes;
    blob.extend_from_slice(&base_bytes);
    blob.extend_from_slice(&prunable_bytes);

    SerializedTx {
        blob,
        tx_hash,
        prefix_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_offsets_roundtrip() {
        let absolute = vec![12u64, 17, 44, 45, 190];
        let relative = to_relative_offsets(&absolute);
        assert_eq!(relative, vec![12, 5, 27, 1, 145]);
        assert_eq!(from_relative_offsets(&relative), absolute);
    }

    fn sample_prefix(tx_type: TxType) -> TxPrefix {
        TxPrefix {
            version: 4,
            unlock_time: 0,
            tx_type,
            inputs: vec![WireInput {
                key_image: [1u8; 32],
                asset_type: "SAL1".into(),
                ring_indices: vec![5, 9, 13],
            }],
            outputs: vec![WireOutput {
                key: [2u8; 32],
                asset_type: "SAL1".into(),
                view_tag_1: None,
                view_tag_3: Some([7, 8, 9]),
                encrypted_anchor: Some([3u8; 16]),
            }],
            extra: vec![0x01; 33],
            protocol: ProtocolData {
                amount_burnt: 500,
                amount_slippage_limit: 20,
                source_asset_type: "SAL1".into(),
                destination_asset_type: "VSD".into(),
                return_address: Some("SaLvT...".into()),
            },
        }
    }

    fn sample_rct() -> RctEnvelope {
        RctEnvelope {
            rct_type: 9,
            fee: 1234,
            encrypted_amounts: vec![[9u8; 8]],
            out_commitments: vec![[4u8; 32]],
            range_proof: vec![0xaa; 100],
            signatures: RingSignatures::Clsag(vec![]),
            pseudo_outs: vec![[5u8; 32]],
            pseudo_asset_outs: vec![[6u8; 32]],
        }
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let a = serialize_tx(&sample_prefix(TxType::Convert), &sample_rct());
        let b = serialize_tx(&sample_prefix(TxType::Convert), &sample_rct());
        assert_eq!(a.blob, b.blob);
        assert_eq!(a.tx_hash, b.tx_hash);
    }

    #[test]
    fn test_tx_type_changes_prefix_hash() {
        let transfer = serialize_tx(&sample_prefix(TxType::Transfer), &sample_rct());
        let convert = serialize_tx(&sample_prefix(TxType::Convert), &sample_rct());
        assert_ne!(transfer.prefix_hash, convert.prefix_hash);
        assert_ne!(transfer.tx_hash, convert.tx_hash);
    }

    #[test]
    fn test_prunable_mutation_changes_tx_hash_not_prefix() {
        let base = serialize_tx(&sample_prefix(TxType::Transfer), &sample_rct());
        let mut rct = sample_rct();
        rct.range_proof[0] ^= 1;
        let mutated = serialize_tx(&sample_prefix(TxType::Transfer), &rct);
        assert_eq!(base.prefix_hash, mutated.prefix_hash);
        assert_ne!(base.tx_hash, mutated.tx_hash);
    }
}
