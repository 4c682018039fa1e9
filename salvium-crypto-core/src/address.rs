//! Salvium address codec.
//!
//! An address is `base58_cn(varint(tag) || K_spend || K_view || [payment_id]
//! || keccak256(preceding)[0..4])`. The block-base58 alphabet, block layout
//! and 4-byte Keccak checksum come from the `base58-monero` crate; this
//! module owns the 18-entry tag table and the payload layout.

use curve25519_dalek::edwards::CompressedEdwardsY;

use crate::errors::{CryptoError, CryptoResult};
use crate::varint::{decode_varint, encode_varint};

/// The three Salvium networks, as seen by the address codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressNetwork {
    Mainnet,
    Testnet,
    Stagenet,
}

/// Legacy CryptoNote addresses vs second-generation CARROT addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFormat {
    Legacy,
    Carrot,
}

/// Standard, integrated (payment-id-carrying), or subaddress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Standard,
    Integrated,
    Subaddress,
}

/// The full (network, format, kind) → varint tag table.
///
/// Values are consensus constants and must not change.
const TAG_TABLE: [(AddressNetwork, AddressFormat, AddressKind, u64); 18] = [
    (AddressNetwork::Mainnet, AddressFormat::Legacy, AddressKind::Standard, 0x3ef318),
    (AddressNetwork::Mainnet, AddressFormat::Legacy, AddressKind::Integrated, 0x55ef318),
    (AddressNetwork::Mainnet, AddressFormat::Legacy, AddressKind::Subaddress, 0xf5ef318),
    (AddressNetwork::Mainnet, AddressFormat::Carrot, AddressKind::Standard, 0x180c96),
    (AddressNetwork::Mainnet, AddressFormat::Carrot, AddressKind::Integrated, 0x2ccc96),
    (AddressNetwork::Mainnet, AddressFormat::Carrot, AddressKind::Subaddress, 0x314c96),
    (AddressNetwork::Testnet, AddressFormat::Legacy, AddressKind::Standard, 0x15beb318),
    (AddressNetwork::Testnet, AddressFormat::Legacy, AddressKind::Integrated, 0xd055eb318),
    (AddressNetwork::Testnet, AddressFormat::Legacy, AddressKind::Subaddress, 0xa59eb318),
    (AddressNetwork::Testnet, AddressFormat::Carrot, AddressKind::Standard, 0x254c96),
    (AddressNetwork::Testnet, AddressFormat::Carrot, AddressKind::Integrated, 0x1ac50c96),
    (AddressNetwork::Testnet, AddressFormat::Carrot, AddressKind::Subaddress, 0x3c54c96),
    (AddressNetwork::Stagenet, AddressFormat::Legacy, AddressKind::Standard, 0x149eb318),
    (AddressNetwork::Stagenet, AddressFormat::Legacy, AddressKind::Integrated, 0xf343eb318),
    (AddressNetwork::Stagenet, AddressFormat::Legacy, AddressKind::Subaddress, 0x2d47eb318),
    (AddressNetwork::Stagenet, AddressFormat::Carrot, AddressKind::Standard, 0x24cc96),
    (AddressNetwork::Stagenet, AddressFormat::Carrot, AddressKind::Integrated, 0x1a848c96),
    (AddressNetwork::Stagenet, AddressFormat::Carrot, AddressKind::Subaddress, 0x384cc96),
];

/// A decoded Salvium address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub network: AddressNetwork,
    pub format: AddressFormat,
    pub kind: AddressKind,
    /// Public spend key embedded in the address.
    pub spend_public: CompressedEdwardsY,
    /// Public view key embedded in the address.
    pub view_public: CompressedEdwardsY,
    /// Payment id, present exactly for integrated addresses.
    pub payment_id: Option<[u8; 8]>,
}

impl Address {
    /// Build a standard address.
    pub fn standard(
        network: AddressNetwork,
        format: AddressFormat,
        spend_public: CompressedEdwardsY,
        view_public: CompressedEdwardsY,
    ) -> Self {
        Address {
            network,
            format,
            kind: AddressKind::Standard,
            spend_public,
            view_public,
            payment_id: None,
        }
    }

    /// Build a subaddress.
    pub fn subaddress(
        network: AddressNetwork,
        format: AddressFormat,
        spend_public: CompressedEdwardsY,
        view_public: CompressedEdwardsY,
    ) -> Self {
        Address {
            network,
            format,
            kind: AddressKind::Subaddress,
            spend_public,
            view_public,
            payment_id: None,
        }
    }

    /// Build an integrated address.
    pub fn integrated(
        network: AddressNetwork,
        format: AddressFormat,
        spend_public: CompressedEdwardsY,
        view_public: CompressedEdwardsY,
        payment_id: [u8; 8],
    ) -> Self {
        Address {
            network,
            format,
            kind: AddressKind::Integrated,
            spend_public,
            view_public,
            payment_id: Some(payment_id),
        }
    }

    /// The varint tag for this address's (network, format, kind).
    pub fn tag(&self) -> u64 {
        tag_for(self.network, self.format, self.kind)
    }

    /// Encode to the base58 string form.
    pub fn encode(&self) -> CryptoResult<String> {
        let mut data = encode_varint(self.tag());
        data.extend_from_slice(&self.spend_public.0);
        data.extend_from_slice(&self.view_public.0);
        match (self.kind, self.payment_id) {
            (AddressKind::Integrated, Some(pid)) => data.extend_from_slice(&pid),
            (AddressKind::Integrated, None) => {
                return Err(CryptoError::Internal(
                    "integrated address without payment id".into(),
                ))
            }
            (_, Some(_)) => {
                return Err(CryptoError::Internal(
                    "payment id on a non-integrated address".into(),
                ))
            }
            (_, None) => {}
        }
        base58_monero::encode_check(&data)
            .map_err(|e| CryptoError::Internal(format!("base58 encode: {e:?}")))
    }

    /// Decode and validate a base58 address string.
    ///
    /// Fails on invalid base58, checksum mismatch, unknown tag, or a payload
    /// whose length disagrees with the tag's address kind.
    pub fn decode(s: &str) -> CryptoResult<Self> {
        let data = base58_monero::decode_check(s).map_err(|e| {
            let msg = format!("{e:?}");
            if msg.to_lowercase().contains("checksum") {
                CryptoError::ChecksumMismatch {
                    context: "address".into(),
                }
            } else {
                CryptoError::Base58DecodeFailed(msg)
            }
        })?;

        let (tag, tag_len) = decode_varint(&data)?;
        let (network, format, kind) = lookup_tag(tag)?;

        let payload = &data[tag_len..];
        let expected_len = match kind {
            AddressKind::Integrated => 72,
            _ => 64,
        };
        if payload.len() != expected_len {
            return Err(CryptoError::InvalidLength {
                field: "address payload".into(),
                expected: expected_len,
                actual: payload.len(),
            });
        }

        let mut spend = [0u8; 32];
        spend.copy_from_slice(&payload[..32]);
        let mut view = [0u8; 32];
        view.copy_from_slice(&payload[32..64]);
        let payment_id = if kind == AddressKind::Integrated {
            let mut pid = [0u8; 8];
            pid.copy_from_slice(&payload[64..72]);
            Some(pid)
        } else {
            None
        };

        Ok(Address {
            network,
            format,
            kind,
            spend_public: CompressedEdwardsY(spend),
            view_public: CompressedEdwardsY(view),
            payment_id,
        })
    }
}

fn tag_for(network: AddressNetwork, format: AddressFormat, kind: AddressKind) -> u64 {
    TAG_TABLE
        .iter()
        .find(|(n, f, k, _)| *n == network && *f == format && *k == kind)
        .map(|(_, _, _, tag)| *tag)
        .expect("tag table covers all 18 combinations")
}

fn lookup_tag(tag: u64) -> CryptoResult<(AddressNetwork, AddressFormat, AddressKind)> {
    TAG_TABLE
        .iter()
        .find(|(_, _, _, t)| *t == tag)
        .map(|(n, f, k, _)| (*n, *f, *k))
        .ok_or(CryptoError::UnknownAddressTag(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::scalar_mul_base;
    use curve25519_dalek::Scalar;

    fn sample_keys() -> (CompressedEdwardsY, CompressedEdwardsY) {
        (
            scalar_mul_base(&Scalar::from(101u64)).compress(),
            scalar_mul_base(&Scalar::from(202u64)).compress(),
        )
    }

    #[test]
    fn test_all_18_variants_roundtrip() {
        let (spend, view) = sample_keys();
        for (network, format, kind, _) in TAG_TABLE {
            let addr = match kind {
                AddressKind::Integrated => {
                    Address::integrated(network, format, spend, view, *b"\x01\x02\x03\x04\x05\x06\x07\x08")
                }
                AddressKind::Standard => Address::standard(network, format, spend, view),
                AddressKind::Subaddress => Address::subaddress(network, format, spend, view),
            };
            let encoded = addr.encode().unwrap();
            let decoded = Address::decode(&encoded).unwrap();
            assert_eq!(decoded, addr, "roundtrip failed for {network:?}/{format:?}/{kind:?}");
        }
    }

    #[test]
    fn test_tags_are_unique() {
        for (i, (_, _, _, a)) in TAG_TABLE.iter().enumerate() {
            for (_, _, _, b) in &TAG_TABLE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_mainnet_legacy_prefix_text() {
        let (spend, view) = sample_keys();
        let addr = Address::standard(
            AddressNetwork::Mainnet,
            AddressFormat::Legacy,
            spend,
            view,
        );
        let encoded = addr.encode().unwrap();
        assert!(encoded.starts_with("SaLv"), "got prefix: {encoded}");
    }

    #[test]
    fn test_corrupted_character_rejected() {
        let (spend, view) = sample_keys();
        let addr = Address::standard(
            AddressNetwork::Testnet,
            AddressFormat::Carrot,
            spend,
            view,
        );
        let mut encoded = addr.encode().unwrap().into_bytes();
        // Flip a character in the key body; the checksum must catch it.
        let mid = encoded.len() / 2;
        encoded[mid] = if encoded[mid] == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(encoded).unwrap();
        assert!(Address::decode(&corrupted).is_err());
    }

    #[test]
    fn test_invalid_base58_character_rejected() {
        // '0' and 'l' are not in the base58 alphabet.
        assert!(Address::decode("0l0l0l0l0l").is_err());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        // Hand-build a blob with a tag outside the table.
        let mut data = encode_varint(0x1234_5678);
        data.extend_from_slice(&[0u8; 64]);
        let encoded = base58_monero::encode_check(&data).unwrap();
        assert_eq!(
            Address::decode(&encoded),
            Err(CryptoError::UnknownAddressTag(0x1234_5678))
        );
    }

    #[test]
    fn test_integrated_payment_id_preserved() {
        let (spend, view) = sample_keys();
        let pid = *b"\xde\xad\xbe\xef\x00\x11\x22\x33";
        let addr = Address::integrated(
            AddressNetwork::Stagenet,
            AddressFormat::Legacy,
            spend,
            view,
            pid,
        );
        let decoded = Address::decode(&addr.encode().unwrap()).unwrap();
        assert_eq!(decoded.payment_id, Some(pid));
    }
}
