//! # salvium-crypto-core
//!
//! Core cryptographic library for the Salvium light wallet.
//!
//! This crate provides everything below the storage/network line:
//!
//! - **Hash primitives**: Keccak-256 (CryptoNote variant) and keyed
//!   variable-length Blake2b (RFC 7693)
//! - **Key trees**: the legacy CryptoNote seed→spend→view derivation and the
//!   CARROT master→{prove-spend, view-balance, view-incoming,
//!   generate-image, generate-address} tree
//! - **CARROT enotes**: view tags, sender-receiver secrets, one-time
//!   addresses, amount/anchor encryption, Janus protection
//! - **Addresses**: the 18 varint-tagged base58 address variants
//! - **Ring signatures**: CLSAG (hard forks 1–9) and TCLSAG (fork 10+)
//! - **Message signatures**: `SigV1`/`SigV2` Schnorr-style proofs
//! - **Mnemonics**: the 25-word base-1626 seed codec
//!
//! ## Design principles
//!
//! 1. **Bytes internally, hex at the boundary**: keys travel as 32-byte
//!    arrays or dalek types; hex conversion happens in callers.
//! 2. **Constant-time secret paths**: scalar/point arithmetic comes from
//!    `curve25519-dalek`; comparisons of secret-derived values use
//!    constant-time helpers.
//! 3. **Zeroize on drop** for secret key material.
//! 4. **No panics on untrusted input**: decompression and canonicity
//!    failures surface as [`CryptoError`].

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(non_snake_case)]

pub mod address;
pub mod carrot;
pub mod clsag;
pub mod curve;
pub mod ecdh;
pub mod errors;
pub mod hash;
pub mod keys;
pub mod message_sign;
pub mod mnemonic;
pub mod varint;

pub use errors::{CryptoError, CryptoResult};
