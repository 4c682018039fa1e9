//! CARROT: the second-generation key, address and enote format.
//!
//! All derivations are keyed Blake2b over length-prefixed domain-separator
//! transcripts. The account secret tree hangs off the 32-byte master secret;
//! everything at the enote layer hangs off an X25519 ECDH between the
//! view-incoming key and the enote ephemeral pubkey.

mod domains;
mod enote;
mod secrets;
mod subaddress;
mod transcript;

pub use enote::{
    decrypt_anchor, decrypt_payment_id, derive_ephemeral_secret, ecdh_receiver, ecdh_sender,
    encrypt_anchor, encrypt_payment_id, extension_g, extension_t, input_context_coinbase,
    input_context_ringct, janus_anchor_special, make_amount_blinding_factor,
    make_amount_commitment, make_encrypted_amount, make_ephemeral_pubkey, one_time_address,
    one_time_extension_pubkey, recover_address_spend_pubkey, recover_amount,
    sender_receiver_secret, verify_janus_normal, view_tag, EnoteType, INPUT_CONTEXT_BYTES,
    JANUS_ANCHOR_BYTES, VIEW_TAG_BYTES,
};
pub use secrets::CarrotKeys;
pub use subaddress::{
    index_generator, subaddress_scalar, subaddress_spend_pubkey, subaddress_view_pubkey,
};
