//! Utility functions and helpers
//!
//! This module contains the digest and key encoding helpers and the
//! bincode helper used to hash blocks.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    new_key_pair, p256_public_key_der, pem_decode, pem_encode, public_key_from_pkcs8,
    ripemd160_digest, sha256_digest,
};

pub use serialization::serialize;
