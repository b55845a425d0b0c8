//! Charla Cryptographic Primitives
//!
//! This crate provides the keystream pipeline every Charla connection runs
//! before entering the chat loop: an ephemeral Diffie-Hellman exchange over
//! a fixed 64-bit group, a deterministic key-derivation function, and the
//! repeating-key XOR stream cipher applied to all payloads.
//!
//! # Design
//!
//! All functions are pure and deterministic except [`generate_private_key`],
//! whose only side effect is reading the OS randomness source. Determinism
//! matters: client and server must derive bit-identical keys from the same
//! shared secret, and tests rely on reproducible output.
//!
//! # Security Properties
//!
//! None worth the name. The modulus is a fixed, attacker-knowable 64-bit
//! value and the cipher is a repeating-key XOR stream. The pipeline provides
//! obfuscation of the wire traffic, not confidentiality, authentication, or
//! integrity.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cipher;
pub mod dh;
pub mod kdf;

pub use cipher::xor_crypt;
pub use dh::{
    CryptoError, DH_GENERATOR, DH_PRIME, compute_public_key, compute_shared_secret,
    generate_private_key, mod_pow,
};
pub use kdf::{derive_key, session_key};

/// Length in bytes of a derived symmetric session key.
pub const KEY_LENGTH: usize = 32;
