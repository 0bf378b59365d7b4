//! Cryptographic primitives for Encrypto.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption of record secrets (`encryption`)
//! - Argon2id hashing of owner passwords (`hasher`)
//! - Loading and first-run creation of the vault key file (`keyfile`)

pub mod encryption;
pub mod hasher;
pub mod keyfile;

pub use encryption::{decrypt, encrypt, Ciphertext};
pub use hasher::{CredentialHasher, HasherParams};
pub use keyfile::{load_or_create_key, VaultKey};
