//! Authenticated encryption using scrypt + XSalsa20Poly1305
//!
//! This module owns the opaque cipher body carried inside the envelope:
//! - salt: 8 bytes
//! - nonce: 24 bytes
//! - length: 8 bytes (big-endian signed int64)
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)
//!
//! The key is derived from the caller's key string with scrypt; the sealed
//! box is NaCl secretbox (XSalsa20Poly1305) output.

use crate::error::{ErrorCategory, ErrorKind, RelockError, Result};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::rngs::OsRng;
use rand::RngCore;
use scrypt::{scrypt, Params};
use std::mem::{size_of, size_of_val};
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 8;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
const KEY_LEN: usize = 32;

/// scrypt N parameter (CPU/memory cost)
const SCRYPT_N: u32 = 32768;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// Authenticated encryption engine keyed by a caller-supplied key string.
///
/// The key material is held zeroized and a fresh salt/nonce pair is drawn
/// for every encryption, so the engine can be reused across calls.
pub struct Cipher {
    key_material: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("key_material", &"<redacted>")
            .finish()
    }
}

impl Cipher {
    /// Create an engine from key material.
    ///
    /// Empty key material is rejected rather than silently deriving a key
    /// from nothing.
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::KeyDerivation,
                "key material is empty",
            ));
        }
        Ok(Self {
            key_material: Zeroizing::new(key.as_bytes().to_vec()),
        })
    }

    /// Encrypt plaintext using a random salt and nonce.
    ///
    /// Returns the binary format: salt(8) + nonce(24) + length(8) + sealedbox(variable)
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        self.encrypt_deterministic(plaintext, &salt, &nonce)
    }

    /// Encrypt plaintext using a provided salt and nonce.
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
    pub fn encrypt_deterministic(
        &self,
        plaintext: &[u8],
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let key = derive_key(&self.key_material, salt)?;

        let cipher = XSalsa20Poly1305::new(&key.into());

        let nonce_obj = Nonce::from(*nonce);
        let sealed_box = cipher.encrypt(&nonce_obj, plaintext).map_err(|e| {
            RelockError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                format!("encryption failed: {}", e),
            )
        })?;

        let sealed_box_len = sealed_box.len() as i64;
        let mut output = Vec::with_capacity(
            SALT_LEN + NONCE_LEN + size_of_val(&sealed_box_len) + sealed_box.len(),
        );
        output.extend_from_slice(salt);
        output.extend_from_slice(nonce);
        output.extend_from_slice(&sealed_box_len.to_be_bytes()); // big-endian i64
        output.extend_from_slice(&sealed_box);

        Ok(output)
    }

    /// Decrypt a cipher body back into plaintext.
    ///
    /// Fails with an `AuthenticationFailed` kind on a wrong key or any
    /// modification of the sealed box; corrupted plaintext is never returned.
    pub fn decrypt(&self, cipher_body: &[u8]) -> Result<Vec<u8>> {
        let mut pos = 0;

        if cipher_body.len() < pos + SALT_LEN {
            return Err(truncated("input likely truncated while reading salt"));
        }
        let salt: [u8; SALT_LEN] = cipher_body[pos..pos + SALT_LEN]
            .try_into()
            .map_err(|_| internal_invariant("failed to read salt"))?;
        pos += SALT_LEN;

        if cipher_body.len() < pos + NONCE_LEN {
            return Err(truncated("input likely truncated while reading nonce"));
        }
        let nonce: [u8; NONCE_LEN] = cipher_body[pos..pos + NONCE_LEN]
            .try_into()
            .map_err(|_| internal_invariant("failed to read nonce"))?;
        pos += NONCE_LEN;

        if cipher_body.len() < pos + size_of::<i64>() {
            return Err(truncated("input likely truncated while reading sealed box"));
        }
        let length_bytes: [u8; 8] = cipher_body[pos..pos + size_of::<i64>()]
            .try_into()
            .map_err(|_| internal_invariant("failed to read length"))?;
        let sealed_box_len = i64::from_be_bytes(length_bytes);
        pos += size_of::<i64>();

        if sealed_box_len < 0 {
            return Err(RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "negative sealed box length (when interpreted as a big-endian i64)",
            ));
        }

        // Check if length exceeds platform's maximum isize. *Valid* input
        // can fail this check if the platforms' isize is small.
        if sealed_box_len > isize::MAX as i64 {
            return Err(RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "sealed box length exceeds this system's max isize",
            ));
        }

        let sealed_box_len = sealed_box_len as usize;

        if sealed_box_len > cipher_body.len() {
            return Err(truncated(
                "truncated or corrupt input; claimed length greater than available input",
            ));
        }

        if cipher_body.len() < pos + sealed_box_len {
            return Err(truncated(
                "truncated or corrupt input (while reading sealed box)",
            ));
        }
        let sealed_box = &cipher_body[pos..pos + sealed_box_len];
        pos += sealed_box_len;

        if pos < cipher_body.len() {
            return Err(RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::TrailingData,
                "invalid input: unexpected data after sealed box",
            ));
        }

        let key = derive_key(&self.key_material, &salt)?;
        let cipher = XSalsa20Poly1305::new(&key.into());
        let nonce_obj = Nonce::from(nonce);
        let plaintext = cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
            RelockError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "corrupt input, tampered-with data, or wrong key",
            )
        })?;

        Ok(plaintext)
    }
}

/// Derive a 32-byte key from key material and salt using scrypt
fn derive_key(key_material: &[u8], salt: &[u8; SALT_LEN]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(
        (SCRYPT_N as f64).log2() as u8, // log_n
        SCRYPT_R,
        SCRYPT_P,
        KEY_LEN,
    )
    .map_err(|e| {
        RelockError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut key = [0u8; KEY_LEN];
    scrypt(key_material, salt, &params, &mut key).map_err(|e| {
        RelockError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(key)
}

fn truncated(msg: &str) -> RelockError {
    RelockError::with_kind(ErrorCategory::User, ErrorKind::TruncatedInput, msg)
}

fn internal_invariant(msg: &str) -> RelockError {
    RelockError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        msg,
    )
}
