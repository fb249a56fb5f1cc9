//! Header framing for encrypted files
//!
//! Every file relock encrypts is wrapped in an envelope:
//!
//! - header: the fixed magic token identifying format version 1
//! - a single newline byte (0x0A)
//! - body: opaque cipher output (see [`crate::cipher`])
//!
//! The header doubles as the detection marker that decides whether a file
//! gets encrypted or decrypted on the next run.

use crate::error::{ErrorCategory, ErrorKind, RelockError, Result};

/// Version 1 magic token.
///
/// Detection is a containment test: a buffer counts as encrypted if this
/// token occurs anywhere in it, not only at offset zero. Plaintext that
/// happens to contain the token is therefore misclassified; that risk is
/// accepted in exchange for tolerating leading bytes ahead of the header.
pub const V1_MAGIC: &[u8] = b"relock1";

/// Wrap a cipher body in the envelope, returning the full file contents.
///
/// Format: {magic}\n{cipher body}
pub fn add_header(cipher_body: &[u8]) -> Vec<u8> {
    let mut envelope = Vec::with_capacity(V1_MAGIC.len() + 1 + cipher_body.len());
    envelope.extend_from_slice(V1_MAGIC);
    envelope.push(b'\n');
    envelope.extend_from_slice(cipher_body);
    envelope
}

/// Strip the envelope, returning the cipher body.
///
/// The body is everything after the first newline in the buffer, wherever
/// that newline is. Fails when the magic token is absent or when no newline
/// exists at all (header-only or mangled input).
pub fn remove_header(data: &[u8]) -> Result<&[u8]> {
    if !is_encrypted(data) {
        return Err(RelockError::with_kind(
            ErrorCategory::User,
            ErrorKind::EnvelopeInvalid,
            "input unrecognized as relock data",
        ));
    }

    let newline = data.iter().position(|&b| b == b'\n').ok_or_else(|| {
        RelockError::with_kind(
            ErrorCategory::User,
            ErrorKind::EnvelopeInvalid,
            "header present but no newline separator; likely truncated",
        )
    })?;

    Ok(&data[newline + 1..])
}

/// Classify a buffer as encrypted (envelope present) or plaintext.
pub fn is_encrypted(data: &[u8]) -> bool {
    data.windows(V1_MAGIC.len()).any(|w| w == V1_MAGIC)
}
