//! The encrypt-or-decrypt transform
//!
//! One call handles one file: if the contents already carry the envelope
//! header they are decrypted back to plaintext, otherwise they are encrypted
//! and wrapped. Running the transform twice with the same key therefore
//! restores the original bytes.

use crate::cipher::Cipher;
use crate::envelope;
use crate::error::{ErrorCategory, ErrorKind, RelockError, Result};
use crate::file_ops;
use std::fmt;
use std::path::Path;

/// Which direction a transform took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Encrypted,
    Decrypted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Encrypted => write!(f, "Encrypted"),
            Outcome::Decrypted => write!(f, "Decrypted"),
        }
    }
}

/// Transform one file: decrypt it if it is an envelope, encrypt it otherwise.
///
/// `data` is the file's current contents as read by the caller; the result
/// replaces the file at `file_path` atomically with owner-only permissions.
/// Cipher and envelope errors propagate to the caller unmodified.
pub fn process(
    file_name: &str,
    file_path: &Path,
    data: &[u8],
    cipher: &Cipher,
) -> Result<Outcome> {
    if file_name.is_empty() {
        return Err(RelockError::with_kind(
            ErrorCategory::User,
            ErrorKind::MissingFileName,
            "file to encrypt or decrypt not provided",
        ));
    }

    if envelope::is_encrypted(data) {
        let cipher_body = envelope::remove_header(data)?;
        let plaintext = cipher.decrypt(cipher_body)?;
        file_ops::write_file_secure(file_path, &plaintext)
            .map_err(|e| e.with_context(format!("failed to write to {}", file_path.display())))?;
        return Ok(Outcome::Decrypted);
    }

    let cipher_body = cipher.encrypt(data)?;
    let envelope_bytes = envelope::add_header(&cipher_body);
    file_ops::write_file_secure(file_path, &envelope_bytes)
        .map_err(|e| e.with_context(format!("failed to write to {}", file_path.display())))?;
    Ok(Outcome::Encrypted)
}
