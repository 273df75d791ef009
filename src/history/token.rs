//! Opaque history feed tokens.
//!
//! A token is `base64url(nonce || AES-256-GCM(query))` with the project
//! identifier as associated data, so a token only opens in the project that
//! issued it.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::errors::InvalidResourceError;
use crate::project::models::Project;

use super::filter::HistoryFilterParams;

const AES_GCM_NONCE_LEN: usize = 12;
const AES_GCM_TAG_LEN: usize = 16;

pub struct HistoryTokenCipher {
    cipher: Aes256Gcm,
}

impl HistoryTokenCipher {
    /// Derive the AES key from a configured secret.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, project: &Project, filter: &HistoryFilterParams) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let query = filter.to_query();
        let payload = Payload {
            msg: query.as_bytes(),
            aad: project.identifier.as_bytes(),
        };
        let ciphertext = self
            .cipher
            .encrypt(&nonce, payload)
            .map_err(|e| anyhow::anyhow!("history token encryption failure: {}", e))?;

        let mut token = Vec::with_capacity(nonce.len() + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Open a token and re-validate its filter against the project as it is
    /// now. Any failure is `InvalidSpec`, never a hard error.
    pub fn decrypt(
        &self,
        project: &Project,
        token: &str,
    ) -> Result<HistoryFilterParams, InvalidResourceError> {
        let query = self.decrypt_query(project, token)?;
        HistoryFilterParams::from_query(project, &query).map_err(|e| {
            tracing::debug!(error = %e, "History token filter no longer valid");
            InvalidResourceError::InvalidSpec
        })
    }

    fn decrypt_query(
        &self,
        project: &Project,
        token: &str,
    ) -> Result<String, InvalidResourceError> {
        let invalid = |reason: &str| {
            tracing::debug!(reason, "Rejected history token");
            InvalidResourceError::InvalidSpec
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| invalid("not base64"))?;
        if bytes.len() < AES_GCM_NONCE_LEN + AES_GCM_TAG_LEN {
            return Err(invalid("too short"));
        }
        let (nonce, ciphertext) = bytes.split_at(AES_GCM_NONCE_LEN);
        let payload = Payload {
            msg: ciphertext,
            aad: project.identifier.as_bytes(),
        };
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| invalid("authentication failed"))?;
        String::from_utf8(plaintext).map_err(|_| invalid("not utf-8"))
    }
}
