//! # Secrets Delivery
//!
//! For every record of the `secrets` section the value named by the record
//! is looked up, sealed with the destination repository's public key
//! (libsodium-compatible sealed box) and uploaded as a repository secret of
//! the same name.
//!
//! Public keys are fetched once per repository. Records are processed in
//! order; the first failure stops the delivery. A missing secret value is a
//! failure too: a configuration naming a secret that the run cannot provide
//! is an authoring mistake.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crypto_box::aead::OsRng;
use log::{debug, info};

use crate::delivery::DeliveryRecord;
use crate::error::{Error, Result};
use crate::hosting::{EncryptedSecret, HostingApi, PublicKey};

/// Where secret values come from.
pub trait SecretSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads secrets from environment variables of the same name.
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl SecretSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Seals `value` for the owner of the base64-encoded X25519 `public_key` and
/// returns the base64-encoded ciphertext.
pub fn seal(public_key: &str, value: &str, repo: &str) -> Result<String> {
    let encryption_error = |message: String| Error::Encryption {
        repo: repo.to_string(),
        message,
    };

    let decoded = STANDARD
        .decode(public_key)
        .map_err(|e| encryption_error(format!("public key is not valid base64: {}", e)))?;
    let key_bytes: [u8; crypto_box::KEY_SIZE] = decoded.as_slice().try_into().map_err(|_| {
        encryption_error(format!(
            "public key has {} bytes, expected {}",
            decoded.len(),
            crypto_box::KEY_SIZE
        ))
    })?;

    let sealed = crypto_box::PublicKey::from(key_bytes)
        .seal(&mut OsRng, value.as_bytes())
        .map_err(|e| encryption_error(e.to_string()))?;
    Ok(STANDARD.encode(sealed))
}

/// Delivers every secrets record through `api`. Returns the number of
/// secrets uploaded.
pub fn deliver_secrets(
    records: &[DeliveryRecord],
    api: &dyn HostingApi,
    source: &dyn SecretSource,
) -> Result<usize> {
    let mut known_keys: HashMap<String, PublicKey> = HashMap::new();

    for record in records {
        let repo = record.slug();
        let value = source.get(record.name()).ok_or_else(|| Error::MissingEnvironment {
            name: record.name().to_string(),
        })?;

        let key = match known_keys.get(&repo) {
            Some(key) => key.clone(),
            None => {
                debug!("Loading public key for {}", repo);
                let key = api.public_key(&repo)?;
                known_keys.insert(repo.clone(), key.clone());
                key
            }
        };

        let payload = EncryptedSecret {
            key_id: key.key_id.clone(),
            encrypted_value: seal(&key.key, &value, &repo)?,
        };
        debug!("Secret {} encrypted, uploading to {}", record.name(), repo);
        api.upsert_secret(&repo, record.name(), &payload)?;
        info!("Secret {} delivered to {}", record.name(), repo);
    }

    Ok(records.len())
}
