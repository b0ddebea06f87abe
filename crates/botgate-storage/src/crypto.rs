//! Sealing of brain values at rest.
//!
//! AES-256-GCM with a random nonce per value. The brain key is bound as
//! associated data, so a sealed value only opens under the key it was
//! written to. Stored form: hex(nonce || ciphertext || tag).

use anyhow::{anyhow, bail, Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Master key length in bytes
pub const KEY_SIZE: usize = 32;

/// Master key bytes, wiped on drop
pub type MasterKey = Zeroizing<[u8; KEY_SIZE]>;

pub struct FieldEncryptor {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl FieldEncryptor {
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Result<Self> {
        let key = UnboundKey::new(&AES_256_GCM, master_key)
            .map_err(|_| anyhow!("Master key rejected by AES-256-GCM"))?;
        Ok(Self {
            key: LessSafeKey::new(key),
            rng: SystemRandom::new(),
        })
    }

    /// Seal `plaintext` for the brain entry `context`.
    pub fn encrypt(&self, context: &str, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| anyhow!("System RNG failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + plaintext.len() + AES_256_GCM.tag_len());
        sealed.extend_from_slice(&nonce);
        let mut body = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(context.as_bytes()),
                &mut body,
            )
            .map_err(|_| anyhow!("Sealing failed"))?;
        sealed.extend_from_slice(&body);

        Ok(hex::encode(sealed))
    }

    /// Open a value sealed by `encrypt` for the same `context`.
    pub fn decrypt(&self, context: &str, sealed_hex: &str) -> Result<String> {
        let sealed = hex::decode(sealed_hex).context("Sealed value is not hex")?;
        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            bail!("Sealed value is truncated");
        }

        let (nonce, body) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| anyhow!("Bad nonce"))?;

        let mut body = Zeroizing::new(body.to_vec());
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(context.as_bytes()), &mut body)
            .map_err(|_| anyhow!("Cannot open value: wrong key or tampered data"))?;

        String::from_utf8(plaintext.to_vec()).context("Opened value is not UTF-8")
    }
}

pub fn generate_master_key() -> Result<MasterKey> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    SystemRandom::new()
        .fill(&mut *key)
        .map_err(|_| anyhow!("System RNG failed"))?;
    Ok(key)
}

/// Parse `BOTGATE_BRAIN_KEY`: 64 hex characters, surrounding whitespace ignored.
pub fn parse_master_key(hex_key: &str) -> Result<MasterKey> {
    let bytes = Zeroizing::new(hex::decode(hex_key.trim()).context("Brain key is not hex")?);
    if bytes.len() != KEY_SIZE {
        bail!(
            "Brain key must be {} hex characters, got {}",
            KEY_SIZE * 2,
            bytes.len() * 2
        );
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&bytes);
    Ok(key)
}
