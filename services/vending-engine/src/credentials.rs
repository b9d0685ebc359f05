//! Password digests
//!
//! Stored format: `sha256$<rounds>$<salt hex>$<digest hex>`. The digest is
//! SHA-256 over salt and password, re-hashed `rounds` times.

use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;

    /// `false` for a wrong password and for a digest this hasher cannot read.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct SaltedSha256 {
    rounds: u32,
}

impl SaltedSha256 {
    pub const DEFAULT_ROUNDS: u32 = 10_000;

    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    fn derive(salt: &[u8], password: &str, rounds: u32) -> [u8; 32] {
        let mut digest: [u8; 32] = Sha256::new()
            .chain_update(salt)
            .chain_update(password.as_bytes())
            .finalize()
            .into();
        for _ in 1..rounds {
            digest = Sha256::digest(digest).into();
        }
        digest
    }
}

impl Default for SaltedSha256 {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROUNDS)
    }
}

impl CredentialHasher for SaltedSha256 {
    fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::random();
        let digest = Self::derive(&salt, password, self.rounds);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.rounds,
            hex::encode(salt),
            hex::encode(digest)
        )
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        let mut parts = digest.split('$');
        let (Some(SCHEME), Some(rounds), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        let (Ok(rounds), Ok(salt), Ok(expected)) =
            (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
        else {
            return false;
        };
        if rounds == 0 {
            return false;
        }

        let actual = Self::derive(&salt, password, rounds);
        constant_time_eq(&actual, &expected)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
