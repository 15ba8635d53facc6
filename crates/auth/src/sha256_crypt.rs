// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SHA-256 crypt digest
//!
//! The server stores `caching_sha2_password` credentials as
//! `$A$<rounds>$<salt><digest>`, where the digest is the SHA-crypt
//! construction over SHA-256 with `1000 * rounds` iterations and the salt is
//! always 20 bytes. The digest is written with the crypt base-64 alphabet
//! (`./0-9A-Za-z`) in the SHA-crypt byte permutation.

use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

/// Required salt length in bytes
pub const SALT_LEN: usize = 20;

/// Round count written by the server (`$A$005$`)
const ROUNDS: u32 = 5;

const DIGEST_LEN: usize = 32;

const CRYPT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Computes `$A$005$` digests
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    rounds: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { rounds: ROUNDS }
    }
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest `password` with `salt` in the server's storage format
    ///
    /// # Errors
    ///
    /// [`HashError::InvalidSaltLength`] unless `salt` is exactly 20 bytes.
    pub fn hash(&self, password: &[u8], salt: &str) -> HashResult<String> {
        if salt.len() != SALT_LEN {
            return Err(HashError::InvalidSaltLength { len: salt.len() });
        }

        let digest = sha256_crypt(password, salt.as_bytes(), 1000 * self.rounds);
        Ok(format!("$A${:03}${}{}", self.rounds, salt, encode_digest(&digest)))
    }

    /// Same digest, upper-case hex encoded as `HEX(authentication_string)`
    /// returns it
    pub fn hash_hex(&self, password: &[u8], salt: &str) -> HashResult<String> {
        self.hash(password, salt).map(hex::encode_upper)
    }
}

/// [`PasswordHasher::hash`] with the default round count
pub fn sha256_password_hash(password: &[u8], salt: &str) -> HashResult<String> {
    PasswordHasher::new().hash(password, salt)
}

/// [`PasswordHasher::hash_hex`] with the default round count
pub fn sha256_password_hash_hex(password: &[u8], salt: &str) -> HashResult<String> {
    PasswordHasher::new().hash_hex(password, salt)
}

fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Digest of `data` repeated `times` times, without building the repetition
fn sha256_repeated(data: &[u8], times: usize) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    for _ in 0..times {
        hasher.update(data);
    }
    hasher.finalize().into()
}

/// `digest` repeated and truncated to `len` bytes
fn stretch(digest: &[u8; DIGEST_LEN], len: usize) -> Vec<u8> {
    digest.iter().copied().cycle().take(len).collect()
}

fn sha256_crypt(key: &[u8], salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let digest_b = sha256(&[key, salt, key].concat());

    let mut buffer = [key, salt].concat();
    buffer.extend(stretch(&digest_b, key.len()));

    let mut bits = key.len();
    while bits > 0 {
        if bits & 1 != 0 {
            buffer.extend_from_slice(&digest_b);
        } else {
            buffer.extend_from_slice(key);
        }
        bits >>= 1;
    }
    let digest_a = sha256(&buffer);

    let digest_dp = sha256_repeated(key, key.len());
    let sequence_p = stretch(&digest_dp, key.len());

    let digest_ds = sha256_repeated(salt, 16 + usize::from(digest_a[0]));
    let sequence_s = stretch(&digest_ds, salt.len());

    let mut digest_c = digest_a;
    for i in 0..iterations {
        let mut hasher = Sha256::new();
        if i & 1 != 0 {
            hasher.update(&sequence_p);
        } else {
            hasher.update(digest_c);
        }
        if i % 3 != 0 {
            hasher.update(&sequence_s);
        }
        if i % 7 != 0 {
            hasher.update(&sequence_p);
        }
        if i & 1 != 0 {
            hasher.update(digest_c);
        } else {
            hasher.update(&sequence_p);
        }
        digest_c = hasher.finalize().into();
    }

    digest_c
}

/// Write the low `chars` sextets of `value`, least significant first
fn push_base64(out: &mut String, mut value: u32, chars: usize) {
    for _ in 0..chars {
        out.push(char::from(CRYPT_ALPHABET[(value & 0x3f) as usize]));
        value >>= 6;
    }
}

fn encode_digest(digest: &[u8; DIGEST_LEN]) -> String {
    let byte = |i: usize| u32::from(digest[i]);
    let mut out = String::with_capacity(43);

    // Visits 0, 21, 12, 3, ... covering every index of 0..30 once.
    let mut i = 0;
    loop {
        push_base64(&mut out, (byte(i) << 16) | (byte((i + 10) % 30) << 8) | byte((i + 20) % 30), 4);
        i = (i + 21) % 30;
        if i == 0 {
            break;
        }
    }
    push_base64(&mut out, (byte(31) << 8) | byte(30), 3);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_digest_length() {
        let encoded = encode_digest(&[0u8; DIGEST_LEN]);
        assert_eq!(encoded.len(), 43);
        assert!(encoded.chars().all(|c| c == '.'));
    }

    #[test]
    fn test_push_base64_low_bits_first() {
        let mut out = String::new();
        push_base64(&mut out, 0b000001_000010, 2);
        assert_eq!(out, "0/");
    }

    #[test]
    fn test_repeated_digest_matches_concatenation() {
        let key = b"p\\ssw0rd";
        assert_eq!(sha256_repeated(key, key.len()), sha256(&key.repeat(key.len())));
        assert_eq!(sha256_repeated(key, 0), sha256(b""));
    }

    #[test]
    fn test_long_password_hashes() {
        let password = vec![b'x'; 4096];
        let hash = sha256_password_hash(&password, "abcdefghijklmnopqrst").unwrap();
        assert!(hash.starts_with("$A$005$abcdefghijklmnopqrst"));
    }

    #[test]
    fn test_stretch_truncates_and_repeats() {
        let digest = [7u8; DIGEST_LEN];
        assert_eq!(stretch(&digest, 0).len(), 0);
        assert_eq!(stretch(&digest, 40).len(), 40);
    }
}
