// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Fixed vectors for the `$A$005$` digest

use mysql_accounts_auth::{
    HashError, PasswordHasher, sha256_password_hash, sha256_password_hash_hex,
};

#[test]
fn test_known_vectors() {
    let cases = [
        (
            "secret",
            "12345678901234567890",
            "$A$005$12345678901234567890hlFtcpzc2hwpIj.tGDKcgKS6eT8Spd4wk3iRpjsRhh8",
        ),
        (
            "",
            "abcdefghijklmnopqrst",
            "$A$005$abcdefghijklmnopqrstPQTT56Xr1YM3Km3Rg7maUNB.zsCyjw9bkESVZT2wvH8",
        ),
    ];

    for (password, salt, expected) in cases {
        assert_eq!(
            sha256_password_hash(password.as_bytes(), salt).unwrap(),
            expected,
            "password {password:?}"
        );
    }
}

#[test]
fn test_password_longer_than_digest() {
    // 40 bytes exercises the partial-block path of the byte sequences
    let password = "x".repeat(40);
    assert_eq!(
        sha256_password_hash(password.as_bytes(), "ABCDEFGHIJKLMNOPQRST").unwrap(),
        "$A$005$ABCDEFGHIJKLMNOPQRSTiN4fCcpuQ.56V98saR6h9uU3//yC9e2e7k8OSBmC/c2"
    );
}

#[test]
fn test_hex_variant() {
    assert_eq!(
        sha256_password_hash_hex(b"secret", "12345678901234567890").unwrap(),
        "244124303035243132333435363738393031323334353637383930686C467463707A6332687770496A2E7447444B63674B533665543853706434776B336952706A7352686838"
    );
}

#[test]
fn test_hash_is_deterministic() {
    let hasher = PasswordHasher::new();
    let first = hasher.hash(b"p@ss w0rd", "saltsaltsaltsaltsalt").unwrap();
    let second = hasher.hash(b"p@ss w0rd", "saltsaltsaltsaltsalt").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), "$A$005$".len() + 20 + 43);
}

#[test]
fn test_salt_length_enforced() {
    assert_eq!(
        sha256_password_hash(b"secret", "short"),
        Err(HashError::InvalidSaltLength { len: 5 })
    );
    assert_eq!(
        sha256_password_hash(b"secret", "123456789012345678901"),
        Err(HashError::InvalidSaltLength { len: 21 })
    );
}
