// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # MySQL Accounts - Password Digests
//!
//! Client-side computation of the `$A$005$` digest stored by the
//! `sha256_password` and `caching_sha2_password` plugins, so an account can
//! be created with a known hash without sending the clear-text password.
//!
//! ```rust
//! use mysql_accounts_auth::PasswordHasher;
//!
//! let hash = PasswordHasher::new().hash(b"secret", "12345678901234567890").unwrap();
//! assert!(hash.starts_with("$A$005$12345678901234567890"));
//! ```
//!
//! The [`native`] module recognises `mysql_native_password` hashes, which are
//! computed server-side.

pub mod error;
pub mod native;
pub mod sha256_crypt;

pub use error::{HashError, HashResult};
pub use native::is_native_hash;
pub use sha256_crypt::{PasswordHasher, SALT_LEN, sha256_password_hash, sha256_password_hash_hex};
