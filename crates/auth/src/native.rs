// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `mysql_native_password` hash recognition

/// Length of a native hash: `*` followed by 40 hex digits
pub const NATIVE_HASH_LEN: usize = 41;

/// Whether `candidate` has the shape of a native password hash
///
/// ```rust
/// use mysql_accounts_auth::is_native_hash;
///
/// assert!(is_native_hash("*14E65567ABDB5135D0CFD9A70B3032C179A49EE7"));
/// assert!(!is_native_hash("secret"));
/// ```
pub fn is_native_hash(candidate: &str) -> bool {
    candidate.len() == NATIVE_HASH_LEN
        && candidate.starts_with('*')
        && candidate[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_hex_accepted() {
        assert!(is_native_hash("*14e65567abdb5135d0cfd9a70b3032c179a49ee7"));
    }

    #[test]
    fn test_wrong_shapes_rejected() {
        assert!(!is_native_hash(""));
        assert!(!is_native_hash("14E65567ABDB5135D0CFD9A70B3032C179A49EE7A"));
        assert!(!is_native_hash("*14E65567ABDB5135D0CFD9A70B3032C179A49EE"));
        assert!(!is_native_hash("*14E65567ABDB5135D0CFD9A70B3032C179A49EEZ"));
    }
}
