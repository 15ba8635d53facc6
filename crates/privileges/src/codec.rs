// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Privilege string codec
//!
//! Two inputs produce a [`PrivilegeMap`]:
//!
//! - the compact privilege string `db.table:PRIV1,PRIV2/db2.*:PRIV3`
//!   ([`decode`], reversed by [`encode`])
//! - the server's `SHOW GRANTS` lines ([`parse_grant_statement`],
//!   [`parse_grants`])
//!
//! Both go through [`normalize_column_grants`], so column privileges end
//! up in one canonical form, `SELECT (a, b)`, whatever the input looked
//! like.
//!
//! ```rust
//! use mysql_accounts_privileges::{DecodeOptions, decode};
//!
//! let map = decode("db1.*:SELECT,UPDATE/db2.*:ALL", &DecodeOptions::default()).unwrap();
//! assert!(map.get("`db1`.*").unwrap().contains("UPDATE"));
//! assert!(map.get("*.*").unwrap().contains("USAGE"));
//! ```

use std::sync::LazyLock;

use mysql_accounts_connection::IdentifierQuote;
use regex::Regex;
use tracing::trace;

use crate::error::{PrivilegeError, PrivilegeResult};
use crate::known::is_known_privilege;
use crate::map::{GRANT_OPTION, PrivilegeMap, USAGE};
use crate::scope::Scope;

/// Privileges that accept a column list
const COLUMN_PRIVILEGES: [&str; 4] = ["SELECT", "UPDATE", "INSERT", "REFERENCES"];

/// One quoted name in any of the three quoting styles
const QUOTED: &str = r#"(?:'(?:[^']|'')*'|`(?:[^`]|``)*`|"(?:[^"]|"")*")"#;

static GRANT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^GRANT (.+) ON (.+) TO {QUOTED}(?:@{QUOTED})?(?: IDENTIFIED BY PASSWORD {QUOTED})? ?(.*)$"
    );
    Regex::new(&pattern).expect("grant line pattern is valid")
});

static ROLE_GRANT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^GRANT (.+) TO {QUOTED}")).expect("role grant pattern is valid")
});

/// Token shape allowed in a statement: upper-case name words, then an
/// optional column list free of quotes, parens, semicolons and backslashes
static TOKEN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Z][A-Z0-9_ ]*(?: ?\([^()'"`;\\]*\))?$"#).expect("token pattern is valid")
});

/// Options for [`decode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Quote wrapped around concrete database and table names
    pub quote: IdentifierQuote,
    /// Add `*.*: USAGE` when the privilege string names no global scope
    pub ensure_usage: bool,
    /// Reject privilege names outside the known list
    pub enforce_known: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            quote: IdentifierQuote::Backtick,
            ensure_usage: true,
            enforce_known: true,
        }
    }
}

impl DecodeOptions {
    pub fn with_quote(mut self, quote: IdentifierQuote) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_ensure_usage(mut self, ensure_usage: bool) -> Self {
        self.ensure_usage = ensure_usage;
        self
    }

    pub fn with_enforce_known(mut self, enforce_known: bool) -> Self {
        self.enforce_known = enforce_known;
        self
    }
}

/// Decode a compact privilege string
///
/// Privilege names are upper-cased; column names keep their case.
///
/// # Errors
///
/// - [`PrivilegeError::MalformedSpec`] when a segment has no `:` or an
///   empty scope
/// - [`PrivilegeError::InvalidPrivilegeSpec`] for an empty token, a token
///   that is not safe to write into a statement, or (when
///   `enforce_known` is set) an unknown privilege name
pub fn decode(spec: &str, options: &DecodeOptions) -> PrivilegeResult<PrivilegeMap> {
    let mut map = PrivilegeMap::new();

    for segment in spec.trim().split('/') {
        let segment = segment.trim();
        let Some((scope_text, privileges)) = segment.rsplit_once(':') else {
            return Err(PrivilegeError::MalformedSpec {
                segment: segment.to_string(),
            });
        };
        let scope = Scope::from_spec(scope_text, options.quote).map_err(|_| {
            PrivilegeError::MalformedSpec {
                segment: segment.to_string(),
            }
        })?;

        let mut tokens = Vec::new();
        for raw in split_outside_parens(privileges) {
            let token = canonical_name(&upper_case_name(raw.trim()));
            if token.is_empty() {
                return Err(PrivilegeError::InvalidPrivilegeSpec { token });
            }
            tokens.push(token);
        }
        let tokens = normalize_column_grants(tokens);

        for token in &tokens {
            check_token(token, options.enforce_known)?;
        }

        trace!(scope = %scope, ?tokens, "Decoded privilege segment");
        map.extend(scope, tokens);
    }

    if options.ensure_usage && !map.contains_scope(Scope::global().as_str()) {
        map.extend(Scope::global(), [USAGE]);
    }

    Ok(map)
}

/// Encode a map back into the compact privilege string form
pub fn encode(map: &PrivilegeMap) -> String {
    map.iter()
        .map(|(scope, tokens)| {
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            format!("{}:{}", scope, tokens.join(","))
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse one `SHOW GRANTS` line
///
/// Returns `Ok(None)` for role membership lines (`GRANT role TO user`),
/// which carry no privileges.
///
/// # Errors
///
/// [`PrivilegeError::GrantParse`] when the line matches no known shape.
pub fn parse_grant_statement(line: &str) -> PrivilegeResult<Option<(Scope, Vec<String>)>> {
    let line = line.trim();

    let Some(caps) = GRANT_LINE.captures(line) else {
        if ROLE_GRANT_LINE.is_match(line) {
            trace!(line, "Skipping role membership grant");
            return Ok(None);
        }
        return Err(PrivilegeError::GrantParse {
            line: line.to_string(),
        });
    };

    let privileges = caps.get(1).map_or("", |m| m.as_str());
    let scope = Scope::from_server(caps.get(2).map_or("", |m| m.as_str()));
    let rest = caps.get(3).map_or("", |m| m.as_str());

    let tokens: Vec<String> = privileges
        .split(',')
        .map(|t| canonical_name(t.trim()))
        .collect();
    let mut tokens = normalize_column_grants(tokens);

    if rest.contains("WITH GRANT OPTION") {
        tokens.push(GRANT_OPTION.to_string());
    }

    Ok(Some((scope, tokens)))
}

/// Parse every line of a `SHOW GRANTS` result into one map
pub fn parse_grants<I, S>(lines: I) -> PrivilegeResult<PrivilegeMap>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut map = PrivilegeMap::new();
    for line in lines {
        if let Some((scope, tokens)) = parse_grant_statement(line.as_ref())? {
            map.extend(scope, tokens);
        }
    }
    Ok(map)
}

/// Re-join and sort column privilege tokens
///
/// The server lists column privileges with the same comma it uses between
/// privileges, so `SELECT (b, a), INSERT` arrives as
/// `["SELECT (b", "a)", "INSERT"]`. Tokens from an opening `PRIV (` up to
/// the next token holding `)` are merged back into one, and the column
/// names are backtick-stripped, sorted and de-duplicated.
///
/// ```rust
/// use mysql_accounts_privileges::normalize_column_grants;
///
/// let tokens = vec!["SELECT (B".to_string(), "A)".to_string(), "DELETE".to_string()];
/// assert_eq!(normalize_column_grants(tokens), vec!["SELECT (A, B)", "DELETE"]);
/// ```
pub fn normalize_column_grants(tokens: Vec<String>) -> Vec<String> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let Some(name) = column_privilege_name(token) else {
            output.push(token.clone());
            i += 1;
            continue;
        };

        let Some(end) = (i..tokens.len()).find(|&j| tokens[j].contains(')')) else {
            output.push(token.clone());
            i += 1;
            continue;
        };

        let joined = tokens[i..=end].join(",");
        output.push(sort_columns(name, &joined));
        i = end + 1;
    }

    output
}

/// Name of a column-capable privilege when `token` opens a column list
fn column_privilege_name(token: &str) -> Option<&'static str> {
    let (name, _) = token.split_once('(')?;
    let name = name.trim();
    COLUMN_PRIVILEGES
        .into_iter()
        .find(|p| p.eq_ignore_ascii_case(name))
}

fn sort_columns(name: &str, token: &str) -> String {
    let inner = token
        .split_once('(')
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let inner = inner.rsplit_once(')').map_or(inner, |(cols, _)| cols);

    let mut columns: Vec<&str> = inner
        .split(',')
        .map(|c| c.trim().trim_matches('`'))
        .filter(|c| !c.is_empty())
        .collect();
    columns.sort_unstable();
    columns.dedup();

    format!("{name} ({})", columns.join(", "))
}

/// Split on commas that are not inside a column list
fn split_outside_parens(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Upper-case the privilege name, leaving any column list untouched
fn upper_case_name(token: &str) -> String {
    match token.split_once('(') {
        Some((name, columns)) => format!("{}({columns}", name.to_ascii_uppercase()),
        None => token.to_ascii_uppercase(),
    }
}

fn canonical_name(token: &str) -> String {
    if token == "ALL PRIVILEGES" {
        "ALL".to_string()
    } else {
        token.to_string()
    }
}

/// Privilege name without its column list
pub(crate) fn base_name(token: &str) -> &str {
    token.split_once('(').map_or(token, |(name, _)| name).trim()
}

/// Whether `token` can be written into a GRANT or REVOKE verbatim
pub(crate) fn is_safe_token(token: &str) -> bool {
    TOKEN_SHAPE.is_match(token)
}

fn check_token(token: &str, enforce_known: bool) -> PrivilegeResult<()> {
    if !is_safe_token(token) || (enforce_known && !is_known_privilege(base_name(token))) {
        return Err(PrivilegeError::InvalidPrivilegeSpec {
            token: token.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ========================================================================
    // Splitting and normalization
    // ========================================================================

    #[test]
    fn test_split_keeps_column_lists_together() {
        assert_eq!(
            split_outside_parens("SELECT(colA,colB),INSERT"),
            vec!["SELECT(colA,colB)", "INSERT"]
        );
    }

    #[test]
    fn test_normalize_server_split_columns() {
        let tokens = strings(&["SELECT (`B`", "`A`)", "INSERT (`B`", "`A`)", "DELETE"]);
        assert_eq!(
            normalize_column_grants(tokens),
            strings(&["SELECT (A, B)", "INSERT (A, B)", "DELETE"])
        );
    }

    #[test]
    fn test_normalize_single_token_is_sorted() {
        assert_eq!(
            normalize_column_grants(strings(&["UPDATE (c, a, b)"])),
            strings(&["UPDATE (a, b, c)"])
        );
    }

    #[test]
    fn test_normalize_without_space_before_paren() {
        assert_eq!(
            normalize_column_grants(strings(&["SELECT(colB,colA)"])),
            strings(&["SELECT (colA, colB)"])
        );
    }

    #[test]
    fn test_normalize_unclosed_list_left_alone() {
        let tokens = strings(&["SELECT (a", "INSERT"]);
        assert_eq!(normalize_column_grants(tokens.clone()), tokens);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            strings(&["SELECT (B", "A)"]),
            strings(&["REFERENCES (`z`", "`y`", "`x`)", "EXECUTE"]),
            strings(&["SELECT", "ALL"]),
            strings(&["SELECT (a, a)"]),
        ];
        for input in inputs {
            let once = normalize_column_grants(input);
            assert_eq!(normalize_column_grants(once.clone()), once);
        }
    }

    // ========================================================================
    // Token checks
    // ========================================================================

    #[test]
    fn test_token_shape() {
        assert!(is_safe_token("SELECT"));
        assert!(is_safe_token("REPLICATION SLAVE"));
        assert!(is_safe_token("SELECT (a, B_c)"));
        assert!(!is_safe_token("SELECT; DROP TABLE x"));
        assert!(!is_safe_token("SELECT (a`)"));
        assert!(!is_safe_token("select"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("SELECT (a, b)"), "SELECT");
        assert_eq!(base_name("SELECT(a)"), "SELECT");
        assert_eq!(base_name("LOCK TABLES"), "LOCK TABLES");
    }
}
