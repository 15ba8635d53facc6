// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Assertions over the statements a mock connection received

use crate::mock_connection::MockConnection;

/// Custom assertion helpers for statement transcripts
pub struct TranscriptAssertions;

impl TranscriptAssertions {
    /// Assert that the connection received a statement containing `needle`
    pub fn assert_sent(conn: &MockConnection, needle: &str) {
        assert!(
            conn.saw(needle),
            "Expected a statement containing '{}', got {:#?}",
            needle,
            conn.executed()
        );
    }

    /// Assert that no received statement contains `needle`
    pub fn assert_not_sent(conn: &MockConnection, needle: &str) {
        assert!(
            !conn.saw(needle),
            "Unexpected statement containing '{}' in {:#?}",
            needle,
            conn.executed()
        );
    }

    /// Assert that nothing but queries reached the server
    pub fn assert_read_only(conn: &MockConnection) {
        let mutations = conn.mutations();
        assert!(mutations.is_empty(), "Expected no mutations, got {:#?}", mutations);
    }

    /// Assert that the mutations equal `expected`, in order
    pub fn assert_mutations(conn: &MockConnection, expected: &[&str]) {
        assert_eq!(conn.mutations(), expected, "Mutation transcript mismatch");
    }

    /// Assert that `first` was sent before `second`
    pub fn assert_ordered(conn: &MockConnection, first: &str, second: &str) {
        let executed = conn.executed();
        let a = executed.iter().position(|s| s.contains(first));
        let b = executed.iter().position(|s| s.contains(second));
        match (a, b) {
            (Some(a), Some(b)) => assert!(a < b, "'{}' was sent after '{}'", first, second),
            _ => panic!("Expected both '{}' and '{}' in {:#?}", first, second, executed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_accounts_connection::{Connection, Statement};

    #[tokio::test]
    async fn test_ordering_assertion() {
        let mut conn = MockConnection::default();
        conn.execute(&Statement::new("REVOKE SELECT ON *.* FROM x")).await.unwrap();
        conn.execute(&Statement::new("GRANT INSERT ON *.* TO x")).await.unwrap();
        TranscriptAssertions::assert_ordered(&conn, "REVOKE", "GRANT");
        TranscriptAssertions::assert_not_sent(&conn, "DROP");
    }
}
