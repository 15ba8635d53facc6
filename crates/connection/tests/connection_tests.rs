// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Provided methods of the `Connection` trait

use async_trait::async_trait;
use mysql_accounts_connection::{
    Connection, ConnectionError, ConnectionResult, QueryResult, Row, Statement, Value,
};

/// Echoes the rendered statement back as a single-row result
struct Echo {
    seen: Vec<String>,
}

#[async_trait]
impl Connection for Echo {
    async fn execute(&mut self, statement: &Statement) -> ConnectionResult<QueryResult> {
        let rendered = statement.render();
        self.seen.push(rendered.clone());
        if rendered.contains("nothing") {
            return Ok(QueryResult::default());
        }
        Ok(QueryResult::with_rows(vec![Row::new(
            vec!["sql".into()],
            vec![Value::Text(rendered)],
        )]))
    }
}

#[tokio::test]
async fn test_fetch_one_returns_first_row() {
    let mut conn = Echo { seen: vec![] };
    let stmt = Statement::builder()
        .keyword("SELECT ")
        .value("a%b")
        .build();
    let row = conn.fetch_one(&stmt).await.unwrap().unwrap();
    assert_eq!(row.text_named("sql").as_deref(), Some("SELECT 'a%b'"));
}

#[tokio::test]
async fn test_fetch_required_reports_statement() {
    let mut conn = Echo { seen: vec![] };
    let stmt = Statement::builder()
        .keyword("SELECT nothing FROM t WHERE p = ")
        .secret("pw")
        .build();
    let err = conn.fetch_required(&stmt).await.unwrap_err();
    assert_eq!(
        err,
        ConnectionError::NoRows {
            statement: "SELECT nothing FROM t WHERE p = '********'".into()
        }
    );
    assert_eq!(err.statement(), Some("SELECT nothing FROM t WHERE p = '********'"));
}

#[tokio::test]
async fn test_boxed_dyn_connection() {
    let mut conn: Box<dyn Connection> = Box::new(Echo { seen: vec![] });
    let rows = conn.fetch_all(&Statement::new("SHOW GRANTS")).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_execution_error_display_includes_statement() {
    let err = ConnectionError::Execution {
        statement: "DROP USER 'x'@'%'".into(),
        code: Some(1396),
        message: "Operation DROP USER failed".into(),
    };
    assert_eq!(err.code(), Some(1396));
    assert!(err.to_string().contains("Query == DROP USER 'x'@'%'"));
}
