// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! User lifecycle against scripted servers

use std::collections::BTreeMap;

use mysql_accounts_lifecycle::{
    LifecycleError, LifecycleOptions, LimitValue, Session, UpdatePassword, UserSpec, ensure_user_absent,
    ensure_user_present,
};
use mysql_accounts_privileges::Policy;
use mysql_accounts_test_utils::{ServerFixtures, TranscriptAssertions, fixtures, rows};

const HASH: &str = ServerFixtures::native_hash_of_secret();

fn options() -> LifecycleOptions {
    LifecycleOptions::default()
}

fn dry_run() -> LifecycleOptions {
    LifecycleOptions::default().with_dry_run(true)
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_user_hashes_password_on_server() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .respond("SELECT CONCAT('*', UCASE(SHA1(UNHEX(SHA1('secret')))))", rows::texts(&[HASH]))
        .build();

    let spec = UserSpec::new("app", "%")
        .with_password("secret")
        .with_privileges("db.*:SELECT", Policy::Replace);
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    assert_eq!(outcome.msg, "User added");
    assert_eq!(outcome.password_changed, Some(true));
    TranscriptAssertions::assert_sent(
        &conn,
        &format!("CREATE USER 'app'@'%' IDENTIFIED WITH mysql_native_password AS '{HASH}'"),
    );
    TranscriptAssertions::assert_sent(&conn, "GRANT SELECT ON `db`.* TO 'app'@'%'");
    TranscriptAssertions::assert_ordered(&conn, "CREATE USER", "GRANT SELECT");

    // Secrets never show up in the reported statements
    assert!(outcome.statements[0].contains("'********'"));
    assert!(outcome.statements.iter().all(|s| !s.contains(HASH)));
}

#[tokio::test]
async fn test_create_user_dry_run_sends_nothing() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let spec = UserSpec::new("app", "%").with_password("secret");
    let outcome = {
        let mut session = Session::open(&mut conn, dry_run()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    assert_eq!(outcome.msg, "User added");
    assert_eq!(outcome.password_changed, None);
    assert!(outcome.statements.is_empty());
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_create_user_old_management_sends_require_with_grants() {
    let mut conn = fixtures::mariadb_100()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let mut spec = UserSpec::new("app", "%").with_password("secret");
    spec.tls_requires = Some(BTreeMap::from([("SSL".to_string(), None)]));
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    TranscriptAssertions::assert_sent(&conn, "CREATE USER 'app'@'%' IDENTIFIED BY 'secret'");
    TranscriptAssertions::assert_not_sent(&conn, "CREATE USER 'app'@'%' IDENTIFIED BY 'secret' REQUIRE");
    TranscriptAssertions::assert_sent(&conn, "GRANT USAGE ON *.* TO 'app'@'%' REQUIRE SSL");
}

#[tokio::test]
async fn test_create_user_new_management_puts_require_on_create() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let mut spec = UserSpec::new("app", "%");
    spec.tls_requires = Some(BTreeMap::from([("x509".to_string(), None)]));
    {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap();
    }

    TranscriptAssertions::assert_mutations(&conn, &["CREATE USER 'app'@'%' REQUIRE X509"]);
}

#[tokio::test]
async fn test_requiressl_in_privileges_becomes_tls_requirement() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let spec = UserSpec::new("app", "%").with_privileges("*.*:SELECT,REQUIRESSL", Policy::Replace);
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.warnings.len(), 1);
    TranscriptAssertions::assert_sent(&conn, "CREATE USER 'app'@'%' REQUIRE SSL");
    TranscriptAssertions::assert_sent(&conn, "GRANT SELECT ON *.* TO 'app'@'%'");
}

#[tokio::test]
async fn test_create_with_host_all_is_rejected() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let mut spec = UserSpec::new("app", "%");
    spec.host_all = true;
    let err = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap_err()
    };

    assert_eq!(err.to_string(), "host_all parameter cannot be used when adding a user");
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_create_with_invalid_encrypted_hash_is_rejected() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let mut spec = UserSpec::new("app", "%").with_password("not-a-hash");
    spec.encrypted = true;
    let err = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap_err()
    };

    assert!(matches!(err, LifecycleError::Configuration(_)));
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_failure_after_create_reports_applied_statements() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .fail("GRANT SELECT", 1044, "Access denied")
        .build();

    let spec = UserSpec::new("app", "%").with_privileges("db.*:SELECT", Policy::Replace);
    let err = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap_err()
    };

    assert!(err.partially_applied());
    assert!(err.applied().iter().any(|s| s.starts_with("CREATE USER 'app'@'%'")));
}

#[tokio::test]
async fn test_reuse_existing_password_copies_credential() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .respond(
            "GROUP BY plugin, authentication_string",
            vec![mysql_accounts_connection::Row::tuple(vec![
                "mysql_native_password".into(),
                HASH.into(),
            ])],
        )
        .build();

    let mut spec = UserSpec::new("app", "10.0.0.%").with_password("ignored");
    spec.reuse_existing_password = true;
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.password_changed, Some(false));
    TranscriptAssertions::assert_sent(
        &conn,
        &format!("CREATE USER 'app'@'10.0.0.%' IDENTIFIED WITH 'mysql_native_password' AS '{HASH}'"),
    );
}

// ============================================================================
// Modification
// ============================================================================

fn existing_user() -> mysql_accounts_test_utils::MockConnectionBuilder {
    fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(1))
        .respond("information_schema.COLUMNS", rows::texts(&["authentication_string"]))
}

#[tokio::test]
async fn test_unchanged_password_is_not_resent() {
    let mut conn = existing_user()
        .respond("SELECT COALESCE", rows::texts(&[HASH]))
        .respond("SELECT CONCAT", rows::texts(&[HASH]))
        .build();

    let spec = UserSpec::new("app", "%").with_password("secret");
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(!outcome.changed);
    assert_eq!(outcome.msg, "User unchanged");
    assert_eq!(outcome.password_changed, Some(false));
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_changed_password_uses_alter_user() {
    let mut conn = existing_user()
        .respond("SELECT COALESCE", rows::texts(&["*0000000000000000000000000000000000000000"]))
        .respond("SELECT CONCAT", rows::texts(&[HASH]))
        .build();

    let spec = UserSpec::new("app", "%").with_password("secret");
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    assert_eq!(outcome.msg, "Password updated (new style)");
    assert_eq!(outcome.password_changed, Some(true));
    TranscriptAssertions::assert_mutations(
        &conn,
        &[format!("ALTER USER 'app'@'%' IDENTIFIED WITH mysql_native_password AS '{HASH}'").as_str()],
    );
}

#[tokio::test]
async fn test_rejected_alter_user_falls_back_to_table_update() {
    let mut conn = existing_user()
        .respond("SELECT COALESCE", rows::texts(&[""]))
        .respond("SELECT CONCAT", rows::texts(&[HASH]))
        .fail("ALTER USER", 1396, "Operation ALTER USER failed")
        .build();

    let spec = UserSpec::new("root", "localhost").with_password("secret");
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.msg, "Password forced update");
    TranscriptAssertions::assert_sent(&conn, "UPDATE mysql.user SET plugin = 'mysql_native_password'");
    TranscriptAssertions::assert_ordered(&conn, "UPDATE mysql.user", "FLUSH PRIVILEGES");
}

#[tokio::test]
async fn test_on_create_never_touches_existing_password() {
    let mut conn = existing_user().build();

    let mut spec = UserSpec::new("app", "%").with_password("secret");
    spec.update_password = UpdatePassword::OnCreate;
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(!outcome.changed);
    TranscriptAssertions::assert_not_sent(&conn, "SELECT CONCAT");
}

#[tokio::test]
async fn test_privileges_replaced_and_reread() {
    let mut conn = existing_user()
        .respond_once("SHOW GRANTS", rows::grants(&["GRANT USAGE ON *.* TO 'app'@'%'"]))
        .respond(
            "SHOW GRANTS",
            rows::grants(&[
                "GRANT USAGE ON *.* TO 'app'@'%'",
                "GRANT SELECT ON `db`.* TO 'app'@'%'",
            ]),
        )
        .build();

    let spec = UserSpec::new("app", "%").with_privileges("db.*:SELECT", Policy::Replace);
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    TranscriptAssertions::assert_mutations(&conn, &["GRANT SELECT ON `db`.* TO 'app'@'%'"]);
}

#[tokio::test]
async fn test_privilege_change_in_dry_run_is_reported_only() {
    let mut conn = existing_user()
        .respond("SHOW GRANTS", rows::grants(&["GRANT USAGE ON *.* TO 'app'@'%'"]))
        .build();

    let spec = UserSpec::new("app", "%").with_privileges("db.*:SELECT", Policy::Append);
    let outcome = {
        let mut session = Session::open(&mut conn, dry_run()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.changed);
    TranscriptAssertions::assert_read_only(&conn);
}

#[tokio::test]
async fn test_tls_requirement_removed_with_empty_map() {
    let mut conn = existing_user()
        .respond(
            "SHOW CREATE USER",
            rows::texts(&["CREATE USER 'app'@'%' IDENTIFIED WITH 'caching_sha2_password' REQUIRE SSL"]),
        )
        .build();

    let mut spec = UserSpec::new("app", "%");
    spec.tls_requires = Some(BTreeMap::new());
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.msg, "TLS requires updated");
    TranscriptAssertions::assert_mutations(&conn, &["ALTER USER 'app'@'%' REQUIRE NONE"]);
}

#[tokio::test]
async fn test_only_differing_resource_limits_are_sent() {
    use mysql_accounts_connection::Value;

    let mut conn = existing_user()
        .respond(
            "SELECT max_questions",
            rows::record(&[
                ("MAX_QUERIES_PER_HOUR", Value::Int(10)),
                ("MAX_UPDATES_PER_HOUR", Value::Int(0)),
                ("MAX_CONNECTIONS_PER_HOUR", Value::Int(0)),
                ("MAX_USER_CONNECTIONS", Value::Int(0)),
            ]),
        )
        .build();

    let mut spec = UserSpec::new("app", "%");
    spec.resource_limits = BTreeMap::from([
        ("MAX_QUERIES_PER_HOUR".to_string(), LimitValue::Int(10)),
        ("max_user_connections".to_string(), LimitValue::Text("5".into())),
    ]);
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.msg, "Resource limits updated");
    TranscriptAssertions::assert_mutations(&conn, &["ALTER USER 'app'@'%' WITH MAX_USER_CONNECTIONS 5"]);
}

#[tokio::test]
async fn test_sql_log_bin_disabled_for_session() {
    let mut conn = existing_user().build();

    let mut spec = UserSpec::new("app", "%");
    spec.sql_log_bin = false;
    let outcome = {
        let mut session = Session::open(&mut conn, dry_run()).await.unwrap();
        ensure_user_present(&mut session, &spec).await.unwrap()
    };

    assert!(outcome.statements.is_empty());
    TranscriptAssertions::assert_mutations(&conn, &["SET SQL_LOG_BIN=0"]);
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test]
async fn test_drop_missing_user_is_unchanged() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(0))
        .build();

    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_absent(&mut session, &UserSpec::new("app", "%")).await.unwrap()
    };

    assert!(!outcome.changed);
    assert_eq!(outcome.msg, "User doesn't exist");
}

#[tokio::test]
async fn test_drop_on_every_host() {
    let mut conn = fixtures::mysql_80()
        .respond("SELECT count(*) FROM mysql.user", rows::count(2))
        .respond("SELECT Host FROM mysql.user", rows::texts(&["%", "localhost"]))
        .build();

    let mut spec = UserSpec::new("app", "%");
    spec.host_all = true;
    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_absent(&mut session, &spec).await.unwrap()
    };

    assert_eq!(outcome.statements.len(), 2);
    TranscriptAssertions::assert_mutations(
        &conn,
        &["DROP USER IF EXISTS 'app'@'%'", "DROP USER IF EXISTS 'app'@'localhost'"],
    );
}

#[tokio::test]
async fn test_drop_falls_back_without_if_exists() {
    let mut conn = fixtures::mysql_57()
        .respond("SELECT count(*) FROM mysql.user", rows::count(1))
        .fail("DROP USER IF EXISTS", 1064, "You have an error in your SQL syntax")
        .build();

    let outcome = {
        let mut session = Session::open(&mut conn, options()).await.unwrap();
        ensure_user_absent(&mut session, &UserSpec::new("app", "%")).await.unwrap()
    };

    assert!(outcome.changed);
    assert_eq!(outcome.statements, vec!["DROP USER 'app'@'%'"]);
}
