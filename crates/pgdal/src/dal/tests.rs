use super::*;
use crate::clause::{FilterBinding, Page};
use crate::mock::{Call, MockConnection, Step};
use crate::values;

fn dal(conn: MockConnection) -> Dal<MockConnection> {
    Dal::new(conn, DalConfig::default())
}

fn unique_violation() -> DalError {
    DalError::Execution {
        sqlstate: Some("23505".to_string()),
        message: "duplicate key value violates unique constraint \"users_pkey\"".to_string(),
    }
}

fn sql(s: &str) -> String {
    s.to_string()
}

#[tokio::test]
async fn insert_returns_read_back_row() {
    let persisted = values! { "id" => 7, "name" => "a", "age" => 3 };
    let conn = MockConnection::new()
        .returning(vec![values! { "id" => 7 }])
        .returning(vec![persisted.clone()]);
    let mut dal = dal(conn);

    let rows = dal
        .insert("users", &values! { "name" => "a", "age" => 3 }, "id")
        .await
        .unwrap();
    assert_eq!(rows, vec![persisted]);

    let conn = dal.connection().unwrap();
    assert_eq!(
        conn.statements(),
        vec![
            (
                sql("INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id"),
                vec![Value::from("a"), Value::Int(3)],
            ),
            (sql("SELECT * FROM users WHERE id = $1"), vec![Value::Int(7)]),
        ]
    );
    let commits = conn.calls().iter().filter(|c| **c == Call::Commit).count();
    assert_eq!(commits, 2);
}

#[tokio::test]
async fn insert_empty_data_touches_nothing() {
    let mut dal = dal(MockConnection::new());
    let err = dal
        .insert("users", &ColumnValues::new(), "id")
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::EmptyInput(_)));
    assert!(dal.connection().unwrap().calls().is_empty());
}

#[tokio::test]
async fn insert_read_back_matches_signed_text_key_exactly() {
    let conn = MockConnection::new()
        .returning(vec![values! { "code" => "!abc" }])
        .returning(vec![values! { "code" => "!abc", "n" => 1 }]);
    let mut dal = dal(conn);

    dal.insert("items", &values! { "code" => "!abc", "n" => 1 }, "code")
        .await
        .unwrap();
    assert_eq!(
        dal.connection().unwrap().statements()[1],
        (
            sql("SELECT * FROM items WHERE code = $1"),
            vec![Value::from("!abc")]
        )
    );
}

#[tokio::test]
async fn insert_failure_is_returned() {
    let mut dal = dal(MockConnection::new().failing(Step::Query, unique_violation()));
    let err = dal
        .insert("users", &values! { "id" => 1 }, "id")
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert!(err.message().contains("users_pkey"));
}

#[tokio::test]
async fn insert_list_inserts_every_row() {
    let conn = MockConnection::new()
        .returning(vec![values! { "id" => 1 }])
        .returning(vec![values! { "id" => 1, "name" => "a" }])
        .returning(vec![values! { "id" => 2 }])
        .returning(vec![values! { "id" => 2, "name" => "b" }]);
    let mut dal = dal(conn);

    let rows = vec![
        vec![Value::from("a")],
        vec![Value::from("x"), Value::from("extra")],
        vec![Value::from("b")],
    ];
    let results = dal.insert_list("users", &["name"], &rows, "id").await;

    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().unwrap(),
        &vec![values! { "id" => 1, "name" => "a" }]
    );
    assert!(matches!(results[1], Err(DalError::Validation(_))));
    assert_eq!(
        results[2].as_ref().unwrap(),
        &vec![values! { "id" => 2, "name" => "b" }]
    );
    assert_eq!(dal.connection().unwrap().statements().len(), 4);
}

#[tokio::test]
async fn insert_list_of_nothing_is_empty() {
    let mut dal = dal(MockConnection::new());
    let results = dal.insert_list::<&str>("users", &["name"], &[], "id").await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn insert_or_update_falls_back_to_update() {
    let updated = values! { "id" => 5, "name" => "b" };
    let conn = MockConnection::new()
        .failing(Step::Query, unique_violation())
        .returning(vec![updated.clone()]);
    let mut dal = dal(conn);

    let rows = dal
        .insert_or_update("users", &values! { "id" => "5", "name" => "b" }, "id")
        .await
        .unwrap();
    assert_eq!(rows, vec![updated]);

    let conn = dal.connection().unwrap();
    let statements = conn.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1],
        (
            sql("UPDATE users SET id=$1, name=$2 WHERE id = $3 RETURNING *"),
            vec![Value::from("5"), Value::from("b"), Value::Int(5)],
        )
    );
    let calls = conn.calls();
    assert_eq!(calls.iter().filter(|c| **c == Call::Rollback).count(), 1);
    assert_eq!(calls.iter().filter(|c| **c == Call::Commit).count(), 1);
}

#[tokio::test]
async fn insert_or_update_targets_signed_text_key_exactly() {
    let conn = MockConnection::new().failing(Step::Query, unique_violation());
    let mut dal = dal(conn);

    dal.insert_or_update("items", &values! { "code" => ">m", "n" => 1 }, "code")
        .await
        .unwrap();
    assert_eq!(
        dal.connection().unwrap().statements()[1],
        (
            sql("UPDATE items SET code=$1, n=$2 WHERE code = $3 RETURNING *"),
            vec![Value::from(">m"), Value::Int(1), Value::from(">m")],
        )
    );
}

#[tokio::test]
async fn insert_or_update_keeps_non_execution_errors() {
    let conn = MockConnection::new().failing(
        Step::Prepare,
        DalError::Prepare {
            sqlstate: Some("42P01".to_string()),
            message: "relation \"users\" does not exist".to_string(),
        },
    );
    let mut dal = dal(conn);
    let err = dal
        .insert_or_update("users", &values! { "id" => 5 }, "id")
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::Prepare { .. }));
    assert_eq!(dal.connection().unwrap().statements().len(), 0);
}

#[tokio::test]
async fn insert_or_update_without_id_value() {
    let mut dal = dal(MockConnection::new().failing(Step::Query, unique_violation()));
    let err = dal
        .insert_or_update("users", &values! { "name" => "b" }, "id")
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::EmptyInput(_)));
}

#[tokio::test]
async fn insert_or_update_reports_fallback_failure() {
    let conn = MockConnection::new()
        .failing(Step::Query, unique_violation())
        .failing(Step::Query, DalError::execution("value too long"));
    let mut dal = dal(conn);
    let err = dal
        .insert_or_update("users", &values! { "id" => 5, "name" => "b" }, "id")
        .await
        .unwrap_err();
    assert!(err.message().contains("value too long"));
}

#[tokio::test]
async fn update_with_inline_literals() {
    let mut dal = Dal::new(
        MockConnection::new().returning(vec![values! { "id" => 6, "status" => "active" }]),
        DalConfig::new().filter_binding(FilterBinding::Inline),
    );
    let rows = dal
        .update(
            "users",
            &values! { "status" => "active" },
            &Filter::by(values! { "!id" => 5 }),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        dal.connection().unwrap().statements(),
        vec![(
            sql("UPDATE users SET status=$1 WHERE id <> 5 RETURNING *"),
            vec![Value::from("active")],
        )]
    );
}

#[tokio::test]
async fn update_empty_data_touches_nothing() {
    let mut dal = dal(MockConnection::new());
    let err = dal
        .update("users", &ColumnValues::new(), &Filter::by(values! { "id" => 1 }))
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::EmptyInput(_)));
    assert!(dal.connection().unwrap().calls().is_empty());
}

#[tokio::test]
async fn fetch_parameterizes_filter_operands() {
    let mut dal = dal(MockConnection::new());
    let options = FetchOptions::new()
        .filter(Filter::by(values! { "age" => ">2", "name" => "%ann" }))
        .order(Order::new().desc("id"))
        .page(Page::default().limit(10));
    let rows = dal.fetch("users", &["id", "name"], &options).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(
        dal.connection().unwrap().statements(),
        vec![(
            sql("SELECT id, name FROM users WHERE age > $1 AND name LIKE $2 \
                 ORDER BY id DESC LIMIT 10 OFFSET 0"),
            vec![Value::from("2"), Value::from("%ann%")],
        )]
    );
}

#[tokio::test]
async fn fetch_all_orders_every_row() {
    let mut dal = dal(MockConnection::new().returning(vec![
        values! { "id" => 1 },
        values! { "id" => 2 },
    ]));
    let rows = dal
        .fetch_all("users", &Order::new().asc("id"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(
        dal.connection().unwrap().statements()[0].0,
        "SELECT * FROM users ORDER BY id ASC LIMIT ALL OFFSET 0"
    );
}

#[tokio::test]
async fn delete_returns_affected_rows() {
    let mut dal = dal(MockConnection::new().affecting(2));
    let n = dal.delete("users", "id", "<10").await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(
        dal.connection().unwrap().statements(),
        vec![(
            sql("DELETE FROM users WHERE id < $1"),
            vec![Value::from("10")]
        )]
    );
}

#[tokio::test]
async fn delete_all_truncates() {
    let mut dal = dal(MockConnection::new());
    dal.delete_all("users", Truncate::default()).await.unwrap();
    assert_eq!(
        dal.connection().unwrap().statements()[0].0,
        "TRUNCATE users RESTART IDENTITY CASCADE"
    );
}

#[tokio::test]
async fn raw_statements_bind_by_name() {
    let conn = MockConnection::new()
        .affecting(1)
        .returning(vec![values! { "n" => 1 }]);
    let mut dal = dal(conn);

    let n = dal
        .raw_query(
            "UPDATE users SET name = :name WHERE id = :id",
            &values! { ":id" => 3, "name" => "z" },
        )
        .await
        .unwrap();
    assert_eq!(n, 1);

    let rows = dal
        .raw_fetch("SELECT count(*) AS n FROM users WHERE name = :name", &values! { "name" => "z" })
        .await
        .unwrap();
    assert_eq!(rows, vec![values! { "n" => 1 }]);

    let statements = dal.connection().unwrap().statements();
    assert_eq!(
        statements[0],
        (
            sql("UPDATE users SET name = $1 WHERE id = $2"),
            vec![Value::from("z"), Value::Int(3)],
        )
    );
    assert_eq!(statements[1].1, vec![Value::from("z")]);
}

#[tokio::test]
async fn raw_query_missing_binding() {
    let mut dal = dal(MockConnection::new());
    let err = dal
        .raw_query("DELETE FROM users WHERE id = :id", &ColumnValues::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::Bind(_)));
}

#[tokio::test]
async fn last_insert_id_passes_through() {
    let mut dal = dal(MockConnection::new().with_last_id(41));
    assert_eq!(dal.last_insert_id().await.unwrap(), 41);
    assert_eq!(dal.connection().unwrap().calls(), vec![Call::LastInsertId]);
}

#[tokio::test]
async fn disconnected_operations_fail_uniformly() {
    let mut dal = Dal::<MockConnection>::disconnected(DalConfig::default());
    assert!(!dal.is_connected());
    assert!(dal.options().is_none());

    let data = values! { "name" => "a" };
    let filter = Filter::by(values! { "id" => 1 });
    let results = vec![
        dal.insert("users", &data, "id").await.map(|_| ()),
        dal.insert_or_update("users", &data, "id").await.map(|_| ()),
        dal.update("users", &data, &filter).await.map(|_| ()),
        dal.fetch::<&str>("users", &[], &FetchOptions::new()).await.map(|_| ()),
        dal.fetch_all("users", &Order::new()).await.map(|_| ()),
        dal.delete("users", "id", 1).await.map(|_| ()),
        dal.delete_all("users", Truncate::default()).await.map(|_| ()),
        dal.raw_query("SELECT 1", &ColumnValues::new()).await.map(|_| ()),
        dal.raw_fetch("SELECT 1", &ColumnValues::new()).await.map(|_| ()),
        dal.last_insert_id().await.map(|_| ()),
    ];
    for result in results {
        assert!(result.unwrap_err().is_connection_unavailable());
    }

    let list = dal
        .insert_list("users", &["name"], &[vec![Value::from("a")], vec![Value::from("b")]], "id")
        .await;
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|r| matches!(r, Err(DalError::ConnectionUnavailable(_)))));
}

#[tokio::test]
async fn connect_without_credentials_stays_disconnected() {
    let dal = Dal::connect(ConnectOptions::new("app", "svc", ""), DalConfig::default())
        .await
        .unwrap();
    assert!(!dal.is_connected());
    assert_eq!(dal.options().map(|o| o.database.as_str()), Some("app"));
}
