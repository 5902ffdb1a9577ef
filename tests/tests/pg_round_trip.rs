//! Compiled nested filters executed against a real PostgreSQL instance.
//!
//! The SQLite round trips cover the same requests; these confirm that the `->>` extraction,
//! the casts and the `?` containment operator bind the way tokio-postgres sends arguments.

#![cfg(feature = "postgres")]

mod common;

use anyhow::Result;
use nestfilter_core::JsonbPlugin;
use nestfilter_tests::{Host, Query};
use testcontainers::ContainerAsync;
use testcontainers_modules::{postgres, testcontainers::runners::AsyncRunner};
use tokio_postgres::types::ToSql;

const PG_SEED: &str = r#"
    CREATE TABLE authors (id BIGINT PRIMARY KEY, name TEXT, profile JSONB);
    CREATE TABLE books (id BIGINT PRIMARY KEY, title TEXT, author_id BIGINT);
    INSERT INTO authors VALUES (1, 'ada', '{"city": "Berlin", "age": 36, "verified": true, "tags": ["x"], "status": 1}');
    INSERT INTO authors VALUES (2, 'bob', '{"city": "Paris", "age": 0, "verified": false, "tags": ["y"], "status": 2}');
    INSERT INTO authors VALUES (3, 'cyd', '{"city": "Berlin", "tags": ["x", "y"]}');
    INSERT INTO books VALUES (10, 'Engines', 1);
    INSERT INTO books VALUES (11, 'Letters', 2);
    INSERT INTO books VALUES (12, 'Notes', 3);
    INSERT INTO books VALUES (13, 'Sketches', 1);
"#;

async fn connect() -> Result<(ContainerAsync<postgres::Postgres>, tokio_postgres::Client)> {
    let container: ContainerAsync<postgres::Postgres> = postgres::Postgres::default()
        .with_db_name("nestfilter")
        .with_user("postgres")
        .with_password("postgres")
        .with_init_sql(PG_SEED.to_string().into_bytes())
        .start()
        .await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let (client, connection) =
        tokio_postgres::connect(&format!("host={host} port={port} user=postgres password=postgres dbname=nestfilter"), tokio_postgres::NoTls)
            .await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("connection error: {}", e);
        }
    });

    Ok((container, client))
}

async fn titles(client: &tokio_postgres::Client, query: &Query) -> Result<Vec<String>> {
    let (sql, args) = query.to_postgres(vec!["title"])?;
    let params: Vec<&(dyn ToSql + Sync)> = args.iter().map(|arg| arg.as_ref() as &(dyn ToSql + Sync)).collect();
    let rows = client.query(&sql, &params).await?;
    let mut titles: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
    titles.sort();
    Ok(titles)
}

#[tokio::test]
async fn test_nested_filters_on_jsonb() -> Result<()> {
    let (_container, client) = connect().await?;
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let cases = [
        (r#"{"name": "author__profile__city", "op": "eq", "val": "Berlin"}"#, vec!["Engines", "Notes", "Sketches"]),
        (r#"{"name": "author__profile__age", "op": "eq", "val": 0}"#, vec!["Letters", "Notes"]),
        (r#"{"name": "author__profile__age", "op": "gt", "val": "10"}"#, vec!["Engines", "Sketches"]),
        (r#"{"name": "author__profile__tags", "op": "eq", "val": "y"}"#, vec!["Letters", "Notes"]),
        (r#"{"name": "author__profile__verified", "op": "eq", "val": "no"}"#, vec!["Letters"]),
        (r#"{"name": "author__profile__status", "op": "in_", "val": ["RETIRED"]}"#, vec!["Letters"]),
        (r#"{"name": "author__profile__city", "op": "ilike", "val": "ber%"}"#, vec!["Engines", "Notes", "Sketches"]),
    ];
    for (filter, expected) in cases {
        let query = host.request("book", Some(filter), None)?;
        assert_eq!(titles(&client, &query).await?, expected, "{}", filter);
    }
    Ok(())
}

#[tokio::test]
async fn test_nested_sort_on_jsonb() -> Result<()> {
    let (_container, client) = connect().await?;
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request("author", None, Some("-profile__age"))?;
    let (sql, args) = query.to_postgres(vec!["name"])?;
    let params: Vec<&(dyn ToSql + Sync)> = args.iter().map(|arg| arg.as_ref() as &(dyn ToSql + Sync)).collect();
    let names: Vec<String> = client.query(&sql, &params).await?.iter().map(|row| row.get(0)).collect();
    // NULL sorts highest in Postgres, so a descending sort puts the missing age first
    assert_eq!(names, vec!["cyd", "ada", "bob"]);
    Ok(())
}
