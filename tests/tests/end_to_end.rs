mod common;

use anyhow::Result;
use nestfilter_core::{CompileError, JsonbPlugin};
use nestfilter_tests::{Host, HostError, Query};
use rusqlite::Connection;

fn titles(query: &Query) -> Result<Vec<String>> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(common::SQLITE_SEED)?;
    let (sql, params) = query.to_sqlite(vec!["title"])?;
    let mut stmt = conn.prepare(&sql)?;
    let titles = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| row.get::<_, String>(0))?.collect::<Result<Vec<_>, _>>()?;
    Ok(titles)
}

fn sorted(mut titles: Vec<String>) -> Vec<String> {
    titles.sort();
    titles
}

#[test]
fn test_filter_through_relationship_renders_join_and_cast() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request("book", Some(r#"[{"name": "author__profile__city", "op": "eq", "val": "Berlin"}]"#), None)?;
    assert_eq!(query.joins.len(), 1);

    let (sql, args) = query.to_postgres(vec!["title"])?;
    assert_eq!(
        sql,
        r#"SELECT "title" FROM "books" JOIN "authors" ON "books"."author_id" = "authors"."id" WHERE CAST("authors"."profile" ->> 'city' AS TEXT) = $1"#
    );
    assert_eq!(format!("{:?}", args), r#"["Berlin"]"#);

    assert_eq!(sorted(titles(&query)?), vec!["Engines", "Notes", "Sketches"]);
    Ok(())
}

#[test]
fn test_sort_through_relationship_is_numeric() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request("book", None, Some("-author__profile__age,title"))?;
    let (sql, args) = query.to_postgres(vec!["title"])?;
    assert_eq!(
        sql,
        r#"SELECT "title" FROM "books" JOIN "authors" ON "books"."author_id" = "authors"."id" WHERE TRUE ORDER BY CAST("authors"."profile" ->> 'age' AS BIGINT) DESC, "books"."title" ASC"#
    );
    assert!(args.is_empty());

    // NULL sorts lowest in SQLite, so the author without an age comes last
    assert_eq!(titles(&query)?, vec!["Engines", "Sketches", "Letters", "Notes"]);
    Ok(())
}

#[test]
fn test_filter_and_sort_share_one_join() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request("book", Some(r#"[{"name": "author__profile__city", "op": "eq", "val": "Berlin"}]"#), Some("author__profile__age,title"))?;
    assert_eq!(query.joins.len(), 1);
    assert_eq!(titles(&query)?, vec!["Notes", "Engines", "Sketches"]);
    Ok(())
}

#[test]
fn test_embedded_semantics_survive_the_relationship_hop() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);
    let filter = |name: &str, val: &str| -> Result<Vec<String>> {
        let raw = format!(r#"{{"name": "{}", "op": "eq", "val": {}}}"#, name, val);
        Ok(sorted(titles(&host.request("book", Some(&raw), None)?)?))
    };

    // zero also matches the author whose profile has no age
    assert_eq!(filter("author__profile__age", "0")?, vec!["Letters", "Notes"]);
    assert_eq!(filter("author__profile__tags", r#""y""#)?, vec!["Letters", "Notes"]);
    assert_eq!(filter("author__profile__status", r#""ACTIVE""#)?, vec!["Engines", "Sketches"]);
    assert_eq!(filter("author__profile__verified", r#""false""#)?, vec!["Letters"]);
    Ok(())
}

#[test]
fn test_combinators_mix_embedded_and_plain_leaves() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request(
        "book",
        Some(r#"{"or": [{"name": "author__profile__city", "op": "eq", "val": "Paris"}, {"name": "title", "op": "eq", "val": "Notes"}]}"#),
        None,
    )?;
    assert_eq!(sorted(titles(&query)?), vec!["Letters", "Notes"]);

    let query = host.request("book", Some(r#"{"not": {"name": "author__profile__city", "op": "eq", "val": "Berlin"}}"#), None)?;
    assert_eq!(titles(&query)?, vec!["Letters"]);
    Ok(())
}

#[test]
fn test_plain_relationship_path_is_left_to_the_host() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let query = host.request("book", Some(r#"[{"name": "author__name", "op": "eq", "val": "bob"}]"#), None)?;
    let (sql, _) = query.to_postgres(vec!["title"])?;
    assert_eq!(sql, r#"SELECT "title" FROM "books" JOIN "authors" ON "books"."author_id" = "authors"."id" WHERE "authors"."name" = $1"#);
    assert_eq!(titles(&query)?, vec!["Letters"]);
    Ok(())
}

#[test]
fn test_custom_separator() -> Result<()> {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new().with_config(nestfilter_core::CompilerConfig::new().with_separator("."))?;
    let host = Host::new(&catalog, &plugin).with_separator(".");

    let query = host.request("book", Some(r#"[{"name": "author.profile.city", "op": "eq", "val": "Paris"}]"#), Some("-author.profile.age"))?;
    assert_eq!(titles(&query)?, vec!["Letters"]);
    Ok(())
}

#[test]
fn test_invalid_embedded_paths_are_client_errors() {
    let catalog = common::catalog();
    let plugin = JsonbPlugin::new();
    let host = Host::new(&catalog, &plugin);

    let compile_error = |filter: Option<&str>, sort: Option<&str>| match host.request("book", filter, sort) {
        Err(HostError::Compile(err)) => err,
        other => panic!("expected a compile error, got {:?}", other),
    };

    let err = compile_error(Some(r#"[{"name": "author__profile", "op": "eq", "val": "x"}]"#), None);
    assert!(matches!(err, CompileError::InvalidPath { .. }));
    assert_eq!(err.status_code(), 400);

    let err = compile_error(Some(r#"[{"name": "author__profile__city__street", "op": "eq", "val": "x"}]"#), None);
    assert!(matches!(err, CompileError::InvalidPath { .. }));

    let err = compile_error(Some(r#"[{"name": "author__profile__zip", "op": "eq", "val": "x"}]"#), None);
    assert!(matches!(err, CompileError::InvalidPath { .. }));
    assert_eq!(err.path(), "author__profile__zip");

    let err = compile_error(Some(r#"[{"name": "author__profile__age", "op": "eq", "val": "old"}]"#), None);
    assert!(matches!(err, CompileError::InvalidValue { .. }));

    let err = compile_error(None, Some("author__profile__address"));
    assert!(matches!(err, CompileError::UnsupportedSort { .. }));
}
