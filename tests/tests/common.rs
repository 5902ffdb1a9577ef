use nestfilter_core::{Catalog, Field, FieldKind, Schema};
use std::str::FromStr;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// `book.author` points at `author`, whose `profile` column holds an embedded document.
#[allow(unused)]
pub fn catalog() -> Catalog {
    let profile = Schema::new("profile")
        .with_field(Field::new("city", FieldKind::String))
        .with_field(Field::new("age", FieldKind::Integer))
        .with_field(Field::new("verified", FieldKind::Boolean))
        .with_field(Field::new("rating", FieldKind::Decimal))
        .with_field(Field::list("tags", Field::new("tag", FieldKind::String)))
        .with_field(Field::enumeration("status", [("ACTIVE", 1), ("RETIRED", 2)]))
        .with_field(Field::new("address", FieldKind::Dict));

    Catalog::new()
        .with_schema(
            Schema::new("author")
                .with_field(Field::new("id", FieldKind::Integer))
                .with_field(Field::new("name", FieldKind::String))
                .with_field(Field::embedded("profile", profile)),
        )
        .with_schema(
            Schema::new("book")
                .with_field(Field::new("id", FieldKind::Integer))
                .with_field(Field::new("title", FieldKind::String))
                .with_field(Field::relationship("author", "author")),
        )
}

/// Authors store `profile` as JSON text, the way SQLite keeps documents.
#[allow(unused)]
pub const SQLITE_SEED: &str = r#"
    CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT, profile TEXT);
    CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, author_id INTEGER);
    INSERT INTO authors VALUES (1, 'ada', '{"city": "Berlin", "age": 36, "verified": true, "tags": ["x"], "status": 1}');
    INSERT INTO authors VALUES (2, 'bob', '{"city": "Paris", "age": 0, "verified": false, "tags": ["y"], "status": 2}');
    INSERT INTO authors VALUES (3, 'cyd', '{"city": "Berlin", "tags": ["x", "y"]}');
    INSERT INTO books VALUES (10, 'Engines', 1);
    INSERT INTO books VALUES (11, 'Letters', 2);
    INSERT INTO books VALUES (12, 'Notes', 3);
    INSERT INTO books VALUES (13, 'Sketches', 1);
"#;
