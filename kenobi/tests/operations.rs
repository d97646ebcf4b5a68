mod common;

use anyhow::Result;
use common::{doc, names, temp_db};
use kenobi::{Database, Document, KenobiError, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[test]
fn test_insert_then_search() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(doc(json!({"name": "Obi-Wan", "rank": "master", "age": 57})))?;

    let found = db.search("name", "Obi-Wan", None, None)?;
    assert_eq!(found, vec![doc(json!({"name": "Obi-Wan", "rank": "master", "age": 57}))]);
    assert!(db.search("name", "Anakin", None, None)?.is_empty());
    Ok(())
}

#[test]
fn test_every_key_finds_the_inserted_document() -> Result<()> {
    let (_dir, db) = temp_db()?;
    let vader = doc(json!({"name": "Anakin", "color": "red", "saber": true, "kills": 11, "height": 2.02, "groups": ["sith"]}));
    db.insert(vader.clone())?;
    db.insert(doc(json!({"name": "Luke", "color": "green"})))?;

    for (key, value) in vader.iter() {
        assert!(db.search(key, value.clone(), None, None)?.contains(&vader), "search on {key} missed the document");
    }
    Ok(())
}

#[test]
fn test_insert_many_preserves_order() -> Result<()> {
    let (_dir, db) = temp_db()?;
    let inserted = db.insert_many(vec![doc(json!({"name": "Qui-Gon"})), doc(json!({"name": "Obi-Wan"})), doc(json!({"name": "Anakin"}))])?;
    assert_eq!(inserted, 3);
    assert_eq!(names(&db.all(None, None)?), vec!["Qui-Gon", "Obi-Wan", "Anakin"]);

    // an empty batch is a no-op
    assert_eq!(db.insert_many(Vec::new())?, 0);
    assert_eq!(db.count()?, 3);
    Ok(())
}

#[test]
fn test_all_pagination() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert_many((1..=3).map(|i| doc(json!({"name": format!("trooper-{}", i)}))))?;

    assert_eq!(names(&db.all(Some(1), Some(1))?), vec!["trooper-2"]);
    assert_eq!(names(&db.all(Some(2), None)?), vec!["trooper-1", "trooper-2"]);
    assert_eq!(names(&db.all(None, Some(2))?), vec!["trooper-3"]);
    assert_eq!(db.all(Some(0), None)?.len(), 3);
    assert_eq!(db.all(Some(-1), None)?.len(), 3);
    assert!(db.all(Some(10), Some(5))?.is_empty());
    assert!(matches!(db.all(None, Some(-1)), Err(KenobiError::Validation(_))));
    Ok(())
}

#[test]
fn test_search_paginates_after_filtering() -> Result<()> {
    let (_dir, db) = temp_db()?;
    for (name, side) in [("Luke", "light"), ("Vader", "dark"), ("Leia", "light"), ("Palpatine", "dark"), ("Rey", "light")] {
        db.insert(Document::new().with("name", name).with("side", side))?;
    }

    assert_eq!(names(&db.search("side", "light", None, None)?), vec!["Luke", "Leia", "Rey"]);
    assert_eq!(names(&db.search("side", "light", Some(1), Some(1))?), vec!["Leia"]);
    assert_eq!(names(&db.search("side", "light", Some(5), Some(2))?), vec!["Rey"]);
    assert!(db.search("side", "grey", None, None)?.is_empty());
    Ok(())
}

#[test]
fn test_large_integers_match_exactly() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(Document::new().with("id", 9_007_199_254_740_993i64).with("name", "odd"))?;
    db.insert(Document::new().with("id", 9_007_199_254_740_992i64).with("name", "even"))?;

    assert_eq!(names(&db.search("id", 9_007_199_254_740_992.0, None, None)?), vec!["even"]);
    assert_eq!(names(&db.remove("id", 9_007_199_254_740_992.0)?), vec!["even"]);
    assert_eq!(names(&db.all(None, None)?), vec!["odd"]);
    Ok(())
}

#[test]
fn test_search_compares_numbers_loosely() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(doc(json!({"name": "R2-D2", "age": 66})))?;
    db.insert(doc(json!({"name": "C-3PO", "age": 66.5})))?;

    assert_eq!(names(&db.search("age", 66.0, None, None)?), vec!["R2-D2"]);
    assert_eq!(names(&db.search("age", 66.5, None, None)?), vec!["C-3PO"]);
    // a string never equals a number
    assert!(db.search("age", "66", None, None)?.is_empty());
    Ok(())
}

#[test]
fn test_remove_returns_removed_documents() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert_many(vec![
        doc(json!({"name": "Jango", "clan": "fett"})),
        doc(json!({"name": "Din", "clan": "djarin"})),
        doc(json!({"name": "Boba", "clan": "fett"})),
    ])?;

    let removed = db.remove("clan", "fett")?;
    assert_eq!(names(&removed), vec!["Jango", "Boba"]);
    assert_eq!(names(&db.all(None, None)?), vec!["Din"]);

    assert!(db.remove("clan", "fett")?.is_empty());
    assert!(db.remove("missing", "anything")?.is_empty());
    Ok(())
}

#[test]
fn test_update_merges_shallowly() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(doc(json!({"name": "Anakin", "rank": "padawan", "ship": {"model": "N-1"}})))?;
    db.insert(doc(json!({"name": "Ahsoka", "rank": "padawan"})))?;

    let updated = db.update("name", "Anakin", doc(json!({"rank": "knight", "ship": {"color": "yellow"}, "arm": "mechanical"})))?;
    assert_eq!(updated, 1);

    let anakin = db.search("name", "Anakin", None, None)?;
    // nested objects are replaced, not merged
    assert_eq!(anakin, vec![doc(json!({"name": "Anakin", "rank": "knight", "ship": {"color": "yellow"}, "arm": "mechanical"}))]);
    assert_eq!(db.search("name", "Ahsoka", None, None)?, vec![doc(json!({"name": "Ahsoka", "rank": "padawan"}))]);

    assert_eq!(db.update("name", "Maul", doc(json!({"rank": "sith"})))?, 0);
    Ok(())
}

#[test]
fn test_update_overwrites_and_keeps() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(doc(json!({"name": "Anakin", "color": "red"})))?;
    db.update("name", "Anakin", doc(json!({"color": "dark"})))?;
    assert_eq!(db.all(None, None)?, vec![doc(json!({"name": "Anakin", "color": "dark"}))]);
    Ok(())
}

#[test]
fn test_update_can_change_the_matched_key() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert_many(vec![doc(json!({"name": "Ben", "alias": true})), doc(json!({"name": "Ben", "alias": false}))])?;

    assert_eq!(db.update("name", "Ben", doc(json!({"name": "Obi-Wan"})))?, 2);
    assert!(db.search("name", "Ben", None, None)?.is_empty());
    assert_eq!(db.search("name", "Obi-Wan", None, None)?.len(), 2);
    Ok(())
}

#[test]
fn test_purge_is_idempotent() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert_many((0..4).map(|i| doc(json!({"n": i}))))?;

    assert_eq!(db.purge()?, 4);
    assert!(db.all(None, None)?.is_empty());
    assert_eq!(db.purge()?, 0);
    assert_eq!(db.count()?, 0);
    Ok(())
}

#[test]
fn test_search_pattern() -> Result<()> {
    let (_dir, db) = temp_db()?;
    for name in ["Obi-Wan", "Owen", "Oola", "Anakin", "obi"] {
        db.insert(Document::new().with("name", name))?;
    }
    db.insert(doc(json!({"name": 42})))?;

    assert_eq!(names(&db.search_pattern("name", "O*")?), vec!["Obi-Wan", "Owen", "Oola"]);
    assert_eq!(names(&db.search_pattern("name", "O??n")?), vec!["Owen"]);
    assert_eq!(names(&db.search_pattern("name", "[Oo]bi*")?), vec!["Obi-Wan", "obi"]);
    assert_eq!(names(&db.search_pattern("name", "[!O]*")?), vec!["Anakin", "obi"]);
    // matching is case-sensitive and anchored at both ends
    assert!(db.search_pattern("name", "o")?.is_empty());
    assert!(db.search_pattern("missing", "*")?.is_empty());
    Ok(())
}

#[test]
fn test_find_any_and_find_all() -> Result<()> {
    let (_dir, db) = temp_db()?;
    db.insert(doc(json!({"name": "Leia", "groups": ["rebels", "senate"]})))?;
    db.insert(doc(json!({"name": "Han", "groups": ["rebels", "smugglers"]})))?;
    db.insert(doc(json!({"name": "Lando", "groups": "smugglers"})))?;
    db.insert(doc(json!({"name": "Yoda"})))?;

    assert_eq!(names(&db.find_any("groups", ["senate", "smugglers"])?), vec!["Leia", "Han", "Lando"]);
    assert_eq!(names(&db.find_any("groups", ["jedi"])?), Vec::<String>::new());
    assert!(db.find_any("groups", Vec::<Value>::new())?.is_empty());

    assert_eq!(names(&db.find_all("groups", ["rebels", "smugglers"])?), vec!["Han"]);
    assert_eq!(names(&db.find_all("groups", ["rebels"])?), vec!["Leia", "Han"]);
    assert!(db.find_all("groups", ["rebels", "jedi"])?.is_empty());
    // every array field vacuously contains the empty set; scalars and missing fields never match
    assert_eq!(names(&db.find_all("groups", Vec::<Value>::new())?), vec!["Leia", "Han"]);
    Ok(())
}

#[test]
fn test_values_are_not_interpreted_as_sql() -> Result<()> {
    let (_dir, db) = temp_db()?;
    let hostile = "x'); DROP TABLE documents; --";
    db.insert(Document::new().with("name", hostile).with(hostile, "key"))?;
    db.insert(Document::new().with("name", "Mon Mothma"))?;

    assert_eq!(db.search("name", hostile, None, None)?.len(), 1);
    assert_eq!(db.search(hostile, "key", None, None)?.len(), 1);
    assert_eq!(db.search_pattern("name", "%")?.len(), 0);
    assert!(db.search("name", "value OR 1=1", None, None)?.is_empty());
    assert_eq!(db.update("name", hostile, Document::new().with("note", "' OR 1=1 --"))?, 1);
    assert_eq!(db.remove("name", "' OR '1'='1")?.len(), 0);
    assert_eq!(db.count()?, 2);
    Ok(())
}

#[test]
fn test_documents_survive_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("kenobi.db");
    {
        let db = Database::open(&path)?;
        db.insert_many(vec![doc(json!({"name": "Cassian"})), doc(json!({"name": "Jyn", "nested": {"a": [1, 2.5, null]}}))])?;
        db.close();
    }

    let db = Database::open(&path)?;
    assert_eq!(db.all(None, None)?, vec![doc(json!({"name": "Cassian"})), doc(json!({"name": "Jyn", "nested": {"a": [1, 2.5, null]}}))]);
    Ok(())
}

#[test]
fn test_typed_documents() -> Result<()> {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Droid {
        name: String,
        model: String,
        functions: Vec<String>,
    }

    let (_dir, db) = temp_db()?;
    let bb8 = Droid { name: "BB-8".into(), model: "astromech".into(), functions: vec!["repair".into(), "navigation".into()] };
    db.insert(Document::from_serialize(&bb8)?)?;

    let found = db.find_any("functions", ["navigation"])?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].deserialize_into::<Droid>()?, bb8);

    // only objects can be documents
    assert!(matches!(Document::from_serialize(&vec![1, 2, 3]).map_err(KenobiError::from), Err(KenobiError::Validation(_))));
    Ok(())
}

#[test]
fn test_json_helpers() -> Result<()> {
    let document = kenobi::from_json(r#"{"b": 1, "a": [true, "x"]}"#)?;
    assert_eq!(document, doc(json!({"a": [true, "x"], "b": 1})));
    assert_eq!(kenobi::to_json(&document)?, r#"{"a":[true,"x"],"b":1}"#);
    // well-formed but not an object is a caller mistake, not corruption
    assert!(matches!(kenobi::from_json("[1, 2]"), Err(KenobiError::Validation(_))));
    assert!(matches!(kenobi::from_json("\"just a string\""), Err(KenobiError::Validation(_))));
    assert!(matches!(kenobi::from_json("{not json"), Err(KenobiError::Decode(_))));
    Ok(())
}

#[test]
fn test_missing_directory_is_unavailable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    match Database::open(dir.path().join("no/such/dir/kenobi.db")) {
        Err(KenobiError::StorageUnavailable(_)) => {}
        Err(other) => panic!("expected StorageUnavailable, got {other}"),
        Ok(_) => panic!("expected StorageUnavailable, opened instead"),
    }
    Ok(())
}

#[test]
fn test_in_memory_databases_are_independent() -> Result<()> {
    let first = Database::open_in_memory()?;
    let second = Database::open_in_memory()?;
    first.insert(doc(json!({"name": "Grogu"})))?;
    assert_eq!(first.count()?, 1);
    assert_eq!(second.count()?, 0);
    assert_eq!(first.location(), ":memory:");
    Ok(())
}
