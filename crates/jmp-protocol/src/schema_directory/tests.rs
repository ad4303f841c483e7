use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;

const INTERVAL: Duration = Duration::from_millis(10);

struct Store {
    dir: TempDir,
    source: SchemaDirectorySource,
}

impl Store {
    fn write(&self, relative: &str, document: &Value) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create schema dirs");
        }
        fs::write(path, document.to_string()).expect("write schema");
    }

    fn document(&self, message_type: &str) -> Option<Value> {
        self.source
            .fetch_schema(&Identifier::from(message_type))
            .ok()
            .flatten()
            .map(|schema| schema.document().clone())
    }
}

#[fixture]
fn store() -> Store {
    let dir = TempDir::new().expect("temp dir");
    let source = SchemaDirectorySource::with_watch_interval(dir.path(), INTERVAL).expect("open");
    Store { dir, source }
}

fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(INTERVAL);
    }
    condition()
}

#[rstest]
#[case::single("echo", "echo.schema")]
#[case::nested("a.b.c", "a/b/c.schema")]
#[case::numeric("42", "42.schema")]
fn maps_type_names_to_paths(#[case] message_type: &str, #[case] relative: &str) {
    let root = Path::new("/srv/schemas");
    let path = schema_path(root, &Identifier::from(message_type)).expect("valid name");
    assert_eq!(path, root.join(relative));
}

#[test]
fn integer_types_map_to_decimal_names() {
    let root = Path::new("/srv/schemas");
    let path = schema_path(root, &Identifier::from(7_i64)).expect("valid name");
    assert_eq!(path, root.join("7.schema"));
}

#[rstest]
#[case::empty("")]
#[case::leading_dot(".echo")]
#[case::double_dot("a..b")]
#[case::parent("..")]
#[case::slash("a/b")]
#[case::backslash("a\\b")]
fn rejects_escaping_type_names(#[case] message_type: &str) {
    assert!(schema_path(Path::new("/srv"), &Identifier::from(message_type)).is_none());
}

#[rstest]
fn reads_first_level_schema(store: Store) {
    store.write("echo.schema", &json!({"type": "string"}));
    assert_eq!(store.document("echo"), Some(json!({"type": "string"})));
    assert!(store.source.is_cached(&Identifier::from("echo")));
}

#[rstest]
fn reads_nested_schema(store: Store) {
    store.write("billing/invoice/create.schema", &json!({"type": "object"}));
    assert_eq!(
        store.document("billing.invoice.create"),
        Some(json!({"type": "object"}))
    );
}

#[rstest]
fn missing_schema_is_an_unknown_type(store: Store) {
    let error = store
        .source
        .fetch_schema(&Identifier::from("doesNotExist"))
        .expect_err("no such file");
    assert!(matches!(error, FetchError::UnknownMessageType { .. }));
    assert_eq!(store.source.active_watches(), 0);
}

#[rstest]
fn unparsable_schema_is_an_unknown_type(store: Store) {
    let path = store.dir.path().join("broken.schema");
    fs::write(path, "{ not json").expect("write");
    let error = store
        .source
        .fetch_schema(&Identifier::from("broken"))
        .expect_err("not json");
    assert!(matches!(error, FetchError::UnknownMessageType { .. }));
}

#[rstest]
fn picks_up_modified_schema(store: Store) {
    store.write("echo.schema", &json!({"type": "string"}));
    assert_eq!(store.document("echo"), Some(json!({"type": "string"})));

    store.write("echo.schema", &json!({"type": "integer"}));
    assert!(eventually(|| store.document("echo") == Some(json!({"type": "integer"}))));
}

#[rstest]
fn deleted_schema_becomes_unknown(store: Store) {
    store.write("echo.schema", &json!({}));
    assert!(store.document("echo").is_some());

    fs::remove_file(store.dir.path().join("echo.schema")).expect("remove");
    assert!(eventually(|| store.document("echo").is_none()));
}

#[rstest]
fn schema_created_later_resolves(store: Store) {
    assert!(store.document("late").is_none());
    store.write("late.schema", &json!({"type": "null"}));
    assert_eq!(store.document("late"), Some(json!({"type": "null"})));
}

#[rstest]
fn keeps_one_watch_per_path(store: Store) {
    store.write("echo.schema", &json!({}));
    let key = Identifier::from("echo");
    for _ in 0..5 {
        store.source.fetch_schema(&key).expect("fetch");
        store.source.invalidate(&key);
    }
    store.source.fetch_schema(&key).expect("fetch");
    assert_eq!(store.source.active_watches(), 1);
}

#[rstest]
fn refetching_releases_the_superseded_watch(store: Store) {
    store.write("echo.schema", &json!({}));
    let key = Identifier::from("echo");
    store.source.fetch_schema(&key).expect("fetch");
    let first = store.source.watch_liveness();
    assert_eq!(first.len(), 1);

    store.source.invalidate(&key);
    store.source.fetch_schema(&key).expect("refetch");

    assert!(first[0].upgrade().is_none(), "old watch thread exited");
    let current = store.source.watch_liveness();
    assert_eq!(current.len(), 1);
    assert!(current[0].upgrade().is_some());
    assert_eq!(store.source.active_watches(), 1);
}

#[rstest]
fn dropping_every_clone_stops_all_watches(store: Store) {
    store.write("echo.schema", &json!({}));
    store.write("a/b.schema", &json!({}));
    let Store { dir: _dir, source } = store;
    let clone = source.clone();
    source.fetch_schema(&Identifier::from("echo")).expect("fetch");
    clone.fetch_schema(&Identifier::from("a.b")).expect("fetch");
    let liveness = source.watch_liveness();
    assert_eq!(liveness.len(), 2);

    drop(source);
    assert!(
        liveness.iter().all(|handle| handle.upgrade().is_some()),
        "the clone keeps the watches alive"
    );

    drop(clone);
    assert!(liveness.iter().all(|handle| handle.upgrade().is_none()));
}

#[cfg(unix)]
#[test]
fn follows_symlinked_root() {
    let dir = TempDir::new().expect("temp dir");
    let real = dir.path().join("real");
    fs::create_dir(&real).expect("mkdir");
    fs::write(real.join("echo.schema"), r#"{"type":"string"}"#).expect("write");
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link).expect("symlink");

    let source = SchemaDirectorySource::open(&link).expect("open through link");
    let schema = source
        .fetch_schema(&Identifier::from("echo"))
        .expect("fetch")
        .expect("present");
    assert_eq!(schema.document(), &json!({"type": "string"}));
}

#[test]
fn rejects_missing_root() {
    let dir = TempDir::new().expect("temp dir");
    let result = SchemaDirectorySource::open(dir.path().join("absent"));
    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidConfiguration { .. })
    ));
}

#[test]
fn rejects_file_root() {
    let dir = TempDir::new().expect("temp dir");
    let file = dir.path().join("plain");
    fs::write(&file, "{}").expect("write");
    let result = SchemaDirectorySource::open(&file);
    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidConfiguration { .. })
    ));
}
