//! Unit tests for safe roots.

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct Harness {
    _dir: TempDir,
    root: SafeRoot,
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
    let root = SafeRoot::open(&path).expect("open root");
    Harness { _dir: dir, root }
}

fn rel(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[rstest]
#[case::plain("notes/a.txt", "notes/a.txt")]
#[case::current_dir("./notes/./a.txt", "notes/a.txt")]
#[case::empty("", "")]
fn relative_paths_resolve(harness: Harness, #[case] input: &str, #[case] expected: &str) {
    assert_eq!(harness.root.resolve(input).expect("resolve"), rel(expected));
}

#[rstest]
fn absolute_paths_under_root_lose_the_prefix(harness: Harness) {
    let absolute = harness.root.path().join("notes/a.txt");
    assert_eq!(
        harness.root.resolve(absolute.as_str()).expect("resolve"),
        rel("notes/a.txt")
    );
}

#[rstest]
#[case::parent("../etc/passwd")]
#[case::nested_parent("notes/../../x")]
#[case::outside_absolute("/etc/passwd")]
fn escaping_paths_are_rejected(harness: Harness, #[case] input: &str) {
    let err = harness.root.resolve(input).expect_err("escape");
    assert!(matches!(err, RootError::Escape { .. }));
    assert!(err.to_string().starts_with("path is not within the safe directory"));
}

#[rstest]
#[case::joined("notes", "a.txt", "notes/a.txt")]
#[case::name_repeats_dir("notes", "notes/a.txt", "notes/a.txt")]
#[case::sibling_prefix("notes", "notes2/a.txt", "notes/notes2/a.txt")]
#[case::no_dir("", "a.txt", "a.txt")]
fn names_resolve_inside_dirs(
    harness: Harness,
    #[case] dir: &str,
    #[case] name: &str,
    #[case] expected: &str,
) {
    assert_eq!(harness.root.resolve_in(dir, name).expect("resolve"), rel(expected));
}

// ---------------------------------------------------------------------------
// File access
// ---------------------------------------------------------------------------

#[rstest]
fn write_creates_parents_and_read_returns_contents(harness: Harness) {
    let path = rel("deep/nested/file.txt");
    harness.root.write(&path, "hello").expect("write");
    assert_eq!(harness.root.read_to_string(&path).expect("read"), "hello");
}

#[rstest]
fn reading_a_missing_file_is_an_io_error(harness: Harness) {
    let err = harness
        .root
        .read_to_string(&rel("missing.txt"))
        .expect_err("missing");
    assert!(matches!(err, RootError::Io { .. }));
    assert!(err.to_string().starts_with("error while reading file at missing.txt"));
}

#[test]
fn copy_crosses_roots() {
    let source_dir = TempDir::new().expect("temp dir");
    let dest_dir = TempDir::new().expect("temp dir");
    let source = SafeRoot::open(&Utf8PathBuf::from_path_buf(source_dir.path().to_path_buf()).expect("utf-8"))
        .expect("open");
    let dest = SafeRoot::open(&Utf8PathBuf::from_path_buf(dest_dir.path().to_path_buf()).expect("utf-8"))
        .expect("open");

    source.write(&rel("a.txt"), "copy me").expect("write");
    source
        .copy_to(&rel("a.txt"), &dest, &rel("out/b.txt"))
        .expect("copy");
    assert_eq!(dest.read_to_string(&rel("out/b.txt")).expect("read"), "copy me");
}

#[rstest]
fn list_directories_walks_in_order_and_skips_git(harness: Harness) {
    for dir in ["b", "a/inner", ".git/objects"] {
        harness.root.create_dir_all(&rel(dir)).expect("mkdir");
    }
    harness.root.write(&rel("a/file.txt"), "x").expect("write");

    let listed = harness.root.list_directories().expect("list");
    let root = harness.root.path();
    assert_eq!(
        listed,
        vec![
            root.to_path_buf(),
            root.join("a"),
            root.join("a/inner"),
            root.join("b"),
        ]
    );
}
