//! Runs every program under `tests/programs/` and compares its exit value
//! with the `// expect: N` line at the top of the file.

use cinder_driver::Driver;
use std::path::{Path, PathBuf};

fn programs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/programs")
}

fn expected_exit(path: &Path) -> i32 {
    let text = std::fs::read_to_string(path).unwrap();
    let first = text.lines().next().unwrap_or_default();
    first
        .trim()
        .strip_prefix("// expect:")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_else(|| panic!("{} must start with `// expect: N`", path.display()))
}

#[test]
fn test_programs() {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(programs_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "cpp"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no programs found");

    let driver = Driver::default();
    let mut failures = vec![];
    for path in &paths {
        let expected = expected_exit(path);
        match driver.run_file(path) {
            Ok(exit) if exit == expected => {}
            Ok(exit) => failures.push(format!("{}: expected {expected}, got {exit}", path.display())),
            Err(err) => failures.push(format!("{}: {err:?}", path.display())),
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn test_fixture_program_is_the_fixture_crate_source() {
    let driver = Driver::default();
    let from_disk = driver.run_file(programs_dir().join("fixture.cpp")).unwrap();
    let embedded = driver.run_source("embedded.cpp", cinder_fixture::SOURCE).unwrap();
    assert_eq!(from_disk, embedded);
    assert_eq!(embedded, cinder_fixture::run().unwrap());
}

#[test]
fn test_listing_is_stable() {
    let path = programs_dir().join("gcd.cpp");
    let first = Driver::default().compile_file(&path).unwrap().to_string();
    let second = Driver::default().compile_file(&path).unwrap().to_string();
    assert_eq!(first, second);
    assert!(first.starts_with("FUNC gcd(a, b)\nBEGIN\n"), "{first}");
    assert!(first.contains("    MOD t1, a, b\n"), "{first}");
}
