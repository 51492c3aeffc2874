use std::fs;
use std::path::{Path, PathBuf};

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("read src dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

#[test]
fn workspace_denies_unwrap_used() {
    let text = fs::read_to_string(manifest_dir().join("..").join("..").join("Cargo.toml"))
        .expect("workspace manifest");
    let manifest: toml::Value = toml::from_str(&text).expect("parse manifest");
    let level = manifest
        .get("workspace")
        .and_then(|w| w.get("lints"))
        .and_then(|l| l.get("clippy"))
        .and_then(|c| c.get("unwrap_used"))
        .and_then(toml::Value::as_str);
    assert_eq!(level, Some("deny"));
}

#[test]
fn non_test_code_never_calls_unwrap() {
    let mut files = Vec::new();
    rust_sources(&manifest_dir().join("src"), &mut files);
    assert!(!files.is_empty());

    let mut offenders = Vec::new();
    for file in files {
        let text = fs::read_to_string(&file).expect("read source");
        let production = text.split("#[cfg(test)]").next().unwrap_or_default();
        for (index, line) in production.lines().enumerate() {
            if line.contains(".unwrap()") {
                offenders.push(format!("{}:{}", file.display(), index + 1));
            }
        }
    }
    assert!(offenders.is_empty(), "unwrap() outside tests: {offenders:?}");
}
