//! Merging of result caches produced by separate evaluation machines.
//!
//! A cache is a directory tree. JSON entries hold top-level objects keyed by
//! run identifiers and are unioned across caches; any other entry is copied
//! once; `*.lock` files are never carried over.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::errors::CacheError;

/// Counters reported after a cache merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMergeSummary {
    pub json_merged: usize,
    pub files_copied: usize,
    pub skipped: usize,
}

/// Merge `caches` into `output`. See [`merge_caches_with_progress`].
pub fn merge_caches(caches: &[PathBuf], output: &Path) -> Result<CacheMergeSummary, CacheError> {
    merge_caches_with_progress(caches, output, |_| {})
}

/// Merge `caches` into `output`, calling `on_entry` with each visited file.
///
/// JSON objects at the same relative path are unioned in cache order and
/// files are copied only if the destination does not exist yet; in both
/// cases the first cache wins.
#[instrument(skip(caches, output, on_entry), fields(output = %output.display(), caches = caches.len()))]
pub fn merge_caches_with_progress(
    caches: &[PathBuf],
    output: &Path,
    mut on_entry: impl FnMut(&Path),
) -> Result<CacheMergeSummary, CacheError> {
    for cache in caches {
        if !cache.is_dir() {
            return Err(CacheError::SourceNotFound(cache.display().to_string()));
        }
    }
    std::fs::create_dir_all(output)?;

    let mut summary = CacheMergeSummary::default();
    let mut json_sources: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for cache in caches {
        for entry in WalkDir::new(cache).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            on_entry(path);
            let relative = path.strip_prefix(cache).unwrap_or(path).to_path_buf();

            match path.extension().and_then(|e| e.to_str()) {
                Some("json") => json_sources.entry(relative).or_default().push(path.to_path_buf()),
                Some("lock") => summary.skipped += 1,
                _ => {
                    let dest = output.join(&relative);
                    if dest.exists() {
                        summary.skipped += 1;
                        continue;
                    }
                    if let Some(parent) = dest.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::copy(path, &dest)?;
                    summary.files_copied += 1;
                }
            }
        }
    }

    for (relative, sources) in &json_sources {
        let merged = merge_json_objects(sources)?;
        write_json(&output.join(relative), merged)?;
        debug!(path = %relative.display(), sources = sources.len(), "merged json entry");
        summary.json_merged += 1;
    }

    info!(?summary, "cache merge complete");
    Ok(summary)
}

fn merge_json_objects(sources: &[PathBuf]) -> Result<Map<String, Value>, CacheError> {
    let mut merged = Map::new();
    for source in sources {
        let contents = std::fs::read_to_string(source)?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| CacheError::Json {
            path: source.display().to_string(),
            detail: e.to_string(),
        })?;
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    merged.entry(key).or_insert(value);
                }
            }
            _ => return Err(CacheError::NotAnObject(source.display().to_string())),
        }
    }
    Ok(merged)
}

/// Keys come out sorted (`serde_json::Map` is ordered); indented by four spaces.
fn write_json(dest: &Path, data: Map<String, Value>) -> Result<(), CacheError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    Value::Object(data)
        .serialize(&mut serializer)
        .map_err(|e| CacheError::Json {
            path: dest.display().to_string(),
            detail: e.to_string(),
        })?;
    std::fs::write(dest, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_json_entries_are_unioned_first_cache_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("cache-a");
        let b = dir.path().join("cache-b");
        let out = dir.path().join("out");
        write(&a.join("repos/acme/results.json"), r#"{"x": 1, "shared": "a"}"#);
        write(&b.join("repos/acme/results.json"), r#"{"y": 2, "shared": "b"}"#);

        let summary = merge_caches(&[a, b], &out).unwrap();
        assert_eq!(summary.json_merged, 1);

        let merged: Value = serde_json::from_str(
            &std::fs::read_to_string(out.join("repos/acme/results.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
        assert_eq!(merged["shared"], "a");
    }

    #[test]
    fn test_json_key_kept_from_first_cache_that_has_it() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        let out = dir.path().join("out");
        write(&a.join("r.json"), r#"{"only_a": true}"#);
        write(&b.join("r.json"), r#"{"k": "b"}"#);
        write(&c.join("r.json"), r#"{"k": "c", "only_c": true}"#);

        merge_caches(&[a, b, c], &out).unwrap();
        let merged: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("r.json")).unwrap()).unwrap();
        assert_eq!(merged["k"], "b");
        assert_eq!(merged["only_a"], true);
        assert_eq!(merged["only_c"], true);
    }

    #[test]
    fn test_json_output_is_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let out = dir.path().join("out");
        write(&a.join("r.json"), r#"{"b": 1, "a": 2}"#);

        merge_caches(&[a], &out).unwrap();
        let text = std::fs::read_to_string(out.join("r.json")).unwrap();
        assert_eq!(text, "{\n    \"a\": 2,\n    \"b\": 1\n}");
    }

    #[test]
    fn test_plain_files_first_cache_wins_and_locks_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let out = dir.path().join("out");
        write(&a.join("logs/run.txt"), "from a");
        write(&b.join("logs/run.txt"), "from b");
        write(&b.join("logs/only_b.txt"), "b only");
        write(&a.join("results.json.lock"), "");

        let summary = merge_caches(&[a, b], &out).unwrap();
        assert_eq!(summary.files_copied, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(std::fs::read_to_string(out.join("logs/run.txt")).unwrap(), "from a");
        assert!(out.join("logs/only_b.txt").exists());
        assert!(!out.join("results.json.lock").exists());
    }

    #[test]
    fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let result = merge_caches(&[dir.path().join("nope")], &dir.path().join("out"));
        assert!(matches!(result, Err(CacheError::SourceNotFound(_))));
    }

    #[test]
    fn test_non_object_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        write(&a.join("list.json"), "[1, 2, 3]");
        let result = merge_caches(&[a], &dir.path().join("out"));
        assert!(matches!(result, Err(CacheError::NotAnObject(_))));
    }

    #[test]
    fn test_progress_callback_sees_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        write(&a.join("one.json"), "{}");
        write(&a.join("two.txt"), "2");
        let mut seen = 0;
        merge_caches_with_progress(&[a], &dir.path().join("out"), |_| seen += 1).unwrap();
        assert_eq!(seen, 2);
    }
}
