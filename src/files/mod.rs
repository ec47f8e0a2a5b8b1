//! Resolves uploaded files to disk paths keyed by where they sit in the globals tree.
//!
//! File pickers expose each upload as an object carrying a `$superblocksId`
//! equal to the upload's `originalname`. The dotted path of that object
//! (`FilePicker1.files.0`) becomes the mapping key so the entry script can
//! hang a reader off the same object. Uploads with no such object are keyed
//! by their handle.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{context::RequestFile, error::ResolveError};

const FILE_ID_KEY: &str = "$superblocksId";

/// One entry per file in `files`, in the same order.
pub fn tree_path_to_disk_path(
    globals: &Map<String, Value>,
    files: &[RequestFile],
) -> Result<IndexMap<String, String>, ResolveError> {
    let mut tree_paths: IndexMap<String, String> = IndexMap::new();
    for (name, value) in globals {
        collect_file_objects(value, name.clone(), &mut tree_paths);
    }

    let mut seen = HashSet::new();
    // key -> handle that claimed it
    let mut owners: HashMap<String, &str> = HashMap::with_capacity(files.len());
    let mut out = IndexMap::with_capacity(files.len());
    for file in files {
        if !seen.insert(file.originalname.as_str()) {
            return Err(ResolveError::DuplicateFile(file.originalname.clone()));
        }
        let key = tree_paths
            .get(&file.originalname)
            .cloned()
            .unwrap_or_else(|| file.originalname.clone());
        if let Some(first) = owners.insert(key.clone(), &file.originalname) {
            return Err(ResolveError::KeyCollision {
                key,
                first: first.to_string(),
                second: file.originalname.clone(),
            });
        }
        out.insert(key, file.path.to_string_lossy().into_owned());
    }
    log::debug!(
        "resolved {} uploaded file(s), {} found in globals",
        out.len(),
        files
            .iter()
            .filter(|f| tree_paths.contains_key(&f.originalname))
            .count()
    );
    Ok(out)
}

// Records the first tree path seen for each file id.
fn collect_file_objects(value: &Value, path: String, acc: &mut IndexMap<String, String>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(id)) = obj.get(FILE_ID_KEY) {
                acc.entry(id.clone()).or_insert(path.clone());
            }
            for (k, v) in obj {
                if k == FILE_ID_KEY {
                    continue;
                }
                collect_file_objects(v, format!("{path}.{k}"), acc);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect_file_objects(v, format!("{path}.{i}"), acc);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn globals(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn keys_follow_file_picker_tree_paths() {
        let g = globals(json!({
            "FilePicker1": {
                "files": [
                    {"name": "a.csv", "$superblocksId": "upload-a"},
                    {"name": "b.png", "$superblocksId": "upload-b"}
                ]
            },
            "Input1": {"value": "x"}
        }));
        let files = vec![
            RequestFile::new("upload-b", "/tmp/uploads/b"),
            RequestFile::new("upload-a", "/tmp/uploads/a"),
        ];

        let mapping = tree_path_to_disk_path(&g, &files).unwrap();
        let entries: Vec<_> = mapping.iter().collect();
        assert_eq!(
            entries,
            vec![
                (&"FilePicker1.files.1".to_string(), &"/tmp/uploads/b".to_string()),
                (&"FilePicker1.files.0".to_string(), &"/tmp/uploads/a".to_string()),
            ]
        );
    }

    #[test]
    fn unreferenced_upload_is_keyed_by_handle() {
        let mapping =
            tree_path_to_disk_path(&Map::new(), &[RequestFile::new("fileA", "/srv/fileA")])
                .unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("fileA").map(String::as_str), Some("/srv/fileA"));
    }

    #[test]
    fn no_files_gives_empty_mapping() {
        let g = globals(json!({"FilePicker1": {"files": []}}));
        assert!(tree_path_to_disk_path(&g, &[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_handles_are_rejected() {
        let files = vec![
            RequestFile::new("same", "/tmp/1"),
            RequestFile::new("same", "/tmp/2"),
        ];
        assert_eq!(
            tree_path_to_disk_path(&Map::new(), &files),
            Err(ResolveError::DuplicateFile("same".into()))
        );
    }

    #[test]
    fn handle_matching_another_files_tree_path_is_rejected() {
        let g = globals(json!({"FilePicker1": {"files": [{"$superblocksId": "up"}]}}));
        let files = vec![
            RequestFile::new("FilePicker1.files.0", "/a"),
            RequestFile::new("up", "/b"),
        ];
        assert_eq!(
            tree_path_to_disk_path(&g, &files),
            Err(ResolveError::KeyCollision {
                key: "FilePicker1.files.0".into(),
                first: "FilePicker1.files.0".into(),
                second: "up".into(),
            })
        );
    }
}
