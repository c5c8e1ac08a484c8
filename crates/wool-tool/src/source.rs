use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;
use wool_parser::SCRIPT_EXTENSION;

use crate::{TestCase, WoolToolError, TESTCASE_SCHEMA_V1};

/// Every `.wool` file under `demo_dir`, keyed by its `/`-separated relative
/// path.
pub fn read_sources_from_dir(demo_dir: &Path) -> Result<BTreeMap<String, String>, WoolToolError> {
    let mut sources = BTreeMap::new();

    for entry in WalkDir::new(demo_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !path.to_string_lossy().ends_with(SCRIPT_EXTENSION) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(demo_dir) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");

        let content = fs::read_to_string(path).map_err(|source| WoolToolError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        sources.insert(relative, content);
    }

    if sources.is_empty() {
        return Err(WoolToolError::SourceEmpty {
            path: demo_dir.to_path_buf(),
        });
    }

    Ok(sources)
}

pub fn read_test_case(case_path: &Path) -> Result<TestCase, WoolToolError> {
    let raw = fs::read_to_string(case_path).map_err(|source| WoolToolError::ReadFile {
        path: case_path.to_path_buf(),
        source,
    })?;
    let parsed: TestCase =
        serde_json::from_str(&raw).map_err(|source| WoolToolError::ParseCase {
            path: case_path.to_path_buf(),
            source,
        })?;

    if parsed.schema_version != TESTCASE_SCHEMA_V1 {
        return Err(WoolToolError::InvalidSchemaVersion {
            expected: TESTCASE_SCHEMA_V1.to_string(),
            found: parsed.schema_version,
        });
    }

    Ok(parsed)
}
