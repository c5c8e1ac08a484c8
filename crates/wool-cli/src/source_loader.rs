use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;
use wool_core::{ErrorKind, WoolError};
use wool_parser::SCRIPT_EXTENSION;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan, LoadedScenario};

const SCENARIO_REF_PREFIX: &str = "scripts-dir:";

fn source_error(code: &str, message: String) -> WoolError {
    WoolError::new(ErrorKind::Io, code, message)
}

pub(crate) fn load_source_by_scripts_dir(scripts_dir: &str) -> Result<LoadedScenario, WoolError> {
    let scripts_root = resolve_scripts_dir(scripts_dir)?;
    let sources = read_scripts_from_dir(&scripts_root)?;
    let scenario_id = make_scripts_dir_scenario_id(&scripts_root);
    let title = format!(
        "Scripts {}",
        scripts_root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
    );
    info!("loaded {} scripts from {}", sources.len(), scripts_root.display());

    Ok(LoadedScenario {
        id: scenario_id,
        title,
        sources,
    })
}

pub(crate) fn load_source_by_ref(scenario_ref: &str) -> Result<LoadedScenario, WoolError> {
    let Some(raw) = scenario_ref.strip_prefix(SCENARIO_REF_PREFIX) else {
        return Err(source_error(
            "CLI_SOURCE_REF_INVALID",
            format!("Unsupported scenario ref: {}", scenario_ref),
        ));
    };
    load_source_by_scripts_dir(raw)
}

pub(crate) fn resolve_scripts_dir(scripts_dir: &str) -> Result<PathBuf, WoolError> {
    let path = PathBuf::from(scripts_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(source_error(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(source_error(
            "CLI_SOURCE_NOT_DIR",
            format!("scripts-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Every `.wool` file below `scripts_dir`, keyed by its `/`-separated
/// relative path, which is also the dialogue name plus extension.
pub(crate) fn read_scripts_from_dir(
    scripts_dir: &Path,
) -> Result<BTreeMap<String, String>, WoolError> {
    let mut scripts = BTreeMap::new();

    for entry in WalkDir::new(scripts_dir)
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

        let relative = path
            .strip_prefix(scripts_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        scripts.insert(relative, content);
    }

    if scripts.is_empty() {
        return Err(source_error(
            "CLI_SOURCE_EMPTY",
            format!("No {} files under {}", SCRIPT_EXTENSION, scripts_dir.display()),
        ));
    }

    Ok(scripts)
}

pub(crate) fn make_scripts_dir_scenario_id(scripts_dir: &Path) -> String {
    format!("{}{}", SCENARIO_REF_PREFIX, scripts_dir.display())
}
