use std::fs;
use std::path::Path;

use wool_core::{ErrorKind, WoolError};

use crate::{
    map_cli_state_encode, map_cli_state_invalid, map_cli_state_read, map_cli_state_write,
    PlayerState, PLAYER_STATE_SCHEMA,
};

pub(crate) fn save_player_state(path: &Path, state: &PlayerState) -> Result<(), WoolError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(map_cli_state_write)?;

    let payload = serde_json::to_string(state).map_err(map_cli_state_encode)?;
    fs::write(path, payload).map_err(map_cli_state_write)
}

pub(crate) fn load_player_state(path: &Path) -> Result<PlayerState, WoolError> {
    if !path.exists() {
        return Err(WoolError::new(
            ErrorKind::Io,
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(map_cli_state_read)?;
    let state: PlayerState = serde_json::from_str(&raw).map_err(map_cli_state_invalid)?;

    if state.schema_version != PLAYER_STATE_SCHEMA {
        return Err(WoolError::new(
            ErrorKind::EngineState,
            "CLI_STATE_SCHEMA",
            format!("Unsupported player state schema: {}", state.schema_version),
        ));
    }

    Ok(state)
}

#[cfg(test)]
mod state_store_tests {
    use super::*;
    use crate::cli_test_support::*;
    use wool_expr::UnknownVariablePolicy;

    #[test]
    fn load_player_state_reports_missing_invalid_and_schema_errors() {
        let missing = temp_path("missing-state.json");
        let error = load_player_state(&missing).expect_err("missing state should fail");
        assert_eq!(error.code, "CLI_STATE_NOT_FOUND");

        let invalid = temp_path("invalid-state.json");
        write_file(&invalid, "{");
        let error = load_player_state(&invalid).expect_err("invalid json should fail");
        assert_eq!(error.code, "CLI_STATE_INVALID");

        let scripts_dir = demo_scripts_dir("02-choices");
        let scenario = crate::load_source_by_scripts_dir(&scripts_dir).expect("scenario");
        let session = crate::create_session_for_scenario(&scenario, &default_settings())
            .expect("session");
        let mut state = crate::player_state_for(&session, &scenario.id, UnknownVariablePolicy::Null)
            .expect("state");
        state.schema_version = "wool-player-state.v0".to_string();
        let old = temp_path("old-state.json");
        save_player_state(&old, &state).expect("save should pass");
        let error = load_player_state(&old).expect_err("old schema should fail");
        assert_eq!(error.code, "CLI_STATE_SCHEMA");
    }

    #[test]
    fn saved_state_loads_back() {
        let scripts_dir = demo_scripts_dir("02-choices");
        let scenario = crate::load_source_by_scripts_dir(&scripts_dir).expect("scenario");
        let session = crate::create_session_for_scenario(&scenario, &default_settings())
            .expect("session");
        let state = crate::player_state_for(&session, &scenario.id, UnknownVariablePolicy::Null)
            .expect("state");

        let path = temp_path("nested/dir/state.json");
        save_player_state(&path, &state).expect("save should create parents");
        let loaded = load_player_state(&path).expect("load should pass");
        assert_eq!(loaded.scenario_id, scenario.id);
        assert_eq!(loaded.session, state.session);
    }
}
