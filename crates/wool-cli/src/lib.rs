use std::ffi::OsString;
use std::path::Path;

use clap::Parser;
use log::{info, warn};
use wool_core::WoolError;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod inspect;
mod line_tui;
mod logging;
mod models;
mod session_ops;
mod source_loader;
mod state_store;
mod values;

pub(crate) use boundary_runner::{boundary_for_current, boundary_for_event, emit_boundary};
#[cfg(test)]
pub(crate) use boundary_runner::reply_kind_name;
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, ChooseArgs, Cli, InputArgs, Mode, PlayArgs, SessionArgs, StartArgs,
    SummaryArgs, ValidateArgs,
};
pub(crate) use error_map::{
    emit_error, format_error_line, json_string, map_cli_source_path, map_cli_source_read,
    map_cli_source_scan, map_cli_state_encode, map_cli_state_invalid, map_cli_state_read,
    map_cli_state_write, map_tui_io,
};
pub(crate) use line_tui::run_tui_line_mode;
pub(crate) use logging::init_logging;
pub(crate) use models::{
    BoundaryEvent, BoundaryReply, BoundaryResult, LoadedScenario, PlayerState, TuiCommandAction,
    TuiCommandContext, PLAYER_STATE_SCHEMA,
};
pub(crate) use session_ops::{
    create_session_for_scenario, emit_boundary_with_saved_state,
    load_session_from_state_for_scenario, resume_session_for_state, save_session_state,
    SessionSettings,
};
#[cfg(test)]
pub(crate) use session_ops::{load_session_from_state_for_ref, player_state_for};
pub(crate) use source_loader::{
    load_source_by_ref, load_source_by_scripts_dir, read_scripts_from_dir, resolve_scripts_dir,
};
pub(crate) use state_store::{load_player_state, save_player_state};
pub(crate) use values::{answer_value, parse_answers, parse_variables, reply_input_fields};

const DEFAULT_STATE_FILE: &str = ".wool/save.json";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, WoolError> {
    init_logging(cli.verbose);
    match cli.command {
        Mode::Validate(args) => inspect::run_validate(args),
        Mode::Summary(args) => inspect::run_summary(args),
        Mode::Agent(args) => agent::run_agent(args),
        Mode::Play(args) => run_play(args),
    }
}

/// Resumes from the state file when it belongs to the same scripts,
/// otherwise starts fresh.
fn run_play(args: PlayArgs) -> Result<i32, WoolError> {
    let settings = SessionSettings::from_args(&args.session)?;
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    let scenario = load_source_by_scripts_dir(&args.session.scripts_dir)?;
    let saved = Path::new(&state_file);
    let mut session = if saved.exists() {
        match load_session_from_state_for_scenario(saved, &scenario) {
            Ok((_, session)) => {
                info!("resumed from {}", state_file);
                session
            }
            Err(error) => {
                warn!("ignoring {}: {}", state_file, error);
                create_session_for_scenario(&scenario, &settings)?
            }
        }
    } else {
        create_session_for_scenario(&scenario, &settings)?
    };
    run_tui_line_mode(&state_file, &scenario, &settings, &mut session)
}

#[cfg(test)]
mod cli_test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::SessionSettings;

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should move forward")
            .as_nanos();
        std::env::temp_dir().join(format!("wool-cli-{}-{}", nanos, name))
    }

    pub(crate) fn write_file(path: &Path, content: &str) {
        let parent = path.parent().expect("path should have parent");
        fs::create_dir_all(parent).expect("parent dir should be created");
        fs::write(path, content).expect("file should be written");
    }

    pub(crate) fn demo_scripts_dir(name: &str) -> String {
        wool_test_example::demo_dir(name)
            .to_string_lossy()
            .to_string()
    }

    pub(crate) fn default_settings() -> SessionSettings {
        SessionSettings {
            seed: Some(1),
            ..SessionSettings::default()
        }
    }
}
