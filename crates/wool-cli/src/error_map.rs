use std::fmt::Display;

use wool_core::{ErrorKind, WoolError};

fn map_error(code: &'static str, error: impl Display) -> WoolError {
    WoolError::new(ErrorKind::Io, code, error.to_string())
}

pub(crate) fn json_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn emit_error(error: WoolError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

/// One line per error: `ERROR:<file>|<line>|<col>|<json message>`.
pub(crate) fn format_error_line(file: &str, error: &WoolError) -> String {
    let (line, column) = error
        .span
        .map(|span| (span.start.line, span.start.column))
        .unwrap_or((0, 0));
    format!(
        "ERROR:{}|{}|{}|{}",
        file,
        line,
        column,
        json_string(&format!("{}: {}", error.code, error.message))
    )
}

pub(crate) fn map_tui_io(error: std::io::Error) -> WoolError {
    map_error("TUI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> WoolError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> WoolError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> WoolError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> WoolError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> WoolError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> WoolError {
    map_error("CLI_STATE_INVALID", error)
}

pub(crate) fn map_cli_state_encode(error: serde_json::Error) -> WoolError {
    map_error("CLI_STATE_ENCODE", error)
}
