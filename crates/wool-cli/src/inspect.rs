use std::fs;
use std::path::Path;

use log::info;
use wool_core::{ErrorKind, WoolError};
use wool_parser::{dialogue_name_from_path, parse_dialogue, parse_project};

use crate::{
    format_error_line, map_cli_source_read, read_scripts_from_dir, resolve_scripts_dir,
    ValidateArgs, SummaryArgs,
};

fn emit_error_lines<'a>(errors: impl Iterator<Item = (&'a str, &'a WoolError)>, count: usize) {
    println!("RESULT:ERROR");
    println!("ERROR_COUNT:{}", count);
    for (file, error) in errors {
        println!("{}", format_error_line(file, error));
    }
}

/// Parses a whole script folder and reports every error with its file.
pub(crate) fn run_validate(args: ValidateArgs) -> Result<i32, WoolError> {
    let scripts_root = resolve_scripts_dir(&args.scripts_dir)?;
    let sources = read_scripts_from_dir(&scripts_root)?;
    match parse_project(&sources) {
        Ok(project) => {
            info!("validated {} dialogues", project.len());
            println!("RESULT:OK");
            println!("DIALOGUES:{}", project.names().join(","));
            println!("NODES:{}", project.node_count());
            Ok(0)
        }
        Err(errors) => {
            emit_error_lines(errors.iter(), errors.len());
            Ok(1)
        }
    }
}

/// Dialogue of one file: name, speakers, references and variables.
pub(crate) fn run_summary(args: SummaryArgs) -> Result<i32, WoolError> {
    let path = Path::new(&args.file);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let Some(name) = dialogue_name_from_path(&file_name) else {
        return Err(WoolError::new(
            ErrorKind::Io,
            "CLI_SOURCE_NOT_SCRIPT",
            format!("Not a dialogue script: {}", path.display()),
        ));
    };
    let source = fs::read_to_string(path).map_err(map_cli_source_read)?;
    match parse_dialogue(&name, &source) {
        Ok(dialogue) => {
            println!("RESULT:OK");
            print!("{}", dialogue);
            Ok(0)
        }
        Err(errors) => {
            emit_error_lines(
                errors.iter().map(|error| (file_name.as_str(), error)),
                errors.len(),
            );
            Ok(1)
        }
    }
}

#[cfg(test)]
mod inspect_tests {
    use super::*;
    use crate::cli_test_support::*;

    #[test]
    fn validate_reports_ok_and_error_exit_codes() {
        let ok = run_validate(ValidateArgs {
            scripts_dir: demo_scripts_dir("04-multi-dialogue"),
        })
        .expect("validate should run");
        assert_eq!(ok, 0);

        let root = temp_path("validate-broken");
        write_file(&root.join("main.wool"), "title: Start\n---\n[[a|b|c|d]]\n===\n");
        write_file(&root.join("other.wool"), "title: Start\n---\n[[nowhere.Start]]\n===\n");
        let broken = run_validate(ValidateArgs {
            scripts_dir: root.to_string_lossy().to_string(),
        })
        .expect("validate should run");
        assert_eq!(broken, 1);
    }

    #[test]
    fn summary_prints_dialogue_or_errors() {
        let root = temp_path("summary");
        let good = root.join("shop.wool");
        write_file(&good, "title: Start\nspeaker: Ann\n---\nHi $name\n===\n");
        let code = run_summary(SummaryArgs {
            file: good.to_string_lossy().to_string(),
        })
        .expect("summary should run");
        assert_eq!(code, 0);

        let bad = root.join("bad.wool");
        write_file(&bad, "no header here");
        let code = run_summary(SummaryArgs {
            file: bad.to_string_lossy().to_string(),
        })
        .expect("summary should run");
        assert_eq!(code, 1);

        let error = run_summary(SummaryArgs {
            file: root.join("notes.txt").to_string_lossy().to_string(),
        })
        .expect_err("non script should fail");
        assert_eq!(error.code, "CLI_SOURCE_NOT_SCRIPT");
    }
}
