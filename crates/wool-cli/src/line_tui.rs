use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;

use wool_api::{reply_label, DialogueSession};
use wool_core::{Value, WoolError};
use wool_model::{InputCommand, Reply, ReplyKind};

use crate::{
    answer_value, create_session_for_scenario, load_session_from_state_for_scenario, map_tui_io,
    reply_input_fields, save_session_state, LoadedScenario, SessionSettings, TuiCommandAction,
    TuiCommandContext,
};

const HELP: &str = "commands: :help :vars :save :load :restart :quit";

pub(crate) fn run_tui_line_mode(
    state_file: &str,
    scenario: &LoadedScenario,
    settings: &SessionSettings,
    session: &mut DialogueSession,
) -> Result<i32, WoolError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_tui_line_mode_with_io(
        state_file,
        scenario,
        settings,
        session,
        &mut reader,
        &mut writer,
    )
}

pub(crate) fn run_tui_line_mode_with_io(
    state_file: &str,
    scenario: &LoadedScenario,
    settings: &SessionSettings,
    session: &mut DialogueSession,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, WoolError> {
    writeln!(writer, "WOOL {}", scenario.title).map_err(map_tui_io)?;
    writeln!(writer, "{}", HELP).map_err(map_tui_io)?;
    let context = TuiCommandContext {
        state_file,
        scenario,
        settings,
    };

    loop {
        render_node(session, writer)?;
        if session.is_finished() {
            writeln!(writer).map_err(map_tui_io)?;
            writeln!(writer, "[END]").map_err(map_tui_io)?;
            return Ok(0);
        }

        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                return Ok(0);
            };
            let mut lines = Vec::new();
            let action = handle_tui_command(raw.trim(), &context, session, &mut |line| {
                lines.push(line)
            })?;
            for line in lines {
                writeln!(writer, "{}", line).map_err(map_tui_io)?;
            }
            match action {
                TuiCommandAction::Continue => continue,
                TuiCommandAction::RefreshBoundary => break,
                TuiCommandAction::Quit => return Ok(0),
                TuiCommandAction::NotHandled => {}
            }

            let Some(reply) = offered_reply(session, raw.trim()) else {
                writeln!(writer, "unknown reply: {}", raw.trim()).map_err(map_tui_io)?;
                continue;
            };
            if reply.kind() == ReplyKind::Input {
                let Some(answers) = ask_answers(&reply, reader, writer)? else {
                    return Ok(0);
                };
                if let Err(error) = session.store_input(reply.reply_id, &answers) {
                    writeln!(writer, "{}", error.message).map_err(map_tui_io)?;
                    continue;
                }
                let statement = session.user_statement(reply.reply_id)?;
                writeln!(writer, "you: {}", statement).map_err(map_tui_io)?;
            }
            session.choose(reply.reply_id)?;
            break;
        }
    }
}

fn render_node(session: &DialogueSession, writer: &mut dyn Write) -> Result<(), WoolError> {
    let Some(node) = session.current_node() else {
        return Ok(());
    };
    writeln!(writer).map_err(map_tui_io)?;
    let text = node.body.text();
    let line = match node.speaker() {
        Some(speaker) => format!("{}: {}", speaker, text),
        None => text,
    };
    writeln!(writer, "{}", line).map_err(map_tui_io)?;
    if session.is_finished() {
        return Ok(());
    }
    for reply in node.body.replies() {
        let label = match reply.kind() {
            ReplyKind::AutoForward => "(continue)".to_string(),
            _ => reply_label(reply),
        };
        writeln!(writer, "  [{}] {}", reply.reply_id, label).map_err(map_tui_io)?;
    }
    Ok(())
}

/// A bare line picks the single auto-forward reply.
fn offered_reply(session: &DialogueSession, raw: &str) -> Option<Reply> {
    let node = session.current_node()?;
    let replies = node.body.replies();
    if raw.is_empty() {
        return match replies {
            [only] if only.kind() == ReplyKind::AutoForward => Some(only.clone()),
            _ => None,
        };
    }
    let reply_id = raw.parse::<usize>().ok()?;
    node.body.find_reply_by_id(reply_id).cloned()
}

fn ask_answers(
    reply: &Reply,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<BTreeMap<String, Value>>, WoolError> {
    let fields = reply_input_fields(reply);
    let mut answers = BTreeMap::new();
    for field in &fields {
        let prompts: Vec<(String, String)> = match field {
            InputCommand::Set { options } => options
                .iter()
                .map(|option| {
                    let text = option.text.plain_text().unwrap_or_else(|| option.text.to_string());
                    (option.variable.clone(), format!("{} (y/n)> ", text))
                })
                .collect(),
            _ => field
                .variable_names()
                .into_iter()
                .map(|name| (name.to_string(), format!("${} ({})> ", name, field.type_name())))
                .collect(),
        };
        for (name, prompt) in prompts {
            let Some(raw) = prompt_input_from(&prompt, reader, writer)? else {
                return Ok(None);
            };
            answers.insert(name.clone(), answer_value(&fields, &name, &raw));
        }
    }
    Ok(Some(answers))
}

pub(crate) fn handle_tui_command(
    raw: &str,
    context: &TuiCommandContext<'_>,
    session: &mut DialogueSession,
    emit: &mut dyn FnMut(String),
) -> Result<TuiCommandAction, WoolError> {
    match raw {
        ":help" => {
            emit(HELP.to_string());
            Ok(TuiCommandAction::Continue)
        }
        ":vars" => {
            for (name, value) in session.variables() {
                emit(format!("${} = {}", name, value));
            }
            Ok(TuiCommandAction::Continue)
        }
        ":save" => {
            save_session_state(
                Path::new(context.state_file),
                session,
                &context.scenario.id,
                context.settings.unknown_variables,
            )?;
            emit(format!("saved: {}", context.state_file));
            Ok(TuiCommandAction::Continue)
        }
        ":load" => {
            let (_, resumed) =
                load_session_from_state_for_scenario(Path::new(context.state_file), context.scenario)?;
            *session = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(TuiCommandAction::RefreshBoundary)
        }
        ":restart" => {
            *session = create_session_for_scenario(context.scenario, context.settings)?;
            emit("restarted".to_string());
            Ok(TuiCommandAction::RefreshBoundary)
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(TuiCommandAction::Quit)
        }
        _ => Ok(TuiCommandAction::NotHandled),
    }
}

/// `None` once the input is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, WoolError> {
    write!(writer, "{}", prefix).map_err(map_tui_io)?;
    writer.flush().map_err(map_tui_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_tui_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
