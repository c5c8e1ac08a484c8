use std::sync::OnceLock;

use log::trace;
use regex::Regex;
use wool_core::WoolError;
use wool_expr::Environment;
use wool_model::{
    ActionCommand, Command, InputCommand, InputOption, NodeBody, Reply, Segment, VariableString,
};

use super::rng::weighted_index;

fn inline_whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[\t ]+").expect("whitespace regex must compile"))
}

/// Environment and random state a body is executed against.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) env: &'a mut dyn Environment,
    pub(crate) rng_state: &'a mut u32,
}

/// Flattens `body` against `env`: variables are substituted, `set` runs,
/// `if` and `random` are replaced by the content of the clause taken, and
/// replies keep their commands for when they are chosen. Executing the
/// result again returns it unchanged.
pub fn execute_body(
    body: &NodeBody,
    env: &mut dyn Environment,
    rng_state: &mut u32,
) -> Result<NodeBody, WoolError> {
    let mut context = ExecutionContext { env, rng_state };
    execute_root(body, &mut context)
}

pub(crate) fn execute_root(
    body: &NodeBody,
    context: &mut ExecutionContext<'_>,
) -> Result<NodeBody, WoolError> {
    let mut output = NodeBody::new();
    execute_into(body, &mut output, context)?;
    Ok(normalize(output))
}

fn execute_into(
    body: &NodeBody,
    output: &mut NodeBody,
    context: &mut ExecutionContext<'_>,
) -> Result<(), WoolError> {
    for segment in body.segments() {
        match segment {
            Segment::Text(text) => {
                output.add_text(VariableString::from_text(text.evaluate(&*context.env)?));
            }
            Segment::Command(command) => execute_command(command, output, context)?,
        }
    }
    for reply in body.replies() {
        output.add_reply(execute_reply(reply, context)?);
    }
    Ok(())
}

fn execute_command(
    command: &Command,
    output: &mut NodeBody,
    context: &mut ExecutionContext<'_>,
) -> Result<(), WoolError> {
    match command {
        Command::Set(set) => {
            set.expression.evaluate(context.env)?;
        }
        Command::If(if_command) => {
            for clause in &if_command.clauses {
                if clause.condition.evaluate(context.env)?.is_truthy() {
                    return execute_into(&clause.body, output, context);
                }
            }
            if let Some(else_body) = &if_command.else_body {
                execute_into(else_body, output, context)?;
            }
        }
        Command::Random(random) => {
            let weights: Vec<f64> = random.clauses.iter().map(|clause| clause.weight).collect();
            if let Some(index) = weighted_index(context.rng_state, &weights) {
                trace!("random picked clause {} of {}", index, weights.len());
                execute_into(&random.clauses[index].body, output, context)?;
            }
        }
        Command::Input(input) => {
            output.add_command(Command::Input(resolve_input(input, &*context.env)?));
        }
        Command::Action(action) => {
            output.add_command(Command::Action(resolve_action(action, &*context.env)?));
        }
    }
    Ok(())
}

fn execute_reply(reply: &Reply, context: &mut ExecutionContext<'_>) -> Result<Reply, WoolError> {
    let statement = match &reply.statement {
        Some(statement) => {
            let mut output = NodeBody::new();
            execute_into(statement, &mut output, context)?;
            Some(normalize(output))
        }
        None => None,
    };
    Ok(Reply {
        reply_id: reply.reply_id,
        statement,
        node_pointer: reply.node_pointer.clone(),
        commands: reply.commands.clone(),
    })
}

fn resolve_input(input: &InputCommand, env: &dyn Environment) -> Result<InputCommand, WoolError> {
    let InputCommand::Set { options } = input else {
        return Ok(input.clone());
    };
    let options = options
        .iter()
        .map(|option| {
            Ok(InputOption {
                variable: option.variable.clone(),
                text: option.text.resolve(env)?,
            })
        })
        .collect::<Result<Vec<_>, WoolError>>()?;
    Ok(InputCommand::Set { options })
}

fn resolve_action(action: &ActionCommand, env: &dyn Environment) -> Result<ActionCommand, WoolError> {
    let mut parameters = action.parameters.clone();
    for value in parameters.values_mut() {
        *value = value.resolve(env)?;
    }
    Ok(ActionCommand {
        action_type: action.action_type,
        value: action.value.resolve(env)?,
        parameters,
    })
}

/// Collapses runs of spaces and tabs, trims every line and drops blank
/// lines inside text segments, then trims the body.
fn normalize(body: NodeBody) -> NodeBody {
    let mut output = NodeBody::new();
    for segment in body.segments() {
        match segment {
            Segment::Text(text) => {
                // executed text is always literal
                let literal = text.plain_text().unwrap_or_else(|| text.to_string());
                let normalized = normalize_text(&literal);
                if !normalized.is_empty() {
                    output.add_text(VariableString::from_text(normalized));
                }
            }
            Segment::Command(command) => output.add_command(command.clone()),
        }
    }
    let mut replies: Vec<Reply> = body.replies().to_vec();
    replies.sort_by_key(|reply| reply.reply_id);
    for reply in replies {
        output.add_reply(reply);
    }
    output.trim_whitespace();
    output
}

fn normalize_text(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let collapsed = inline_whitespace_regex().replace_all(line.trim(), " ");
        if !collapsed.is_empty() {
            lines.push(collapsed.into_owned());
        }
    }
    let mut result = lines.join("\n");
    // one space survives at each edge so text around commands stays apart
    if text.starts_with([' ', '\t', '\n']) && !result.is_empty() {
        result.insert(0, ' ');
    }
    if text.ends_with([' ', '\t', '\n']) && !result.is_empty() {
        result.push(' ');
    }
    result
}

#[cfg(test)]
mod execute_tests {
    use super::*;
    use wool_core::{SourceLocation, Value};
    use wool_expr::{MapEnvironment, UnknownVariablePolicy};
    use wool_model::ReplyKind;
    use wool_parser::parse_node_body;

    fn body(source: &str) -> NodeBody {
        parse_node_body("main", source, SourceLocation::new(1, 1)).expect("body should parse")
    }

    fn env(entries: &[(&str, Value)]) -> MapEnvironment {
        let mut env = MapEnvironment::new(UnknownVariablePolicy::Null);
        for (name, value) in entries {
            env.insert(*name, value.clone());
        }
        env
    }

    fn run(body: &NodeBody, env: &mut MapEnvironment) -> NodeBody {
        let mut rng_state = 1;
        execute_body(body, env, &mut rng_state).expect("execution should pass")
    }

    #[test]
    fn if_takes_the_first_true_clause() {
        let source = body("<<if $x == 1>>A<<else>>B<<endif>>");
        assert_eq!(run(&source, &mut env(&[("x", Value::Int(1))])).text(), "A");
        assert_eq!(run(&source, &mut env(&[("x", Value::Int(2))])).text(), "B");
        let executed = run(&source, &mut env(&[("x", Value::Int(2))]));
        assert!(!executed.has_commands());
    }

    #[test]
    fn text_is_substituted_and_normalized() {
        let source = body("Hello   $name,\n\n\t how are\tyou?  <<if true>> Fine.<<endif>>");
        let executed = run(&source, &mut env(&[("name", Value::from("Ann"))]));
        assert_eq!(executed.segments().len(), 1);
        assert_eq!(executed.text(), "Hello Ann,\nhow are you? Fine.");
    }

    #[test]
    fn set_mutates_the_environment_without_output() {
        let source = body("<<set $gold = $gold + 5>>You have $gold gold.");
        let mut environment = env(&[("gold", Value::Int(10))]);
        let executed = run(&source, &mut environment);
        assert_eq!(executed.text(), "You have 15 gold.");
        assert_eq!(environment.values().get("gold"), Some(&Value::Int(15)));
    }

    #[test]
    fn replies_are_substituted_but_their_commands_wait() {
        let source = body("Hi\n[[Pay $price|Shop|<<set $gold = $gold - $price>>]]");
        let mut environment = env(&[("price", Value::Int(3)), ("gold", Value::Int(10))]);
        let executed = run(&source, &mut environment);
        let reply = &executed.replies()[0];
        assert_eq!(
            reply.statement.as_ref().map(NodeBody::text).as_deref(),
            Some("Pay 3")
        );
        assert_eq!(reply.commands.len(), 1);
        assert_eq!(environment.values().get("gold"), Some(&Value::Int(10)));
    }

    #[test]
    fn conditional_replies_keep_source_order() {
        let source = body("Pick\n[[A|One]]\n<<if $vip>>[[B|Two]]<<endif>>\n[[C|Three]]");
        let ids = |executed: &NodeBody| -> Vec<usize> {
            executed.replies().iter().map(|reply| reply.reply_id).collect()
        };
        assert_eq!(ids(&run(&source, &mut env(&[("vip", Value::Bool(true))]))), vec![0, 1, 2]);
        assert_eq!(ids(&run(&source, &mut env(&[]))), vec![0, 2]);
    }

    #[test]
    fn actions_and_inputs_are_resolved_not_executed() {
        let source = body(
            "<<action type=\"image\" value=\"$pic.png\">>\n[[<<input type=\"set\" value1=\"$a\" option1=\"Take $item\">>|Next]]",
        );
        let executed = run(&source, &mut env(&[("pic", Value::from("cat")), ("item", Value::from("key"))]));
        let actions = executed.actions();
        assert_eq!(actions[0].value.plain_text().as_deref(), Some("cat.png"));
        let reply = &executed.replies()[0];
        assert_eq!(reply.kind(), ReplyKind::Input);
        let statement = reply.statement.as_ref().expect("statement");
        let [Segment::Command(Command::Input(InputCommand::Set { options }))] =
            statement.segments()
        else {
            panic!("expected set input");
        };
        assert_eq!(options[0].text.plain_text().as_deref(), Some("Take key"));
    }

    #[test]
    fn random_uses_the_seeded_state() {
        let source = body("<<random>>A<<or>>B<<or>>C<<endrandom>>");
        let mut first_state = 9;
        let mut second_state = 9;
        let first = execute_body(&source, &mut env(&[]), &mut first_state).expect("first");
        let second = execute_body(&source, &mut env(&[]), &mut second_state).expect("second");
        assert_eq!(first, second);
        assert_ne!(first_state, 9);
        assert!(["A", "B", "C"].contains(&first.text().as_str()));
    }

    #[test]
    fn executing_twice_is_a_no_op() {
        let source = body(
            "Hi $name! <<if $x>>Yes<<else>>No<<endif>>\n[[Go $name|Next|<<set $x = 1>>]]\n[[end]]",
        );
        let mut environment = env(&[("name", Value::from("Bo"))]);
        let once = run(&source, &mut environment);
        let twice = run(&once, &mut environment);
        assert_eq!(once, twice);
    }

    #[test]
    fn evaluation_errors_surface() {
        let source = body("<<if [1] < 2>>A<<endif>>");
        let mut rng_state = 1;
        let error = execute_body(&source, &mut env(&[]), &mut rng_state)
            .expect_err("list comparison should fail");
        assert_eq!(error.code, "EVAL_TYPE");
    }
}
