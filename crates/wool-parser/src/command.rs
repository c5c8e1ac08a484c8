use wool_core::{SourceLocation, WoolError};
use wool_expr::{parse_expression_at, Expression};
use wool_model::{
    ActionCommand, ActionType, Command, IfClause, IfCommand, InputCommand, InputOption,
    RandomClause, RandomCommand, SetCommand, VariableString,
};

use crate::attributes::Attributes;
use crate::body::{command_name, BodyParser, BodyScope};
use crate::cursor::{parse_error, TokenCursor};
use crate::token::{BodyToken, BodyTokenKind};

const COMMAND_PARSE: &str = "COMMAND_PARSE";
const CLAUSE_COMMANDS: &[&str] = &["elseif", "else", "endif", "or", "endrandom"];
const KNOWN_COMMANDS: &[&str] = &["if", "set", "input", "action", "random"];

/// One `<<name arguments>>` with the arguments still as tokens.
struct CommandHeader {
    name: String,
    location: SourceLocation,
    arguments: Vec<BodyToken>,
    end: SourceLocation,
}

impl CommandHeader {
    fn raw_arguments(&self) -> String {
        self.arguments.iter().map(|token| token.raw.as_str()).collect()
    }

    fn arguments_origin(&self) -> SourceLocation {
        self.arguments
            .first()
            .map(|token| token.location)
            .unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> WoolError {
        parse_error(COMMAND_PARSE, message, self.location)
    }

    fn expression(&self) -> Result<Expression, WoolError> {
        let raw = self.raw_arguments();
        if raw.trim().is_empty() {
            return Err(self.error(format!("Missing expression in <<{}>>", self.name)));
        }
        parse_expression_at(&raw, self.arguments_origin())
    }

    fn expect_no_arguments(&self) -> Result<(), WoolError> {
        if self.raw_arguments().trim().is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("<<{}>> takes no arguments", self.name)))
        }
    }

    fn attributes(&self) -> Result<Attributes, WoolError> {
        Attributes::parse(&self.name, self.location, &self.arguments)
    }
}

fn read_command_header(cursor: &mut TokenCursor<'_>) -> Result<CommandHeader, WoolError> {
    let start = cursor.expect(BodyTokenKind::CommandStart, "<<")?;
    let tokens = cursor.take_until(BodyTokenKind::CommandEnd);
    let end = cursor.expect(BodyTokenKind::CommandEnd, ">>")?;
    let first = tokens
        .first()
        .filter(|token| token.kind == BodyTokenKind::Text);
    let Some((first, (name, consumed))) =
        first.and_then(|token| command_name(token).map(|name| (token, name)))
    else {
        return Err(parse_error(
            COMMAND_PARSE,
            "Missing command name after <<",
            start.location,
        ));
    };
    let mut arguments = Vec::new();
    let rest = &first.raw[consumed..];
    if !rest.is_empty() {
        let offset = first.raw[..consumed].chars().count();
        arguments.push(BodyToken {
            kind: BodyTokenKind::Text,
            raw: rest.to_string(),
            value: VariableString::from_text(rest),
            location: SourceLocation::new(first.location.line, first.location.column + offset),
        });
    }
    arguments.extend(tokens[1..].iter().cloned());
    Ok(CommandHeader {
        name,
        location: start.location,
        arguments,
        end: end.location,
    })
}

impl BodyParser<'_> {
    pub(crate) fn parse_command(
        &mut self,
        cursor: &mut TokenCursor<'_>,
        scope: BodyScope,
    ) -> Result<Command, WoolError> {
        let header = read_command_header(cursor)?;
        let name = header.name.as_str();
        if !scope.allows_command(name) {
            let message = if KNOWN_COMMANDS.contains(&name) {
                format!("<<{}>> is not allowed {}", name, scope.describe())
            } else if CLAUSE_COMMANDS.contains(&name) {
                format!("Unexpected <<{}>>", name)
            } else {
                format!("Unknown command <<{}>>", name)
            };
            return Err(header.error(message));
        }
        match name {
            "if" => self.parse_if(cursor, scope, &header),
            "set" => parse_set(&header),
            "input" => parse_input(&header),
            "action" => parse_action(&header),
            "random" => self.parse_random(cursor, scope, &header),
            _ => Err(header.error(format!("Unknown command <<{}>>", name))),
        }
    }

    fn parse_if(
        &mut self,
        cursor: &mut TokenCursor<'_>,
        scope: BodyScope,
        header: &CommandHeader,
    ) -> Result<Command, WoolError> {
        let mut clauses = Vec::new();
        let mut else_body = None;
        let mut condition = Some(parse_condition(header)?);
        loop {
            let terminators: &[&str] = if condition.is_some() {
                &["elseif", "else", "endif"]
            } else {
                &["endif"]
            };
            let (body, terminator) = self.parse_body(cursor, scope, terminators)?;
            match condition.take() {
                Some(condition) => clauses.push(IfClause { condition, body }),
                None => else_body = Some(body),
            }
            let clause = read_command_header(cursor)?;
            match terminator.as_deref() {
                Some("elseif") => condition = Some(parse_condition(&clause)?),
                Some("else") => clause.expect_no_arguments()?,
                _ => {
                    clause.expect_no_arguments()?;
                    break;
                }
            }
        }
        Ok(Command::If(IfCommand {
            clauses,
            else_body,
        }))
    }

    fn parse_random(
        &mut self,
        cursor: &mut TokenCursor<'_>,
        scope: BodyScope,
        header: &CommandHeader,
    ) -> Result<Command, WoolError> {
        let mut clauses = Vec::new();
        let mut weight = read_weight(header)?;
        loop {
            let (body, terminator) = self.parse_body(cursor, scope, &["or", "endrandom"])?;
            clauses.push(RandomClause { weight, body });
            let clause = read_command_header(cursor)?;
            if terminator.as_deref() == Some("or") {
                weight = read_weight(&clause)?;
            } else {
                clause.expect_no_arguments()?;
                break;
            }
        }
        if clauses.iter().all(|clause| clause.weight <= 0.0) {
            return Err(header.error("<<random>> needs at least one clause with a positive weight"));
        }
        Ok(Command::Random(RandomCommand { clauses }))
    }
}

fn parse_condition(header: &CommandHeader) -> Result<Expression, WoolError> {
    let expression = header.expression()?;
    if expression.contains_assignment() {
        return Err(parse_error(
            COMMAND_PARSE,
            format!("Assignment is not allowed in <<{}>>", header.name),
            header.arguments_origin(),
        ));
    }
    Ok(expression)
}

fn parse_set(header: &CommandHeader) -> Result<Command, WoolError> {
    let expression = header.expression()?;
    match &expression {
        Expression::Assign { value, .. } if value.contains_assignment() => Err(parse_error(
            COMMAND_PARSE,
            "Nested assignment is not allowed in <<set>>",
            header.arguments_origin(),
        )),
        Expression::Assign { .. } => Ok(Command::Set(SetCommand { expression })),
        _ => Err(parse_error(
            COMMAND_PARSE,
            "<<set>> needs an assignment such as $name = value",
            header.arguments_origin(),
        )),
    }
}

fn read_weight(header: &CommandHeader) -> Result<f64, WoolError> {
    let mut attributes = header.attributes()?;
    let weight = attributes.read_float_attr("weight", Some(0.0))?.unwrap_or(1.0);
    attributes.finish()?;
    Ok(weight)
}

fn parse_input(header: &CommandHeader) -> Result<Command, WoolError> {
    let mut attributes = header.attributes()?;
    let Some(input_type) = attributes.read_plain_text_attr("type")? else {
        return Err(header.error("Missing attribute \"type\" in <<input>>"));
    };
    let input = match input_type.as_str() {
        "text" | "longtext" | "numeric" => {
            let Some(variable) = attributes.read_variable_attr("value")? else {
                return Err(header.error("Missing attribute \"value\" in <<input>>"));
            };
            let length_floor = if input_type == "numeric" { None } else { Some(0) };
            let min = attributes.read_int_attr("min", length_floor, None)?;
            let max = attributes.read_int_attr("max", length_floor, None)?;
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(header.error(format!(
                        "Attribute \"min\" ({}) is greater than \"max\" ({}) in <<input>>",
                        min, max
                    )));
                }
            }
            match input_type.as_str() {
                "text" => InputCommand::Text { variable, min, max },
                "longtext" => InputCommand::LongText { variable, min, max },
                _ => InputCommand::Numeric { variable, min, max },
            }
        }
        "set" => {
            let mut options = Vec::new();
            for index in 1.. {
                let variable = attributes.read_variable_attr(&format!("value{}", index))?;
                let text = attributes.read_attr(&format!("option{}", index));
                match (variable, text) {
                    (Some(variable), Some(text)) => options.push(InputOption { variable, text }),
                    (None, None) => break,
                    _ => {
                        return Err(header.error(format!(
                            "<<input type=\"set\">> needs both value{0} and option{0}",
                            index
                        )));
                    }
                }
            }
            if options.is_empty() {
                return Err(header.error("<<input type=\"set\">> needs at least one option"));
            }
            InputCommand::Set { options }
        }
        other => {
            return Err(header.error(format!("Unknown input type \"{}\"", other)));
        }
    };
    attributes.finish()?;
    Ok(Command::Input(input))
}

fn parse_action(header: &CommandHeader) -> Result<Command, WoolError> {
    let mut attributes = header.attributes()?;
    let Some(type_name) = attributes.read_plain_text_attr("type")? else {
        return Err(header.error("Missing attribute \"type\" in <<action>>"));
    };
    let Some(action_type) = ActionType::parse(&type_name) else {
        return Err(header.error(format!("Unknown action type \"{}\"", type_name)));
    };
    let value = attributes.read_required_attr("value")?;
    Ok(Command::Action(ActionCommand {
        action_type,
        value,
        parameters: attributes.into_remaining(),
    }))
}

#[cfg(test)]
mod command_tests {
    use wool_core::SourceLocation;
    use wool_model::{ActionType, Command, InputCommand, NodeBody, Segment};

    use crate::body::parse_node_body;

    fn parse(source: &str) -> Result<NodeBody, wool_core::WoolError> {
        parse_node_body("main", source, SourceLocation::new(1, 1))
    }

    fn single_command(source: &str) -> Command {
        let body = parse(source).expect("command should parse");
        match body.segments() {
            [Segment::Command(command)] => command.clone(),
            other => panic!("expected one command, got {:?}", other),
        }
    }

    #[test]
    fn set_accepts_equals_and_to() {
        for source in ["<<set $gold = $gold + 5>>", "<<set $gold to $gold + 5>>"] {
            let Command::Set(command) = single_command(source) else {
                panic!("expected set");
            };
            assert_eq!(command.variable_name(), Some("gold"));
        }
    }

    #[test]
    fn set_rejects_non_assignments_and_nesting() {
        let error = parse("<<set $x == 1>>").expect_err("comparison should fail");
        assert_eq!(error.code, "COMMAND_PARSE");
        let error = parse("<<set $x = $y = 1>>").expect_err("nested assignment should fail");
        assert!(error.message.contains("Nested assignment"));
        let error = parse("<<set 1 = 2>>").expect_err("literal target should fail");
        assert_eq!(error.code, "EXPR_PARSE");
    }

    #[test]
    fn if_rejects_assignment() {
        let error = parse("<<if $x = 1>>A<<endif>>").expect_err("assignment in if");
        assert!(error.message.contains("Assignment is not allowed"));
    }

    #[test]
    fn expression_errors_point_into_the_command() {
        let error = parse("Hello\n<<if $x ==>>A<<endif>>").expect_err("bad expression");
        assert_eq!(error.code, "EXPR_PARSE");
        assert_eq!(error.span.map(|span| span.start.line), Some(2));
    }

    #[test]
    fn action_collects_parameters() {
        let Command::Action(action) =
            single_command("<<action type=\"image\" value=\"$portrait\" caption=\"Hi $name\">>")
        else {
            panic!("expected action");
        };
        assert_eq!(action.action_type, ActionType::Image);
        assert_eq!(action.value.to_string(), "$portrait");
        assert_eq!(action.parameters["caption"].to_string(), "Hi $name");
    }

    #[test]
    fn action_requires_known_type() {
        let error = parse("<<action type=\"sound\" value=\"x\">>").expect_err("bad type");
        assert!(error.message.contains("Unknown action type"));
    }

    #[test]
    fn input_is_only_allowed_in_reply_statements() {
        let error = parse("<<input type=\"text\" value=\"$name\">>").expect_err("input in body");
        assert!(error.message.contains("not allowed in a node body"));

        let body = parse("[[<<input type=\"numeric\" value=\"$age\" min=\"0\" max=\"120\">>|Next]]")
            .expect("input reply should parse");
        let statement = body.replies()[0]
            .statement
            .as_ref()
            .expect("statement should exist");
        let [Segment::Command(Command::Input(InputCommand::Numeric { variable, min, max }))] =
            statement.segments()
        else {
            panic!("expected numeric input");
        };
        assert_eq!(variable, "age");
        assert_eq!((*min, *max), (Some(0), Some(120)));
    }

    #[test]
    fn input_set_pairs_values_and_options() {
        let body = parse(
            "[[<<input type=\"set\" value1=\"$tea\" option1=\"Tea\" value2=\"$milk\" option2=\"Milk\">>|Next]]",
        )
        .expect("set input should parse");
        let statement = body.replies()[0].statement.as_ref().expect("statement");
        let [Segment::Command(Command::Input(InputCommand::Set { options }))] =
            statement.segments()
        else {
            panic!("expected set input");
        };
        assert_eq!(options.len(), 2);

        let error = parse("[[<<input type=\"set\" value1=\"$tea\">>|Next]]")
            .expect_err("missing option should fail");
        assert!(error.message.contains("value1 and option1"));
    }

    #[test]
    fn random_reads_weights() {
        let Command::Random(random) =
            single_command("<<random weight=\"3\">>A<<or>>B<<or weight=\"0.5\">>C<<endrandom>>")
        else {
            panic!("expected random");
        };
        let weights: Vec<f64> = random.clauses.iter().map(|clause| clause.weight).collect();
        assert_eq!(weights, vec![3.0, 1.0, 0.5]);

        let error = parse("<<random weight=\"0\">>A<<endrandom>>").expect_err("zero weights");
        assert_eq!(error.code, "COMMAND_PARSE");
    }

    #[test]
    fn unknown_and_stray_commands_fail() {
        let error = parse("<<jump Start>>").expect_err("unknown command");
        assert!(error.message.contains("Unknown command <<jump>>"));
        let error = parse("A<<endif>>").expect_err("stray endif");
        assert!(error.message.contains("Unexpected <<endif>>"));
    }
}
