use std::cmp::Ordering;

use wool_core::{ErrorKind, Value, ValueMap, WoolError};

use crate::ast::{BinaryOperator, Expression};
use crate::env::Environment;

fn eval_error(code: &str, message: impl Into<String>) -> WoolError {
    WoolError::new(ErrorKind::Evaluation, code, message)
}

fn type_error(message: impl Into<String>) -> WoolError {
    eval_error("EVAL_TYPE", message)
}

impl Expression {
    pub fn evaluate(&self, env: &mut dyn Environment) -> Result<Value, WoolError> {
        match self {
            Self::Literal { value } => Ok(value.clone()),
            Self::Variable { name } => env.get(name),
            Self::Group { operand } => operand.evaluate(env),
            Self::Not { operand } => Ok(Value::Bool(!operand.evaluate(env)?.is_truthy())),
            Self::Negate { operand } => negate(operand.evaluate(env)?),
            Self::And { left, right } => {
                if !left.evaluate(env)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(right.evaluate(env)?.is_truthy()))
            }
            Self::Or { left, right } => {
                if left.evaluate(env)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(right.evaluate(env)?.is_truthy()))
            }
            Self::Binary {
                operator,
                left,
                right,
            } => {
                let left = left.evaluate(env)?;
                let right = right.evaluate(env)?;
                apply_binary(*operator, left, right)
            }
            Self::Dot { parent, member } => match parent.evaluate(env)? {
                Value::Map(mut values) => Ok(values.swap_remove(member).unwrap_or(Value::Null)),
                other => Err(type_error(format!(
                    "Operator \".\" requires a map, found {}",
                    other.type_name()
                ))),
            },
            Self::Index { parent, index } => {
                let parent = parent.evaluate(env)?;
                let index = index.evaluate(env)?;
                index_value(parent, index)
            }
            Self::Assign { name, value } => {
                let value = value.evaluate(env)?;
                env.set(name, value.clone())?;
                Ok(value)
            }
            Self::List { items } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.evaluate(env)?);
                }
                Ok(Value::List(values))
            }
            Self::Object { entries } => {
                let mut values = ValueMap::with_capacity(entries.len());
                for entry in entries {
                    let key = match entry.key.evaluate(env)? {
                        Value::String(key) => key,
                        key @ (Value::Int(_) | Value::Float(_)) => key.to_string(),
                        other => {
                            return Err(type_error(format!(
                                "Object key must be a string or number, found {}",
                                other.type_name()
                            )))
                        }
                    };
                    let value = entry.value.evaluate(env)?;
                    values.insert(key, value);
                }
                Ok(Value::Map(values))
            }
        }
    }
}

fn apply_binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, WoolError> {
    match operator {
        BinaryOperator::Equal => Ok(Value::Bool(left.equals(&right))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!left.equals(&right))),
        BinaryOperator::LessThan => compare(operator, &left, &right).map(|o| Value::Bool(o.is_lt())),
        BinaryOperator::LessEqual => compare(operator, &left, &right).map(|o| Value::Bool(o.is_le())),
        BinaryOperator::GreaterThan => compare(operator, &left, &right).map(|o| Value::Bool(o.is_gt())),
        BinaryOperator::GreaterEqual => {
            compare(operator, &left, &right).map(|o| Value::Bool(o.is_ge()))
        }
        BinaryOperator::In => contains(left, right),
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => subtract(left, right),
        BinaryOperator::Multiply => multiply(left, right),
        BinaryOperator::Divide => divide(left, right),
    }
}

fn is_comparable(value: &Value) -> bool {
    value.is_string() || value.is_number()
}

/// Lexical when either side is a string, numeric otherwise.
fn compare(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Ordering, WoolError> {
    if !is_comparable(left) || !is_comparable(right) {
        return Err(type_error(format!(
            "Operator \"{}\" cannot compare {} with {}",
            operator.symbol(),
            left.type_name(),
            right.type_name()
        )));
    }
    if left.is_string() || right.is_string() {
        return Ok(left.to_string().cmp(&right.to_string()));
    }
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    let a = left.as_f64().unwrap_or(f64::NAN);
    let b = right.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).ok_or_else(|| {
        type_error(format!(
            "Operator \"{}\" cannot order {} and {}",
            operator.symbol(),
            a,
            b
        ))
    })
}

fn contains(needle: Value, collection: Value) -> Result<Value, WoolError> {
    match collection {
        Value::String(haystack) => match needle {
            Value::String(_) | Value::Int(_) | Value::Float(_) => {
                Ok(Value::Bool(haystack.contains(&needle.to_string())))
            }
            other => Err(type_error(format!(
                "Operator \"in\" cannot search for {} in a string",
                other.type_name()
            ))),
        },
        Value::List(items) => match needle {
            Value::List(_) | Value::Map(_) => Err(type_error(format!(
                "Operator \"in\" cannot search for {} in a list",
                needle.type_name()
            ))),
            needle => Ok(Value::Bool(items.iter().any(|item| item.equals(&needle)))),
        },
        other => Err(type_error(format!(
            "Operator \"in\" requires a string or list, found {}",
            other.type_name()
        ))),
    }
}

fn overflow(operator: &str) -> WoolError {
    eval_error(
        "EVAL_OVERFLOW",
        format!("Integer overflow in operator \"{}\"", operator),
    )
}

fn add(left: Value, right: Value) -> Result<Value, WoolError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("+")),
        (a, b) if a.is_number() && b.is_number() => Ok(Value::Float(
            a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default(),
        )),
        (a, b) if a.is_string() || b.is_string() => Ok(Value::String(format!("{}{}", a, b))),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::Map(mut a), Value::Map(b)) => {
            a.extend(b);
            Ok(Value::Map(a))
        }
        (a, b) => Err(type_error(format!(
            "Operator \"+\" cannot add {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn subtract(left: Value, right: Value) -> Result<Value, WoolError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow("-")),
        (a, b) if a.is_number() && b.is_number() => Ok(Value::Float(
            a.as_f64().unwrap_or_default() - b.as_f64().unwrap_or_default(),
        )),
        (Value::List(items), Value::List(removed)) => Ok(Value::List(
            items
                .into_iter()
                .filter(|item| !removed.iter().any(|other| other.equals(item)))
                .collect(),
        )),
        (Value::List(items), removed) => Ok(Value::List(
            items.into_iter().filter(|item| !item.equals(&removed)).collect(),
        )),
        (Value::Map(mut values), Value::String(key)) => {
            values.shift_remove(&key);
            Ok(Value::Map(values))
        }
        (Value::Map(mut values), Value::List(keys)) => {
            for key in keys {
                values.shift_remove(&key.to_string());
            }
            Ok(Value::Map(values))
        }
        (a, b) => Err(type_error(format!(
            "Operator \"-\" cannot subtract {} from {}",
            b.type_name(),
            a.type_name()
        ))),
    }
}

fn multiply(left: Value, right: Value) -> Result<Value, WoolError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow("*")),
        (a, b) if a.is_number() && b.is_number() => Ok(Value::Float(
            a.as_f64().unwrap_or_default() * b.as_f64().unwrap_or_default(),
        )),
        (a, b) => Err(type_error(format!(
            "Operator \"*\" cannot multiply {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// Integer division stays integer only when it is exact.
fn divide(left: Value, right: Value) -> Result<Value, WoolError> {
    if !left.is_number() || !right.is_number() {
        return Err(type_error(format!(
            "Operator \"/\" cannot divide {} by {}",
            left.type_name(),
            right.type_name()
        )));
    }
    if right.as_f64() == Some(0.0) {
        return Err(eval_error("EVAL_DIVISION_BY_ZERO", "Division by zero"));
    }
    if let (Value::Int(a), Value::Int(b)) = (&left, &right) {
        if a.checked_rem(*b) == Some(0) {
            return a.checked_div(*b).map(Value::Int).ok_or_else(|| overflow("/"));
        }
    }
    Ok(Value::Float(
        left.as_f64().unwrap_or_default() / right.as_f64().unwrap_or_default(),
    ))
}

fn negate(value: Value) -> Result<Value, WoolError> {
    match value {
        Value::Int(number) => number.checked_neg().map(Value::Int).ok_or_else(|| overflow("-")),
        Value::Float(number) => Ok(Value::Float(-number)),
        other => Err(type_error(format!(
            "Operator \"-\" cannot negate {}",
            other.type_name()
        ))),
    }
}

fn integer_index(index: &Value) -> Result<i64, WoolError> {
    match index {
        Value::Int(position) => Ok(*position),
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| {
            type_error(format!("Index must be an integer, found string \"{}\"", text))
        }),
        other => Err(type_error(format!(
            "Index must be an integer, found {}",
            other.type_name()
        ))),
    }
}

fn checked_position(position: i64, len: usize) -> Result<usize, WoolError> {
    usize::try_from(position)
        .ok()
        .filter(|position| *position < len)
        .ok_or_else(|| {
            eval_error(
                "EVAL_INDEX_RANGE",
                format!("Index {} out of range (length {})", position, len),
            )
        })
}

fn index_value(parent: Value, index: Value) -> Result<Value, WoolError> {
    match parent {
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let position = checked_position(integer_index(&index)?, chars.len())?;
            Ok(Value::String(chars[position].to_string()))
        }
        Value::List(mut items) => {
            let position = checked_position(integer_index(&index)?, items.len())?;
            Ok(items.swap_remove(position))
        }
        Value::Map(mut values) => match index {
            Value::String(key) => Ok(values.swap_remove(&key).unwrap_or(Value::Null)),
            key @ (Value::Int(_) | Value::Float(_)) => {
                Ok(values.swap_remove(&key.to_string()).unwrap_or(Value::Null))
            }
            other => Err(type_error(format!(
                "Map key must be a string or number, found {}",
                other.type_name()
            ))),
        },
        other => Err(type_error(format!(
            "Operator \"[]\" cannot index {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod eval_tests {
    use super::*;
    use crate::env::{MapEnvironment, UnknownVariablePolicy};
    use crate::parser::parse_expression;

    fn eval_with(source: &str, env: &mut MapEnvironment) -> Result<Value, WoolError> {
        parse_expression(source)
            .expect("expression should parse")
            .evaluate(env)
    }

    fn eval(source: &str) -> Result<Value, WoolError> {
        eval_with(source, &mut MapEnvironment::default())
    }

    #[test]
    fn division_preserves_integers_only_when_exact() {
        assert_eq!(eval("4 / 2").expect("eval"), Value::Int(2));
        assert_eq!(eval("3 / 2").expect("eval"), Value::Float(1.5));
        assert_eq!(eval("2 * 3").expect("eval"), Value::Int(6));
        assert_eq!(eval("2 * 1.5").expect("eval"), Value::Float(3.0));
        assert_eq!(eval("7 - 10").expect("eval"), Value::Int(-3));
        let error = eval("1 / 0").expect_err("division by zero should fail");
        assert_eq!(error.code, "EVAL_DIVISION_BY_ZERO");
    }

    #[test]
    fn comparison_is_lexical_for_strings_and_numeric_otherwise() {
        assert_eq!(eval(r#""abc" < "abd""#).expect("eval"), Value::Bool(true));
        assert_eq!(eval(r#""10" < 9"#).expect("eval"), Value::Bool(true));
        assert_eq!(eval("10 < 9").expect("eval"), Value::Bool(false));
        assert_eq!(eval("2 <= 2.0").expect("eval"), Value::Bool(true));
        assert_eq!(eval("3 > 2 && 2 >= 2").expect("eval"), Value::Bool(true));

        let error = eval("[1] < 2").expect_err("list comparison should fail");
        assert_eq!(error.kind, ErrorKind::Evaluation);
        assert!(error.message.contains("list"));
    }

    #[test]
    fn equality_never_fails_across_types() {
        assert_eq!(eval("[1, 2] == [1, 2]").expect("eval"), Value::Bool(true));
        assert_eq!(eval(r#"1 == "1""#).expect("eval"), Value::Bool(false));
        assert_eq!(eval("null != {}").expect("eval"), Value::Bool(true));
        assert_eq!(eval("1 == 1.0").expect("eval"), Value::Bool(true));
    }

    #[test]
    fn in_operator_accepts_scalar_needles_only() {
        assert_eq!(eval("2 in [1, 2, 3]").expect("eval"), Value::Bool(true));
        assert_eq!(eval(r#""b" in "abc""#).expect("eval"), Value::Bool(true));
        assert_eq!(eval(r#"4 in "1234""#).expect("eval"), Value::Bool(true));
        let error = eval("[1] in [1, 2, 3]").expect_err("list needle should fail");
        assert_eq!(error.code, "EVAL_TYPE");
        let error = eval(r#"1 in {"a": 1}"#).expect_err("map collection should fail");
        assert_eq!(error.code, "EVAL_TYPE");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let mut env = MapEnvironment::new(UnknownVariablePolicy::Fail);
        assert_eq!(
            eval_with("false && $missing", &mut env).expect("eval"),
            Value::Bool(false)
        );
        assert_eq!(
            eval_with("true || $missing", &mut env).expect("eval"),
            Value::Bool(true)
        );
        let error = eval_with("true && $missing", &mut env).expect_err("unknown should fail");
        assert_eq!(error.kind, ErrorKind::UnknownVariable);
    }

    #[test]
    fn assign_mutates_environment_and_returns_value() {
        let mut env = MapEnvironment::default();
        env.insert("count", 2);
        assert_eq!(
            eval_with("$count = $count + 1", &mut env).expect("eval"),
            Value::Int(3)
        );
        assert_eq!(env.values().get("count"), Some(&Value::Int(3)));
        assert_eq!(eval_with("$unset", &mut env).expect("eval"), Value::Null);
    }

    #[test]
    fn indexing_and_member_access() {
        let mut env = MapEnvironment::default();
        env.insert("word", "hey");
        assert_eq!(eval_with("$word[1]", &mut env).expect("eval"), Value::from("e"));
        assert_eq!(eval_with(r#"[5, 6]["1"]"#, &mut env).expect("eval"), Value::Int(6));
        assert_eq!(
            eval_with(r#"{"a": {"b": 2}}.a.b"#, &mut env).expect("eval"),
            Value::Int(2)
        );
        assert_eq!(eval_with(r#"{"a": 1}.z"#, &mut env).expect("eval"), Value::Null);
        assert_eq!(eval_with(r#"{1: "x"}[1]"#, &mut env).expect("eval"), Value::from("x"));

        let error = eval_with("[1][3]", &mut env).expect_err("out of range should fail");
        assert_eq!(error.code, "EVAL_INDEX_RANGE");
        let error = eval_with("[1][-1]", &mut env).expect_err("negative index should fail");
        assert_eq!(error.code, "EVAL_INDEX_RANGE");
        let error = eval_with("[1][1.5]", &mut env).expect_err("float index should fail");
        assert_eq!(error.code, "EVAL_TYPE");
        let error = eval_with("$word.length", &mut env).expect_err("dot on string should fail");
        assert!(error.message.contains("string"));
    }

    #[test]
    fn arithmetic_on_collections_and_strings() {
        assert_eq!(eval(r#""a" + 1"#).expect("eval"), Value::from("a1"));
        assert_eq!(
            eval("[1, 2, 2, 3] - 2").expect("eval"),
            Value::List(vec![Value::Int(1), Value::Int(3)])
        );
        assert_eq!(
            eval(r#"{"a": 1, "b": 2} - "a""#).expect("eval"),
            eval(r#"{"b": 2}"#).expect("eval")
        );
        assert_eq!(eval("-(2 + 3)").expect("eval"), Value::Int(-5));
        assert!(eval("true * 2").is_err());
        let error = eval(r#"{[1]: 2}"#).expect_err("list key should fail");
        assert!(error.message.contains("Object key"));
    }

    #[test]
    fn object_literals_keep_source_order() {
        assert_eq!(
            eval(r#"{"b": 1, "a": 2}"#).expect("eval").to_string(),
            "{b: 1, a: 2}"
        );
        assert_eq!(
            eval(r#"{"c": 1, "a": 2} + {"b": 3, "c": 4}"#)
                .expect("eval")
                .to_string(),
            "{c: 4, a: 2, b: 3}"
        );
        assert_eq!(
            eval(r#"{"c": 1, "a": 2, "b": 3} - "c""#)
                .expect("eval")
                .to_string(),
            "{a: 2, b: 3}"
        );
        assert_eq!(
            eval(r#"{"c": 1, "a": 2, "b": 3} - ["a"]"#)
                .expect("eval")
                .to_string(),
            "{c: 1, b: 3}"
        );
    }
}
