use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use wool_core::{ErrorKind, Value};
use wool_model::{NodePointer, ReplyKind};

use super::runtime_test_support::*;
use super::*;
use crate::store::VariableSource;

const SHOP: &str = "\
title: Start
speaker: Merchant
---
Welcome, $name. You have $gold gold.
[[Buy a sword|Bought|<<set $gold = $gold - 5>>]]
<<if $gold > 100>>[[Buy the castle|Castle]]<<endif>>
[[Leave|end]]
===
title: Bought
---
Enjoy. $gold gold left.
[[Back|Start]]
===
title: Castle
---
It is yours.
===
";

fn value(engine: &ActiveDialogue, name: &str) -> Option<Value> {
    engine.store().borrow().value(name).cloned()
}

#[test]
fn start_executes_the_start_node() {
    let mut engine = engine(SHOP, &[("name", Value::from("Ann")), ("gold", Value::Int(10))]);
    assert_eq!(engine.state(), DialogueState::Inactive);
    let node = engine.start(None).expect("start should pass");
    assert_eq!(engine.state(), DialogueState::Active);
    assert_eq!(node.title(), "Start");
    assert_eq!(node.speaker(), Some("Merchant"));
    assert_eq!(node.body.text(), "Welcome, Ann. You have 10 gold.");
    let ids: Vec<usize> = node.body.replies().iter().map(|reply| reply.reply_id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(engine.current_node(), Some(&node));
}

#[test]
fn start_twice_is_rejected() {
    let mut engine = engine(SHOP, &[]);
    engine.start(None).expect("start should pass");
    let error = engine.start(None).expect_err("second start should fail");
    assert_eq!(error.code, "ENGINE_ALREADY_STARTED");
    assert_eq!(error.kind, ErrorKind::EngineState);
}

#[test]
fn start_at_missing_node_fails() {
    let mut engine = engine(SHOP, &[]);
    let error = engine.start(Some("Nowhere")).expect_err("missing node");
    assert_eq!(error.code, "ENGINE_NODE_NOT_FOUND");
    assert_eq!(engine.state(), DialogueState::Inactive);
}

#[test]
fn node_without_replies_finishes_immediately() {
    let mut engine = engine(SHOP, &[]);
    let node = engine.start(Some("castle")).expect("start should pass");
    assert_eq!(node.body.text(), "It is yours.");
    assert_eq!(engine.state(), DialogueState::Finished);
}

#[test]
fn node_whose_replies_are_all_hidden_finishes() {
    const GATE: &str = "\
title: Start
---
The gate is shut.
<<if $key>>[[Unlock it|Inside]]<<endif>>
===
title: Inside
---
You are in.
===
";
    let mut locked = engine(GATE, &[("key", Value::Bool(false))]);
    let node = locked.start(None).expect("start should pass");
    assert!(node.body.replies().is_empty());
    assert_eq!(locked.state(), DialogueState::Finished);

    let mut open = engine(GATE, &[("key", Value::Bool(true))]);
    let node = open.start(None).expect("start should pass");
    assert_eq!(node.body.replies().len(), 1);
    assert_eq!(open.state(), DialogueState::Active);
}

#[test]
fn choosing_runs_reply_commands_and_moves_on() {
    let mut engine = engine(SHOP, &[("gold", Value::Int(10))]);
    engine.start(None).expect("start should pass");
    let pointer = engine.process_reply(0).expect("reply should pass");
    assert_eq!(pointer, NodePointer::internal("Bought"));
    assert_eq!(value(&engine, "gold"), Some(Value::Int(5)));
    assert_eq!(engine.current_node().map(ExecutedNode::title), Some("Start"));

    let Progress::Node(node) = engine.progress(&pointer).expect("progress should pass") else {
        panic!("expected a node");
    };
    assert_eq!(node.body.text(), "Enjoy. 5 gold left.");
    assert_eq!(engine.state(), DialogueState::Active);
}

#[test]
fn end_pointer_finishes() {
    let mut engine = engine(SHOP, &[]);
    engine.start(None).expect("start should pass");
    assert_eq!(engine.choose(2).expect("leave should pass"), Progress::Finished);
    assert_eq!(engine.state(), DialogueState::Finished);
    let error = engine.choose(0).expect_err("finished dialogue");
    assert_eq!(error.code, "ENGINE_NOT_ACTIVE");
}

#[test]
fn hidden_or_unknown_reply_ids_are_rejected() {
    let mut engine = engine(SHOP, &[("gold", Value::Int(10))]);
    engine.start(None).expect("start should pass");
    for reply_id in [1, 9] {
        let error = engine.process_reply(reply_id).expect_err("reply should be missing");
        assert_eq!(error.code, "ENGINE_REPLY_NOT_FOUND");
        assert_eq!(error.kind, ErrorKind::EngineState);
    }
    assert_eq!(engine.state(), DialogueState::Active);
}

#[test]
fn process_reply_needs_an_active_dialogue() {
    let mut engine = engine(SHOP, &[]);
    let error = engine.process_reply(0).expect_err("inactive dialogue");
    assert_eq!(error.code, "ENGINE_NOT_ACTIVE");
}

#[test]
fn external_pointers_are_handed_back() {
    let source = "title: Start\n---\nBye\n[[Go|Town.Square]]\n===\n";
    let mut engine = engine(source, &[]);
    engine.start(None).expect("start should pass");
    let progress = engine.choose(0).expect("choose should pass");
    assert_eq!(
        progress,
        Progress::External(NodePointer::external("Town", "Square"))
    );
    assert_eq!(engine.state(), DialogueState::Finished);
}

#[test]
fn input_values_are_validated_and_stored() {
    let source = "\
title: Start
---
Who are you?
[[I am <<input type=\"text\" value=\"$name\" min=\"2\" max=\"10\">>|Next]]
[[<<input type=\"numeric\" value=\"$age\" min=\"0\" max=\"120\">> years|Next]]
[[<<input type=\"set\" value1=\"$tea\" option1=\"Tea\" value2=\"$cake\" option2=\"Cake\">>|Next]]
[[Skip|Next]]
===
title: Next
---
Done.
===
";
    let mut engine = engine(source, &[]);
    let node = engine.start(None).expect("start should pass");
    assert!(node.body.replies()[..3]
        .iter()
        .all(|reply| reply.kind() == ReplyKind::Input));

    let answers = |entries: &[(&str, Value)]| -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    };

    let error = engine
        .store_reply_input(0, &answers(&[("name", Value::from("A"))]))
        .expect_err("too short");
    assert_eq!(error.code, "ENGINE_INPUT_INVALID");
    let error = engine
        .store_reply_input(1, &answers(&[("age", Value::from("old"))]))
        .expect_err("not a number");
    assert!(error.message.contains("expects a number"));
    let error = engine
        .store_reply_input(1, &answers(&[("age", Value::Int(30)), ("extra", Value::Int(1))]))
        .expect_err("unknown field");
    assert!(error.message.contains("$extra"));
    assert_eq!(value(&engine, "age"), None);
    let error = engine
        .store_reply_input(3, &answers(&[]))
        .expect_err("basic reply");
    assert!(error.message.contains("no input fields"));

    engine
        .store_reply_input(0, &answers(&[("name", Value::from("Bo"))]))
        .expect("name should be stored");
    engine
        .store_reply_input(1, &answers(&[("age", Value::Int(30))]))
        .expect("age should be stored");
    engine
        .store_reply_input(2, &answers(&[("cake", Value::Bool(true))]))
        .expect("set should be stored");
    assert_eq!(value(&engine, "name"), Some(Value::from("Bo")));
    assert_eq!(value(&engine, "tea"), Some(Value::Bool(false)));
    assert_eq!(value(&engine, "cake"), Some(Value::Bool(true)));

    assert_eq!(engine.user_statement_from_reply_id(0).expect("statement"), "I am Bo");
    assert_eq!(engine.user_statement_from_reply_id(1).expect("statement"), "30 years");
    assert_eq!(engine.user_statement_from_reply_id(2).expect("statement"), "Cake");
    assert_eq!(engine.user_statement_from_reply_id(3).expect("statement"), "Skip");
}

#[test]
fn input_writes_are_reported_with_their_source() {
    let source = "title: Start\n---\n[[<<input type=\"longtext\" value=\"$story\">>|end]]\n===\n";
    let mut engine = engine(source, &[]);
    engine.start(None).expect("start should pass");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine
        .store()
        .borrow_mut()
        .on_change(move |change| sink.borrow_mut().push((change.name.clone(), change.source)));
    let values = BTreeMap::from([("story".to_string(), Value::from("Once upon a time"))]);
    engine.store_reply_input(0, &values).expect("input should be stored");
    assert_eq!(
        seen.borrow().as_slice(),
        &[("story".to_string(), VariableSource::Input)]
    );
}

#[test]
fn auto_forward_statement() {
    let source = "title: Start\n---\nA moment passes.\n[[Next]]\n===\ntitle: Next\n---\nLater.\n===\n";
    let mut engine = engine(source, &[]);
    engine.start(None).expect("start should pass");
    assert_eq!(
        engine.user_statement_from_reply_id(0).expect("statement"),
        "AUTOFORWARD"
    );
}

#[test]
fn stateless_execution_leaves_the_store_alone() {
    let source = "\
title: Start
---
<<set $visits = $visits + 1>>Visit $visits.
[[Again|Start]]
===
";
    let mut engine = engine(source, &[("visits", Value::Int(0))]);
    let preview = engine.execute_node_stateless("start").expect("preview should pass");
    assert_eq!(preview.body.text(), "Visit 1.");
    assert_eq!(value(&engine, "visits"), Some(Value::Int(0)));
    assert_eq!(engine.state(), DialogueState::Inactive);

    engine.start(None).expect("start should pass");
    let Progress::Node(node) = engine.choose(0).expect("choose should pass") else {
        panic!("expected a node");
    };
    assert_eq!(node.body.text(), "Visit 2.");
}

#[test]
fn same_seed_replays_the_same_random_path() {
    let source = "\
title: Start
---
<<random>>Rain<<or>>Sun<<or>>Snow<<or>>Fog<<endrandom>>
[[Again|Start]]
===
";
    let walk = || -> Vec<String> {
        let mut engine = engine(source, &[]);
        let mut texts = vec![engine.start(None).expect("start should pass").body.text()];
        for _ in 0..5 {
            let Progress::Node(node) = engine.choose(0).expect("choose should pass") else {
                panic!("expected a node");
            };
            texts.push(node.body.text());
        }
        texts
    };
    assert_eq!(walk(), walk());
}
