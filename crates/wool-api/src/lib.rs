use std::collections::BTreeMap;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};
use wool_core::{ErrorKind, Value, WoolError};
use wool_expr::UnknownVariablePolicy;
use wool_model::{Dialogue, NodePointer, Reply, ReplyKind};
use wool_parser::{parse_project, Project};
use wool_runtime::{
    ActiveDialogue, ActiveDialogueOptions, DialogueSnapshot, DialogueState, ExecutedNode,
    Progress, SharedVariableStore, VariableSource, VariableStore,
};

pub const DEFAULT_ENTRY_DIALOGUE: &str = "main";
pub const SESSION_SNAPSHOT_SCHEMA: &str = "wool-session.v1";

/// Looks up the dialogue an external pointer names.
pub trait DialogueResolver {
    fn resolve_dialogue(&self, dialogue_id: &str) -> Option<Rc<Dialogue>>;
}

impl DialogueResolver for Project {
    fn resolve_dialogue(&self, dialogue_id: &str) -> Option<Rc<Dialogue>> {
        self.dialogue(dialogue_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateSessionOptions {
    pub sources: BTreeMap<String, String>,
    pub entry_dialogue: Option<String>,
    pub start_node: Option<String>,
    pub random_seed: Option<u32>,
    pub unknown_variables: UnknownVariablePolicy,
    pub variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ResumeSessionOptions {
    pub sources: BTreeMap<String, String>,
    pub snapshot: SessionSnapshot,
    pub unknown_variables: UnknownVariablePolicy,
}

/// Persisted session: where the dialogue stands and every variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub schema_version: String,
    pub dialogue: DialogueSnapshot,
    pub variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Node(ExecutedNode),
    Finished,
}

/// What a client shows for a reply: the statement text, with input fields
/// in source form, or nothing for an auto-forward reply.
pub fn reply_label(reply: &Reply) -> String {
    match (&reply.statement, reply.kind()) {
        (Some(statement), ReplyKind::Input) => statement.to_string(),
        (Some(statement), _) => statement.text(),
        (None, _) => String::new(),
    }
}

pub fn parse_project_from_sources(
    sources: &BTreeMap<String, String>,
) -> Result<Project, WoolError> {
    parse_project(sources).map_err(WoolError::from)
}

/// Explicit entry, else `main`, else the only dialogue of the project.
pub fn resolve_entry_dialogue(
    project: &Project,
    explicit: Option<&str>,
) -> Result<Rc<Dialogue>, WoolError> {
    if let Some(entry) = explicit {
        return project.dialogue(entry).ok_or_else(|| {
            WoolError::new(
                ErrorKind::DialogueStructure,
                "API_ENTRY_DIALOGUE_NOT_FOUND",
                format!("Entry dialogue \"{}\" is not in the project.", entry),
            )
        });
    }
    if let Some(main) = project.dialogue(DEFAULT_ENTRY_DIALOGUE) {
        return Ok(main);
    }
    let mut dialogues = project.dialogues();
    match (dialogues.next(), dialogues.next()) {
        (Some(only), None) => Ok(Rc::clone(only)),
        _ => Err(WoolError::new(
            ErrorKind::DialogueStructure,
            "API_ENTRY_MAIN_NOT_FOUND",
            "Expected a dialogue named \"main\" as default entry.",
        )),
    }
}

pub fn create_session(options: CreateSessionOptions) -> Result<DialogueSession, WoolError> {
    let project = parse_project_from_sources(&options.sources)?;
    let entry = resolve_entry_dialogue(&project, options.entry_dialogue.as_deref())?;
    let store = VariableStore::with_values(options.variables, options.unknown_variables).shared();
    let mut session = DialogueSession::new(
        Rc::new(project),
        entry,
        store,
        ActiveDialogueOptions {
            random_seed: options.random_seed,
        },
    );
    session.start(options.start_node.as_deref())?;
    Ok(session)
}

pub fn resume_session(options: ResumeSessionOptions) -> Result<DialogueSession, WoolError> {
    let project = parse_project_from_sources(&options.sources)?;
    DialogueSession::resume(Rc::new(project), options.snapshot, options.unknown_variables)
}

/// A player's walk through a project. External pointers are followed into
/// the target dialogue, sharing variables and random state.
pub struct DialogueSession {
    resolver: Rc<dyn DialogueResolver>,
    store: SharedVariableStore,
    active: ActiveDialogue,
}

impl DialogueSession {
    pub fn new(
        resolver: Rc<dyn DialogueResolver>,
        dialogue: Rc<Dialogue>,
        store: SharedVariableStore,
        options: ActiveDialogueOptions,
    ) -> Self {
        let active = ActiveDialogue::new(dialogue, Rc::clone(&store), options);
        Self {
            resolver,
            store,
            active,
        }
    }

    pub fn resume(
        resolver: Rc<dyn DialogueResolver>,
        snapshot: SessionSnapshot,
        unknown_variables: UnknownVariablePolicy,
    ) -> Result<Self, WoolError> {
        if snapshot.schema_version != SESSION_SNAPSHOT_SCHEMA {
            return Err(WoolError::new(
                ErrorKind::EngineState,
                "API_SNAPSHOT_SCHEMA",
                format!(
                    "Unsupported session schema \"{}\", expected \"{}\"",
                    snapshot.schema_version, SESSION_SNAPSHOT_SCHEMA
                ),
            ));
        }
        let dialogue = resolve_dialogue(resolver.as_ref(), &snapshot.dialogue.dialogue)?;
        let store = VariableStore::with_values(snapshot.variables, unknown_variables).shared();
        let active = ActiveDialogue::resume(dialogue, Rc::clone(&store), snapshot.dialogue)?;
        Ok(Self {
            resolver,
            store,
            active,
        })
    }

    pub fn start(&mut self, node_id: Option<&str>) -> Result<ExecutedNode, WoolError> {
        self.active.start(node_id)
    }

    /// Chooses a reply and follows it, across dialogues when needed.
    pub fn choose(&mut self, reply_id: usize) -> Result<SessionEvent, WoolError> {
        match self.active.choose(reply_id)? {
            Progress::Node(node) => Ok(SessionEvent::Node(node)),
            Progress::Finished => Ok(SessionEvent::Finished),
            Progress::External(pointer) => self.hand_over(&pointer),
        }
    }

    pub fn store_input(
        &mut self,
        reply_id: usize,
        values: &BTreeMap<String, Value>,
    ) -> Result<(), WoolError> {
        self.active.store_reply_input(reply_id, values)
    }

    pub fn user_statement(&self, reply_id: usize) -> Result<String, WoolError> {
        self.active.user_statement_from_reply_id(reply_id)
    }

    /// Writes a variable from outside the scripts.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.store
            .borrow_mut()
            .set_value(name, value, VariableSource::External);
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.store.borrow().values().clone()
    }

    pub fn store(&self) -> &SharedVariableStore {
        &self.store
    }

    pub fn dialogue(&self) -> &Rc<Dialogue> {
        self.active.dialogue()
    }

    pub fn current_node(&self) -> Option<&ExecutedNode> {
        self.active.current_node()
    }

    pub fn state(&self) -> DialogueState {
        self.active.state()
    }

    pub fn is_finished(&self) -> bool {
        self.active.state() == DialogueState::Finished
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, WoolError> {
        Ok(SessionSnapshot {
            schema_version: SESSION_SNAPSHOT_SCHEMA.to_string(),
            dialogue: self.active.snapshot()?,
            variables: self.variables(),
        })
    }

    fn hand_over(&mut self, pointer: &NodePointer) -> Result<SessionEvent, WoolError> {
        let Some(dialogue_id) = pointer.dialogue_id() else {
            return Ok(SessionEvent::Finished);
        };
        let dialogue = resolve_dialogue(self.resolver.as_ref(), dialogue_id)?;
        debug!("session continues in {} at {}", dialogue.name(), pointer.node_id());
        let mut next = ActiveDialogue::new(
            dialogue,
            Rc::clone(&self.store),
            ActiveDialogueOptions {
                random_seed: Some(self.active.random_state()),
            },
        );
        let node = next.start(Some(pointer.node_id()))?;
        self.active = next;
        Ok(SessionEvent::Node(node))
    }
}

fn resolve_dialogue(
    resolver: &dyn DialogueResolver,
    dialogue_id: &str,
) -> Result<Rc<Dialogue>, WoolError> {
    resolver.resolve_dialogue(dialogue_id).ok_or_else(|| {
        WoolError::new(
            ErrorKind::DialogueStructure,
            "API_DIALOGUE_NOT_FOUND",
            format!("Dialogue \"{}\" is not in the project.", dialogue_id),
        )
    })
}

#[cfg(test)]
mod session_tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    const MAIN: &str = "\
title: Start
---
Hello $name.
[[Visit the town|town.Square|<<set $visits = $visits + 1>>]]
[[Stay|end]]
===
";

    const TOWN: &str = "\
title: Square
speaker: Guard
---
Visit number $visits.
[[Back|main.Start]]
[[Done|end]]
===
";

    fn options(sources: BTreeMap<String, String>) -> CreateSessionOptions {
        CreateSessionOptions {
            sources,
            variables: BTreeMap::from([
                ("name".to_string(), Value::from("Ann")),
                ("visits".to_string(), Value::Int(0)),
            ]),
            random_seed: Some(3),
            ..CreateSessionOptions::default()
        }
    }

    fn node_text(event: &SessionEvent) -> String {
        match event {
            SessionEvent::Node(node) => node.body.text(),
            SessionEvent::Finished => panic!("expected a node"),
        }
    }

    #[test]
    fn reply_labels_follow_the_reply_kind() {
        let project = parse_project_from_sources(&map(&[(
            "main.wool",
            "title: Start\n---\n[[Next]]\n[[Hi $name|Next]]\n[[Me: <<input type=\"text\" value=\"$name\">>|Next]]\n===\ntitle: Next\n---\nx\n===\n",
        )]))
        .expect("project should parse");
        let dialogue = project.dialogue("main").expect("main dialogue");
        let labels: Vec<String> = dialogue
            .start_node()
            .body
            .replies()
            .iter()
            .map(reply_label)
            .collect();
        assert_eq!(labels[0], "");
        assert_eq!(labels[1], "Hi $name");
        assert!(labels[2].contains("<<input type=\"text\" value=\"$name\">>"));
    }

    #[test]
    fn resolve_entry_prefers_explicit_then_main_then_single() {
        let project = parse_project_from_sources(&map(&[
            ("main.wool", MAIN),
            ("town.wool", TOWN),
        ]))
        .expect("project should parse");
        assert_eq!(resolve_entry_dialogue(&project, None).expect("main").name(), "main");
        assert_eq!(
            resolve_entry_dialogue(&project, Some("TOWN")).expect("explicit").name(),
            "town"
        );
        let error = resolve_entry_dialogue(&project, Some("missing")).expect_err("missing entry");
        assert_eq!(error.code, "API_ENTRY_DIALOGUE_NOT_FOUND");

        let single = parse_project_from_sources(&map(&[("intro.wool", "title: A\n---\nHi\n===\n")]))
            .expect("project should parse");
        assert_eq!(resolve_entry_dialogue(&single, None).expect("single").name(), "intro");
    }

    #[test]
    fn resolve_entry_without_main_fails() {
        let project = parse_project_from_sources(&map(&[
            ("a.wool", "title: A\n---\nHi\n===\n"),
            ("b.wool", "title: B\n---\nHi\n===\n"),
        ]))
        .expect("project should parse");
        let error = resolve_entry_dialogue(&project, None).expect_err("no default entry");
        assert_eq!(error.code, "API_ENTRY_MAIN_NOT_FOUND");
    }

    #[test]
    fn parse_errors_are_reported_together() {
        let error = parse_project_from_sources(&map(&[
            ("main.wool", "title: Start\n---\n[[Nowhere]]\n===\n"),
            ("other.wool", "title: bad title\n---\nHi\n===\n"),
        ]))
        .err()
        .expect("project should fail");
        assert!(error.message.starts_with("2 errors found"));
    }

    #[test]
    fn session_follows_external_pointers() {
        let mut session = create_session(options(map(&[
            ("main.wool", MAIN),
            ("town.wool", TOWN),
        ])))
        .expect("session should start");
        assert_eq!(
            session.current_node().map(|node| node.body.text()).as_deref(),
            Some("Hello Ann.")
        );

        let event = session.choose(0).expect("choose should pass");
        assert_eq!(node_text(&event), "Visit number 1.");
        assert_eq!(session.dialogue().name(), "town");
        assert_eq!(session.current_node().and_then(ExecutedNode::speaker), Some("Guard"));

        let event = session.choose(0).expect("back should pass");
        assert_eq!(node_text(&event), "Hello Ann.");
        assert_eq!(session.dialogue().name(), "main");

        assert_eq!(session.choose(1).expect("stay should pass"), SessionEvent::Finished);
        assert!(session.is_finished());
        assert_eq!(session.variables().get("visits"), Some(&Value::Int(1)));
    }

    #[test]
    fn session_shares_dialogues_with_its_project() {
        let project = Rc::new(
            parse_project_from_sources(&map(&[("main.wool", MAIN), ("town.wool", TOWN)]))
                .expect("project should parse"),
        );
        let main = project.dialogue("main").expect("main should exist");
        let town = project.dialogue("town").expect("town should exist");
        let resolver: Rc<dyn DialogueResolver> = project.clone();
        let store = VariableStore::with_values(
            BTreeMap::from([("visits".to_string(), Value::Int(0))]),
            UnknownVariablePolicy::Null,
        )
        .shared();
        let mut session = DialogueSession::new(
            resolver,
            Rc::clone(&main),
            Rc::clone(&store),
            ActiveDialogueOptions::default(),
        );
        session.start(None).expect("session should start");
        assert!(Rc::ptr_eq(session.dialogue(), &main));

        session.choose(0).expect("choose should pass");
        assert!(Rc::ptr_eq(session.dialogue(), &town));
        assert!(Rc::ptr_eq(session.store(), &store));
        assert_eq!(store.borrow().value("visits"), Some(&Value::Int(1)));
    }

    #[test]
    fn session_snapshot_resumes_with_variables() {
        let sources = map(&[("main.wool", MAIN), ("town.wool", TOWN)]);
        let mut session = create_session(options(sources.clone())).expect("session should start");
        session.choose(0).expect("choose should pass");
        session.set_variable("name", Value::from("Bo"));
        let snapshot = session.snapshot().expect("snapshot should pass");
        let json = serde_json::to_string(&snapshot).expect("snapshot should serialize");
        let snapshot: SessionSnapshot = serde_json::from_str(&json).expect("snapshot should parse");

        let mut resumed = resume_session(ResumeSessionOptions {
            sources,
            snapshot,
            unknown_variables: UnknownVariablePolicy::Null,
        })
        .expect("resume should pass");
        assert_eq!(resumed.dialogue().name(), "town");
        let event = resumed.choose(0).expect("back should pass");
        assert_eq!(node_text(&event), "Hello Bo.");
    }

    #[test]
    fn resume_rejects_unknown_schema() {
        let mut session = create_session(options(map(&[("main.wool", MAIN), ("town.wool", TOWN)])))
            .expect("session should start");
        let mut snapshot = session.snapshot().expect("snapshot should pass");
        snapshot.schema_version = "other".to_string();
        let error = DialogueSession::resume(
            Rc::new(Project::new()),
            snapshot,
            UnknownVariablePolicy::Null,
        )
        .err()
        .expect("schema should be rejected");
        assert_eq!(error.code, "API_SNAPSHOT_SCHEMA");
        assert_eq!(session.choose(1).expect("stay"), SessionEvent::Finished);
    }

    #[test]
    fn strict_variables_fail_on_unknown_reads() {
        let error = create_session(CreateSessionOptions {
            sources: map(&[("main.wool", "title: Start\n---\nHello $name.\n===\n")]),
            unknown_variables: UnknownVariablePolicy::Fail,
            ..CreateSessionOptions::default()
        })
        .err()
        .expect("unknown variable should fail");
        assert_eq!(error.code, "EVAL_UNKNOWN_VARIABLE");
    }
}
