use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};
use wool_core::{ErrorKind, WoolError};
use wool_expr::MapEnvironment;
use wool_model::{Command, Dialogue, Node, NodeBody, NodeHeader, NodePointer, Reply};

use super::execute::{execute_root, ExecutionContext};
use crate::store::SharedVariableStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogueState {
    Inactive,
    Active,
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveDialogueOptions {
    pub random_seed: Option<u32>,
}

/// A node after execution: what a presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedNode {
    pub dialogue: String,
    pub header: NodeHeader,
    pub body: NodeBody,
}

impl ExecutedNode {
    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn speaker(&self) -> Option<&str> {
        self.header.speaker.as_deref()
    }
}

/// Outcome of following a node pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Node(ExecutedNode),
    /// Another dialogue takes over; the caller resolves and starts it.
    External(NodePointer),
    Finished,
}

/// Runtime walk over one dialogue: `Inactive`, then `Active` while the
/// current node offers replies, then `Finished` for good.
#[derive(Debug)]
pub struct ActiveDialogue {
    pub(super) dialogue: Rc<Dialogue>,
    pub(super) store: SharedVariableStore,
    pub(super) state: DialogueState,
    pub(super) current: Option<ExecutedNode>,
    pub(super) rng_state: u32,
}

pub(super) fn engine_error(code: &str, message: impl Into<String>) -> WoolError {
    WoolError::new(ErrorKind::EngineState, code, message)
}

impl ActiveDialogue {
    pub fn new(
        dialogue: Rc<Dialogue>,
        store: SharedVariableStore,
        options: ActiveDialogueOptions,
    ) -> Self {
        Self {
            dialogue,
            store,
            state: DialogueState::Inactive,
            current: None,
            rng_state: options.random_seed.unwrap_or(1),
        }
    }

    pub fn dialogue(&self) -> &Rc<Dialogue> {
        &self.dialogue
    }

    pub fn store(&self) -> &SharedVariableStore {
        &self.store
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn current_node(&self) -> Option<&ExecutedNode> {
        self.current.as_ref()
    }

    /// Random state to hand on when another dialogue takes over.
    pub fn random_state(&self) -> u32 {
        self.rng_state
    }

    /// Enters `node_id`, or the start node when `None`.
    pub fn start(&mut self, node_id: Option<&str>) -> Result<ExecutedNode, WoolError> {
        if self.state != DialogueState::Inactive {
            return Err(engine_error(
                "ENGINE_ALREADY_STARTED",
                format!("Dialogue \"{}\" was already started", self.dialogue.name()),
            ));
        }
        let dialogue = Rc::clone(&self.dialogue);
        let node = match node_id {
            Some(node_id) => self.find_node(&dialogue, node_id)?,
            None => dialogue.start_node(),
        };
        debug!("starting dialogue {} at {}", dialogue.name(), node.title());
        self.enter(node)
    }

    /// Runs the commands of a reply on the current node and returns where it
    /// leads. The dialogue does not move until `progress` is called.
    pub fn process_reply(&mut self, reply_id: usize) -> Result<NodePointer, WoolError> {
        let reply = self.current_reply(reply_id)?.clone();
        let mut store = self.store.borrow_mut();
        for command in &reply.commands {
            if let Command::Set(set) = command {
                set.expression.evaluate(&mut *store)?;
            }
        }
        debug!(
            "reply {} processed in {}, next {}",
            reply_id,
            self.dialogue.name(),
            reply.node_pointer
        );
        Ok(reply.node_pointer)
    }

    pub fn progress(&mut self, pointer: &NodePointer) -> Result<Progress, WoolError> {
        self.ensure_active()?;
        if pointer.is_terminal() {
            self.finish();
            return Ok(Progress::Finished);
        }
        match pointer {
            NodePointer::External { dialogue_id, .. } => {
                debug!(
                    "dialogue {} hands over to {}",
                    self.dialogue.name(),
                    dialogue_id
                );
                self.finish();
                Ok(Progress::External(pointer.clone()))
            }
            NodePointer::Internal { node_id } | NodePointer::End { node_id } => {
                let dialogue = Rc::clone(&self.dialogue);
                let node = self.find_node(&dialogue, node_id)?;
                Ok(Progress::Node(self.enter(node)?))
            }
        }
    }

    /// `process_reply` followed by `progress`.
    pub fn choose(&mut self, reply_id: usize) -> Result<Progress, WoolError> {
        let pointer = self.process_reply(reply_id)?;
        self.progress(&pointer)
    }

    /// Executes a node against a copy of the variables; neither the store
    /// nor the random state change.
    pub fn execute_node_stateless(&self, node_id: &str) -> Result<ExecutedNode, WoolError> {
        let node = self.find_node(&self.dialogue, node_id)?;
        let store = self.store.borrow();
        let mut env = MapEnvironment::with_values(store.values().clone(), store.policy());
        drop(store);
        let mut rng_state = self.rng_state;
        let mut context = ExecutionContext {
            env: &mut env,
            rng_state: &mut rng_state,
        };
        let body = execute_root(&node.body, &mut context)?;
        Ok(self.executed(node, body))
    }

    pub(super) fn current_reply(&self, reply_id: usize) -> Result<&Reply, WoolError> {
        self.ensure_active()?;
        let current = self.current.as_ref().ok_or_else(|| {
            engine_error("ENGINE_NOT_ACTIVE", "No node is active")
        })?;
        current.body.find_reply_by_id(reply_id).ok_or_else(|| {
            engine_error(
                "ENGINE_REPLY_NOT_FOUND",
                format!(
                    "Reply {} not found on node \"{}\" of dialogue \"{}\"",
                    reply_id,
                    current.title(),
                    current.dialogue
                ),
            )
        })
    }

    pub(super) fn ensure_active(&self) -> Result<(), WoolError> {
        if self.state == DialogueState::Active {
            Ok(())
        } else {
            Err(engine_error(
                "ENGINE_NOT_ACTIVE",
                format!(
                    "Dialogue \"{}\" is not active ({:?})",
                    self.dialogue.name(),
                    self.state
                ),
            ))
        }
    }

    fn find_node<'d>(&self, dialogue: &'d Dialogue, node_id: &str) -> Result<&'d Node, WoolError> {
        dialogue.node(node_id).ok_or_else(|| {
            WoolError::new(
                ErrorKind::DialogueStructure,
                "ENGINE_NODE_NOT_FOUND",
                format!("Node \"{}\" not found in dialogue \"{}\"", node_id, dialogue.name()),
            )
        })
    }

    fn enter(&mut self, node: &Node) -> Result<ExecutedNode, WoolError> {
        let body = {
            let mut store = self.store.borrow_mut();
            let mut context = ExecutionContext {
                env: &mut *store,
                rng_state: &mut self.rng_state,
            };
            execute_root(&node.body, &mut context)?
        };
        let executed = self.executed(node, body);
        if executed.body.replies().is_empty() {
            self.finish();
        } else {
            self.state = DialogueState::Active;
            debug!(
                "dialogue {} at node {} with {} replies",
                self.dialogue.name(),
                node.title(),
                executed.body.replies().len()
            );
        }
        self.current = Some(executed.clone());
        Ok(executed)
    }

    fn executed(&self, node: &Node, body: NodeBody) -> ExecutedNode {
        ExecutedNode {
            dialogue: self.dialogue.name().to_string(),
            header: node.header.clone(),
            body,
        }
    }

    fn finish(&mut self) {
        if self.state != DialogueState::Finished {
            debug!("dialogue {} finished", self.dialogue.name());
        }
        self.state = DialogueState::Finished;
    }
}
