use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use log::debug;
use thiserror::Error;
use wool_core::{ErrorKind, ErrorList, WoolError};
use wool_model::{Dialogue, NodePointer};

use crate::dialogue::{missing_node_error, parse_dialogue};

pub const SCRIPT_EXTENSION: &str = ".wool";

/// Every dialogue of a script folder, keyed case-insensitively by its path
/// without the extension.
#[derive(Debug, Clone, Default)]
pub struct Project {
    dialogues: BTreeMap<String, Rc<Dialogue>>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dialogue: Dialogue) {
        self.dialogues
            .insert(dialogue.name().to_ascii_lowercase(), Rc::new(dialogue));
    }

    pub fn dialogue(&self, name: &str) -> Option<Rc<Dialogue>> {
        self.dialogues.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn dialogues(&self) -> impl Iterator<Item = &Rc<Dialogue>> {
        self.dialogues.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.dialogues
            .values()
            .map(|dialogue| dialogue.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dialogues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogues.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.dialogues
            .values()
            .map(|dialogue| dialogue.nodes().len())
            .sum()
    }
}

/// Errors of a project parse grouped by source file.
#[derive(Debug, Clone, Default, PartialEq, Error)]
pub struct ProjectErrors {
    pub files: BTreeMap<String, ErrorList>,
}

impl ProjectErrors {
    pub fn len(&self) -> usize {
        self.files.values().map(ErrorList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(ErrorList::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WoolError)> {
        self.files
            .iter()
            .flat_map(|(file, errors)| errors.iter().map(move |error| (file.as_str(), error)))
    }

    fn push(&mut self, file: &str, error: WoolError) {
        self.files.entry(file.to_string()).or_default().push(error);
    }
}

impl fmt::Display for ProjectErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (file, error)) in self.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", file, error.describe())?;
        }
        Ok(())
    }
}

impl From<ProjectErrors> for WoolError {
    fn from(errors: ProjectErrors) -> Self {
        let count = errors.len();
        let summary = errors.to_string();
        match errors.iter().next() {
            Some((_, first)) if count == 1 => {
                let mut error = first.clone();
                error.message = summary;
                error
            }
            Some((_, first)) => WoolError {
                kind: first.kind,
                code: first.code.clone(),
                message: format!("{} errors found:\n{}", count, summary),
                span: first.span,
            },
            None => WoolError::new(ErrorKind::Parse, "PARSE_ERRORS", "No errors recorded"),
        }
    }
}

/// Dialogue name of a script path: `/` separators, no extension.
pub fn dialogue_name_from_path(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let name = normalized.strip_suffix(SCRIPT_EXTENSION)?;
    Some(name.trim_start_matches("./").to_string())
}

/// Parses every `.wool` entry of `files` (path to source) and checks that
/// external pointers land on existing dialogues and nodes.
pub fn parse_project(files: &BTreeMap<String, String>) -> Result<Project, ProjectErrors> {
    let mut project = Project::new();
    let mut errors = ProjectErrors::default();
    let mut paths: BTreeMap<String, String> = BTreeMap::new();
    let mut failed: BTreeSet<String> = BTreeSet::new();

    for (path, source) in files {
        let Some(name) = dialogue_name_from_path(path) else {
            continue;
        };
        match parse_dialogue(&name, source) {
            Ok(dialogue) => {
                paths.insert(name.to_ascii_lowercase(), path.clone());
                project.insert(dialogue);
            }
            Err(list) => {
                failed.insert(name.to_ascii_lowercase());
                for error in list.errors {
                    errors.push(path, error);
                }
            }
        }
    }

    for dialogue in project.dialogues() {
        let Some(path) = paths.get(&dialogue.name().to_ascii_lowercase()) else {
            continue;
        };
        for node in dialogue.nodes() {
            for pointer in node.body.node_pointers() {
                let NodePointer::External { dialogue_id, .. } = &pointer else {
                    continue;
                };
                match project.dialogue(dialogue_id) {
                    None if failed.contains(&dialogue_id.to_ascii_lowercase()) => {}
                    None => errors.push(
                        path,
                        WoolError::new(
                            ErrorKind::DialogueStructure,
                            "DIALOGUE_UNKNOWN_REFERENCE",
                            format!(
                                "Node \"{}\" in dialogue \"{}\" points to unknown dialogue \"{}\"",
                                node.title(),
                                dialogue.name(),
                                dialogue_id
                            ),
                        ),
                    ),
                    Some(target)
                        if !pointer.is_terminal() && target.node(pointer.node_id()).is_none() =>
                    {
                        errors.push(path, missing_node_error(dialogue.name(), node.title(), &pointer));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    debug!(
        "parsed project with {} dialogues and {} errors",
        project.len(),
        errors.len()
    );
    if errors.is_empty() {
        Ok(project)
    } else {
        Err(errors)
    }
}
