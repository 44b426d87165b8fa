use crate::error::EditorError;
use crate::normalizer::{Normalizer, repaired_name};
use crate::spec::ids::next_screen_id;
use crate::spec::{Block, BranchRule, DataBinding, FlowSpec, Screen, ScreenAction};
use crate::validator::validate;
use ahash::AHashSet;
use serde_json::Value;

/// The in-memory spec of one editing session.
///
/// Every mutation is applied to a copy, re-normalized and only then committed,
/// so the state never holds a non-canonical spec between user actions. The
/// issue list is recomputed after each committed change.
#[derive(Debug, Clone)]
pub struct EditorState {
    normalizer: Normalizer,
    spec: FlowSpec,
    issues: Vec<String>,
    revision: u64,
}

impl EditorState {
    pub fn new(spec: FlowSpec, flow_name: &str) -> Self {
        let normalizer = Normalizer::new(flow_name);
        let spec = normalizer.normalize_spec(spec);
        let issues = validate(&spec);
        Self {
            normalizer,
            spec,
            issues,
            revision: 0,
        }
    }

    /// Starts a session from a stored spec in any accepted shape.
    pub fn from_raw(raw: &Value, flow_name: &str) -> Self {
        let normalizer = Normalizer::new(flow_name);
        let spec = normalizer.normalize(raw);
        let issues = validate(&spec);
        Self {
            normalizer,
            spec,
            issues,
            revision: 0,
        }
    }

    pub fn spec(&self) -> &FlowSpec {
        &self.spec
    }

    pub fn flow_name(&self) -> &str {
        self.normalizer.flow_name()
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Bumped by every committed mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn apply<T>(
        &mut self,
        change: impl FnOnce(&mut FlowSpec) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        let mut draft = self.spec.clone();
        let out = change(&mut draft)?;
        self.spec = self.normalizer.normalize_spec(draft);
        self.issues = validate(&self.spec);
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            issues = self.issues.len(),
            "flow spec updated"
        );
        Ok(out)
    }

    // --- Blocks ---

    /// Inserts a block into a screen's form, at the end when `index` is `None`.
    /// Returns the position it ended up at.
    ///
    /// A name already used on the screen gets a suffix on the incoming block,
    /// so existing blocks and the rules that reference them keep their names.
    pub fn add_block(
        &mut self,
        screen_id: &str,
        block: Block,
        index: Option<usize>,
    ) -> Result<usize, EditorError> {
        self.apply(|spec| {
            let children = form_children(spec, screen_id)?;
            let at = index.unwrap_or(children.len()).min(children.len());
            let block = claim_name(children, None, block);
            children.insert(at, block);
            Ok(at)
        })
    }

    pub fn update_block(
        &mut self,
        screen_id: &str,
        index: usize,
        block: Block,
    ) -> Result<(), EditorError> {
        self.apply(|spec| {
            let children = form_children(spec, screen_id)?;
            if index >= children.len() {
                return Err(out_of_range(screen_id, index));
            }
            let block = claim_name(children, Some(index), block);
            children[index] = block;
            Ok(())
        })
    }

    pub fn remove_block(&mut self, screen_id: &str, index: usize) -> Result<Block, EditorError> {
        self.apply(|spec| {
            let children = form_children(spec, screen_id)?;
            if index >= children.len() {
                return Err(out_of_range(screen_id, index));
            }
            Ok(children.remove(index))
        })
    }

    pub fn move_block(&mut self, screen_id: &str, from: usize, to: usize) -> Result<(), EditorError> {
        self.apply(|spec| {
            let children = form_children(spec, screen_id)?;
            if from >= children.len() {
                return Err(out_of_range(screen_id, from));
            }
            if to >= children.len() {
                return Err(out_of_range(screen_id, to));
            }
            let block = children.remove(from);
            children.insert(to, block);
            Ok(())
        })
    }

    // --- Screens ---

    /// Appends a terminal screen. If the previous last screen was terminal it
    /// now navigates to the new one. Returns the new screen id.
    pub fn add_screen(&mut self, title: &str) -> Result<String, EditorError> {
        self.apply(|spec| {
            let id = next_screen_id(spec.screen_ids());
            let previous_last = spec
                .screens
                .last()
                .filter(|s| s.terminal)
                .map(|s| s.id.clone());
            spec.screens.push(Screen::new(&id, title));
            if let Some(previous) = previous_last {
                spec.set_successor(&previous, Some(id.clone()));
            }
            Ok(id)
        })
    }

    /// Removes a screen and clears every route, default and branch target that
    /// pointed at it.
    pub fn remove_screen(&mut self, screen_id: &str) -> Result<Screen, EditorError> {
        self.apply(|spec| {
            let index = spec
                .screen_index(screen_id)
                .ok_or_else(|| EditorError::ScreenNotFound(screen_id.to_string()))?;
            if spec.screens.len() == 1 {
                return Err(EditorError::LastScreen(screen_id.to_string()));
            }
            let removed = spec.screens.remove(index);

            let pointing: Vec<String> = spec
                .screens
                .iter()
                .filter(|s| {
                    s.action.navigate_target() == Some(screen_id)
                        || spec.default_next(&s.id) == Some(screen_id)
                        || spec
                            .routing_model
                            .get(&s.id)
                            .is_some_and(|r| r.iter().any(|t| t == screen_id))
                })
                .map(|s| s.id.clone())
                .collect();
            for id in pointing {
                spec.set_successor(&id, None);
            }
            for rules in spec.branches_by_screen.values_mut() {
                for rule in rules.iter_mut() {
                    if rule.next.as_deref() == Some(screen_id) {
                        rule.next = None;
                    }
                }
            }
            spec.routing_model.remove(screen_id);
            spec.default_next_by_screen.remove(screen_id);
            spec.branches_by_screen.remove(screen_id);
            Ok(removed)
        })
    }

    pub fn move_screen(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        self.apply(|spec| {
            let len = spec.screens.len();
            if from >= len || to >= len {
                return Err(EditorError::ScreenIndexOutOfRange {
                    index: from.max(to),
                    len,
                });
            }
            let screen = spec.screens.remove(from);
            spec.screens.insert(to, screen);
            Ok(())
        })
    }

    pub fn set_title(&mut self, screen_id: &str, title: &str) -> Result<(), EditorError> {
        self.apply(|spec| {
            screen_mut(spec, screen_id)?.title = title.to_string();
            Ok(())
        })
    }

    /// Marks a screen terminal, or reopens it. A reopened screen without a
    /// successor continues to the screen after it, if there is one.
    pub fn set_terminal(&mut self, screen_id: &str, terminal: bool) -> Result<(), EditorError> {
        self.apply(|spec| {
            let index = spec
                .screen_index(screen_id)
                .ok_or_else(|| EditorError::ScreenNotFound(screen_id.to_string()))?;
            if terminal {
                spec.screens[index].terminal = true;
                return Ok(());
            }
            spec.screens[index].terminal = false;
            if spec.default_next(screen_id).is_none() {
                let following = spec.screens.get(index + 1).map(|s| s.id.clone());
                if following.is_some() {
                    spec.set_successor(screen_id, following);
                }
            }
            Ok(())
        })
    }

    pub fn set_action(&mut self, screen_id: &str, action: ScreenAction) -> Result<(), EditorError> {
        self.apply(|spec| {
            match action {
                ScreenAction::Navigate { screen } => {
                    let current = screen_mut(spec, screen_id)?;
                    current.terminal = false;
                    current.action = ScreenAction::Navigate { screen: None };
                    spec.set_successor(screen_id, screen);
                }
                ScreenAction::DataExchange { payload } => {
                    let screen = screen_mut(spec, screen_id)?;
                    screen.terminal = false;
                    screen.action = ScreenAction::DataExchange { payload };
                }
                ScreenAction::Complete => {
                    let screen = screen_mut(spec, screen_id)?;
                    screen.terminal = true;
                    screen.action = ScreenAction::Complete;
                }
            }
            Ok(())
        })
    }

    /// Replaces a screen's branch rules. Rules on a terminal screen reopen it.
    pub fn set_branch_rules(
        &mut self,
        screen_id: &str,
        rules: Vec<BranchRule>,
    ) -> Result<(), EditorError> {
        self.apply(|spec| {
            let screen = screen_mut(spec, screen_id)?;
            if !rules.is_empty() && screen.terminal {
                screen.terminal = false;
                screen.action = ScreenAction::Navigate { screen: None };
            }
            spec.branches_by_screen.insert(screen_id.to_string(), rules);
            Ok(())
        })
    }

    pub fn set_default_next(
        &mut self,
        screen_id: &str,
        next: Option<String>,
    ) -> Result<(), EditorError> {
        self.apply(|spec| {
            screen_mut(spec, screen_id)?;
            spec.set_successor(screen_id, next);
            Ok(())
        })
    }

    /// Sets the preview value of a `${data.<key>}` binding.
    pub fn set_data_example(
        &mut self,
        screen_id: &str,
        key: &str,
        example: Value,
    ) -> Result<(), EditorError> {
        self.apply(|spec| {
            let screen = screen_mut(spec, screen_id)?;
            screen
                .data
                .entry(key.to_string())
                .or_insert_with(|| DataBinding::string(key))
                .example = example;
            Ok(())
        })
    }
}

fn screen_mut<'a>(spec: &'a mut FlowSpec, screen_id: &str) -> Result<&'a mut Screen, EditorError> {
    spec.screen_mut(screen_id)
        .ok_or_else(|| EditorError::ScreenNotFound(screen_id.to_string()))
}

fn form_children<'a>(
    spec: &'a mut FlowSpec,
    screen_id: &str,
) -> Result<&'a mut Vec<Block>, EditorError> {
    screen_mut(spec, screen_id)?
        .form_children_mut()
        .ok_or_else(|| EditorError::MissingForm(screen_id.to_string()))
}

/// Gives an incoming input block a name unused by its siblings, skipping the
/// slot it replaces.
fn claim_name(children: &[Block], replacing: Option<usize>, mut block: Block) -> Block {
    let taken: AHashSet<String> = children
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != replacing)
        .filter_map(|(_, b)| b.name())
        .map(str::to_string)
        .collect();
    if let Some(fixed) = repaired_name(&block, &taken) {
        if let Some(name) = block.name_mut() {
            *name = fixed;
        }
    }
    block
}

fn out_of_range(screen_id: &str, index: usize) -> EditorError {
    EditorError::BlockIndexOutOfRange {
        screen_id: screen_id.to_string(),
        index,
    }
}
