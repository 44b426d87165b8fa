use crate::spec::ids::{data_binding_key, sanitize_name, unique_name};
use crate::spec::{Block, DataBinding, FormBlock, Screen, ScreenAction};
use crate::validator::form_reference;
use ahash::{AHashMap, AHashSet};

/// Rewrites a screen's component tree into exactly one `Form` holding flat leaf blocks.
pub(super) fn wrap_in_single_form(screen: &mut Screen) {
    let already_canonical = matches!(
        screen.components.as_slice(),
        [Block::Form(form)] if !form.children.iter().any(|b| matches!(b, Block::Form(_)))
    );
    if already_canonical {
        return;
    }

    let name = screen
        .components
        .iter()
        .find_map(|b| match b {
            Block::Form(form) if !form.name.trim().is_empty() => Some(form.name.clone()),
            _ => None,
        })
        .unwrap_or_else(|| FormBlock::default().name);

    let mut children = Vec::new();
    flatten_into(std::mem::take(&mut screen.components), &mut children);
    tracing::debug!(screen = %screen.id, "wrapped screen blocks into a single form");
    screen.components = vec![Block::Form(FormBlock { name, children })];
}

fn flatten_into(blocks: Vec<Block>, out: &mut Vec<Block>) {
    for block in blocks {
        match block {
            Block::Form(form) => flatten_into(form.children, out),
            leaf => out.push(leaf),
        }
    }
}

/// The identifier-safe, unused name an input block should carry: its own name
/// sanitized, else its label, else its kind. `None` for non-input blocks.
pub(crate) fn repaired_name(block: &Block, taken: &AHashSet<String>) -> Option<String> {
    let name = block.name()?;
    let mut base = sanitize_name(name);
    if base.is_empty() {
        base = sanitize_name(block.label().unwrap_or_default());
    }
    if base.is_empty() {
        base = block.kind().as_str().to_string();
    }
    Some(unique_name(&base, taken))
}

/// Makes every input name identifier-safe and unique within the screen, and
/// every choice option id non-empty and unique within its block.
///
/// Returns the renames as old name to new name. When several blocks shared
/// an old name, it maps to the first holder's new name.
pub(super) fn repair_names(screen: &mut Screen) -> AHashMap<String, String> {
    let screen_id = screen.id.clone();
    let mut renames: AHashMap<String, String> = AHashMap::new();
    let Some(children) = screen.form_children_mut() else {
        return renames;
    };
    let mut taken: AHashSet<String> = AHashSet::new();

    for block in children.iter_mut() {
        if let Some(fixed) = repaired_name(block, &taken) {
            if let Some(name) = block.name_mut() {
                renames
                    .entry(name.clone())
                    .or_insert_with(|| fixed.clone());
                if *name != fixed {
                    tracing::debug!(screen = %screen_id, from = %name, to = %fixed, "renamed input block");
                    *name = fixed.clone();
                }
            }
            taken.insert(fixed);
        }

        if let Some(options) = block.options_mut() {
            let mut option_ids: AHashSet<String> = AHashSet::new();
            for option in options.iter_mut() {
                let mut base = sanitize_name(&option.id);
                if base.is_empty() {
                    base = sanitize_name(&option.title);
                }
                if base.is_empty() {
                    base = "option".to_string();
                }
                let fixed = unique_name(&base, &option_ids);
                option.id = fixed.clone();
                option_ids.insert(fixed);
            }
        }
    }

    renames.retain(|old, new| old != new);
    renames
}

/// Points `${form.x}` payload references at renamed inputs.
pub(super) fn rename_payload_refs(screen: &mut Screen, renames: &AHashMap<String, String>) {
    let ScreenAction::DataExchange { payload } = &mut screen.action else {
        return;
    };
    for reference in payload.values_mut() {
        let renamed = form_reference(reference).and_then(|field| renames.get(field));
        if let Some(new) = renamed {
            *reference = format!("${{form.{}}}", new);
        }
    }
}

/// Ensures each `${data.<key>}` binding used by the title or a text block has a schema entry.
pub(super) fn ensure_data_bindings(screen: &mut Screen) {
    let mut keys: Vec<String> = Vec::new();
    if let Some(key) = data_binding_key(&screen.title) {
        keys.push(key.to_string());
    }
    crate::spec::for_each_leaf(&screen.components, &mut |block| {
        if let Some(key) = block.text().and_then(data_binding_key) {
            keys.push(key.to_string());
        }
    });
    for key in keys {
        screen
            .data
            .entry(key.clone())
            .or_insert_with(|| DataBinding::string(&key));
    }
}
