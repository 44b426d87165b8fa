//! Property tests: normalization holds its guarantees for arbitrary, messy specs.
mod common;
use common::*;
use flowspec::prelude::*;
use flowspec::spec::{ChoiceBlock, ChoiceOption};
use itertools::Itertools;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_id() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["SCREEN_A", "SCREEN_B", "SCREEN_C", " SCREEN_B ", "", "GHOST"])
        .prop_map(str::to_string)
}

fn arb_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["name", "name", "Name!", "", "1st", "age", "plan"])
        .prop_map(str::to_string)
}

fn arb_block() -> impl Strategy<Value = Block> {
    prop_oneof![
        "[a-zA-Z ]{0,12}".prop_map(|text| Block::heading(&text)),
        (arb_name(), "[a-zA-Z ]{0,12}", any::<bool>())
            .prop_map(|(name, label, required)| Block::short_text(&name, &label, required)),
        (arb_name(), prop::collection::vec("[a-z ]{0,6}", 0..4)).prop_map(|(name, titles)| {
            Block::Dropdown(ChoiceBlock {
                name,
                label: "Pick".to_string(),
                required: false,
                options: titles.iter().map(|t| ChoiceOption::new(t, t)).collect(),
            })
        }),
    ]
}

fn arb_action() -> impl Strategy<Value = ScreenAction> {
    prop_oneof![
        Just(ScreenAction::Complete),
        prop::option::of(arb_id()).prop_map(|screen| ScreenAction::Navigate { screen }),
        Just(ScreenAction::DataExchange {
            payload: BTreeMap::new()
        }),
    ]
}

fn arb_screen() -> impl Strategy<Value = Screen> {
    (
        arb_id(),
        "[a-zA-Z ]{0,10}",
        any::<bool>(),
        prop::collection::vec(arb_block(), 0..4),
        arb_action(),
    )
        .prop_map(|(id, title, terminal, blocks, action)| {
            let mut screen = Screen::new(&id, &title);
            screen.terminal = terminal;
            screen.components = blocks;
            screen.action = action;
            screen
        })
}

fn arb_rule() -> impl Strategy<Value = BranchRule> {
    let ops = vec![
        BranchOp::IsFilled,
        BranchOp::Equals,
        BranchOp::Gt,
        BranchOp::IsTrue,
    ];
    (
        arb_name(),
        prop::sample::select(ops),
        prop::option::of("[0-9a-z]{0,3}"),
        prop::option::of(arb_id()),
    )
        .prop_map(|(field, op, value, next)| BranchRule {
            field,
            op,
            value,
            next,
        })
}

fn arb_spec() -> impl Strategy<Value = FlowSpec> {
    (
        prop::collection::vec(arb_screen(), 0..5),
        prop::collection::btree_map(arb_id(), prop::collection::vec(arb_id(), 0..3), 0..4),
        prop::collection::btree_map(arb_id(), prop::option::of(arb_id()), 0..4),
        prop::collection::btree_map(arb_id(), prop::collection::vec(arb_rule(), 0..3), 0..3),
    )
        .prop_map(|(screens, routing_model, default_next_by_screen, branches_by_screen)| {
            FlowSpec {
                screens,
                routing_model,
                default_next_by_screen,
                branches_by_screen,
                ..FlowSpec::default()
            }
        })
}

proptest! {
    #[test]
    fn normalization_is_idempotent(spec in arb_spec()) {
        let once = normalize_spec(spec, FLOW_NAME);
        let twice = normalize_spec(once.clone(), FLOW_NAME);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn routes_only_name_other_existing_screens(spec in arb_spec()) {
        let spec = normalize_spec(spec, FLOW_NAME);
        prop_assert!(!spec.screens.is_empty());
        prop_assert!(spec.screen_ids().all_unique());

        for screen in &spec.screens {
            let route = &spec.routing_model[&screen.id];
            prop_assert!(route.len() <= 1);
            for target in route {
                prop_assert!(spec.has_screen(target));
                prop_assert_ne!(target, &screen.id);
            }
            prop_assert_eq!(spec.default_next(&screen.id), route.first().map(String::as_str));
            if let Some(target) = screen.action.navigate_target() {
                prop_assert_eq!(Some(target), spec.default_next(&screen.id));
            }
            for rule in spec.branches(&screen.id) {
                if let Some(next) = &rule.next {
                    prop_assert!(spec.has_screen(next));
                }
            }
        }
    }

    #[test]
    fn terminal_screens_end_the_flow(spec in arb_spec()) {
        let spec = normalize_spec(spec, FLOW_NAME);
        for screen in spec.screens.iter().filter(|s| s.terminal) {
            prop_assert_eq!(&screen.action, &ScreenAction::Complete);
            prop_assert!(spec.routing_model[&screen.id].is_empty());
            prop_assert!(spec.branches(&screen.id).is_empty());
        }
    }

    #[test]
    fn input_names_are_unique_identifiers(spec in arb_spec()) {
        let spec = normalize_spec(spec, FLOW_NAME);
        for screen in &spec.screens {
            prop_assert_eq!(screen.components.len(), 1);
            let names: Vec<&str> = screen.inputs().iter().filter_map(|b| b.name()).collect();
            prop_assert!(names.iter().all_unique());
            for name in names {
                prop_assert!(!name.is_empty());
                prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            }
        }
    }

    #[test]
    fn compiled_routing_covers_every_screen(spec in arb_spec()) {
        let spec = normalize_spec(spec, FLOW_NAME);
        let compiled = compile(&spec);
        let routed: Vec<&String> = compiled["routing_model"]
            .as_object()
            .map(|m| m.keys().collect())
            .unwrap_or_default();
        prop_assert_eq!(routed.len(), spec.screens.len());
        prop_assert_eq!(compiled["screens"].as_array().map(Vec::len), Some(spec.screens.len()));
    }
}
