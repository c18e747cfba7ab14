//! Property-based tests for rendering and re-reading pipeline arguments.
//!
//! # Invariants tested
//!
//! - **Token round-trip:** rendered scalar, list and positional values split
//!   back into the values they were rendered from.
//! - **Line round-trip:** a rendered token line splits back into its tokens.
//! - **Command round-trip:** a rendered command compiles to an equal command.

use camino::Utf8PathBuf;
use proptest::prelude::*;
use proptest::sample::subsequence;
use routeforge_core::{ContractionRegistry, VehicleRegistry};
use routeforge_pipeline::command::{BoundingBox, Features, ReadPbf, WriteGraph, WriteSummary};
use routeforge_pipeline::tokenizer::{
    Parameter, key_value, parse_parameter, render_list, render_value, split_line,
};
use routeforge_pipeline::{Command, CommandRegistry, compile};

/// Values the tokenizer can represent: anything but a value that needs quoting
/// and holds both quote characters.
fn value() -> impl Strategy<Value = String> {
    "[a-z0-9 ,=\"'._/-]{0,12}".prop_filter("both quote kinds", |value| {
        !(value.contains('"') && value.contains('\''))
    })
}

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,7}"
}

fn path() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ._-]{0,10}"
}

fn recompile(command: &Command) -> Vec<Command> {
    let line = command.to_string();
    let tokens = split_line(&line).expect("rendered lines split");
    compile(&CommandRegistry::with_builtin_commands(), &tokens).expect("rendered commands compile")
}

fn write_graph() -> impl Strategy<Value = WriteGraph> {
    let vehicles = subsequence(vec!["car", "bicycle", "pedestrian"], 1..=3).prop_shuffle();
    let contract = subsequence(vec!["car", "car.shortest", "bicycle", "pedestrian.shortest"], 0..=2);
    (path(), vehicles, contract, proptest::option::of(path())).prop_map(
        |(graph, vehicles, contract, map)| {
            let vehicle_registry = VehicleRegistry::builtin();
            let contraction_registry = ContractionRegistry::builtin();
            WriteGraph {
                graph: Utf8PathBuf::from(format!("graph-{graph}")),
                vehicles: vehicles
                    .iter()
                    .map(|name| vehicle_registry.get(name).expect("built-in vehicle"))
                    .collect(),
                contract: contract
                    .iter()
                    .map(|name| contraction_registry.get(name).expect("built-in profile"))
                    .collect(),
                map: map.map(|map| Utf8PathBuf::from(format!("map-{map}"))),
            }
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: a rendered list value splits back into the same items.
    #[test]
    fn list_values_round_trip(key in key(), items in prop::collection::vec(value(), 1..4)) {
        let token = format!("{key}={}", render_list(&items));
        let pair = key_value(&token).expect("rendered pairs split");
        prop_assert_eq!(pair.key(), key.as_str());
        prop_assert_eq!(pair.values().expect("rendered lists split"), items);
    }

    /// Property: a rendered scalar keeps `=`, `,` and whitespace verbatim.
    #[test]
    fn scalar_values_round_trip(key in key(), value in value()) {
        let token = format!("{key}={}", render_value(&value));
        let pair = key_value(&token).expect("rendered pairs split");
        prop_assert_eq!(pair.value().expect("rendered scalars unquote"), value);
    }

    /// Property: a rendered positional value is never read as a pair.
    #[test]
    fn positional_values_round_trip(value in value()) {
        let rendered = render_value(&value);
        prop_assert!(!rendered.starts_with("--"));
        match parse_parameter(&rendered).expect("rendered values parse") {
            Parameter::Positional(parsed) => prop_assert_eq!(parsed, value),
            Parameter::KeyValue(pair) => prop_assert!(false, "read as pair {:?}", pair),
        }
    }

    /// Property: joining rendered tokens with spaces and splitting the line
    /// recovers the tokens.
    #[test]
    fn rendered_lines_split_into_their_tokens(
        pairs in prop::collection::vec((key(), prop::collection::vec(value(), 1..3)), 0..4),
        positional in value(),
    ) {
        let mut tokens = vec!["--switch".to_owned(), render_value(&positional)];
        tokens.extend(pairs.iter().map(|(key, items)| format!("{key}={}", render_list(items))));
        prop_assert_eq!(split_line(&tokens.join(" ")).expect("split"), tokens);
    }

    /// Property: write-graph commands survive rendering and recompiling.
    #[test]
    fn write_graph_commands_round_trip(command in write_graph()) {
        let command = Command::WriteGraph(command);
        prop_assert_eq!(recompile(&command), vec![command]);
    }

    /// Property: bounding boxes survive rendering and recompiling.
    #[test]
    fn bounding_boxes_round_trip(
        left in -180.0_f64..0.0,
        right in 0.0_f64..180.0,
        bottom in -90.0_f64..0.0,
        top in 0.0_f64..90.0,
    ) {
        let command = Command::BoundingBox(BoundingBox { left, bottom, right, top });
        prop_assert_eq!(recompile(&command), vec![command]);
    }

    /// Property: path and key list commands survive rendering and recompiling.
    #[test]
    fn path_commands_round_trip(
        input in path(),
        output in path(),
        keys in prop::collection::vec("[a-z][a-z:_]{0,7}", 0..3),
        map in prop::option::of(path()),
    ) {
        for command in [
            Command::ReadPbf(ReadPbf { path: input.clone().into() }),
            Command::WriteSummary(WriteSummary { path: output.clone().into() }),
            Command::Features(Features { keys: keys.clone(), map: map.clone().map(Into::into) }),
        ] {
            prop_assert_eq!(recompile(&command), vec![command]);
        }
    }
}
