//! Switch-to-parser registry.

use std::collections::HashMap;

use log::debug;

use crate::command::{
    BoundingBox, Command, CommandArgs, Features, ReadPbf, StageCommand, WriteGeoJson, WriteGraph,
    WriteSummary,
};
use crate::error::CompileError;
use crate::record::StageShape;

/// Parser entry point: the switch as written and the tokens after it, to the
/// command and the number of tokens it consumed.
pub type ParseFn = fn(&str, &[&str]) -> Result<(Command, usize), CompileError>;

/// A registered command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Switch aliases, short form first.
    pub switches: &'static [&'static str],
    /// One-line description.
    pub summary: &'static str,
    /// Declared role and record kinds.
    pub shape: StageShape,
    /// Parser for the command's parameters.
    pub parse: ParseFn,
}

fn parse_as<C: StageCommand>(switch: &str, rest: &[&str]) -> Result<(Command, usize), CompileError> {
    let args = CommandArgs::collect(switch, rest)?;
    let consumed = args.consumed();
    C::parse(args).map(|command| (command.into(), consumed))
}

impl CommandSpec {
    /// Registry entry for the command type `C`.
    pub fn of<C: StageCommand>() -> Self {
        Self {
            switches: C::SWITCHES,
            summary: C::SUMMARY,
            shape: C::SHAPE,
            parse: parse_as::<C>,
        }
    }
}

/// Maps switch aliases to command parsers.
///
/// When two commands claim the same alias the first registration wins; the
/// later claim is ignored and logged.
///
/// # Examples
/// ```
/// use routeforge_pipeline::CommandRegistry;
///
/// let registry = CommandRegistry::with_builtin_commands();
/// let spec = registry.resolve("--rb").expect("registered");
/// assert_eq!(spec.switches, ["--rb", "--read-pbf"]);
/// assert!(registry.resolve("--unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    by_switch: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command.
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        registry.register(CommandSpec::of::<ReadPbf>());
        registry.register(CommandSpec::of::<WriteGraph>());
        registry.register(CommandSpec::of::<BoundingBox>());
        registry.register(CommandSpec::of::<Features>());
        registry.register(CommandSpec::of::<WriteGeoJson>());
        registry.register(CommandSpec::of::<WriteSummary>());
        registry
    }

    /// Add `spec` under each of its switches not claimed yet.
    pub fn register(&mut self, spec: CommandSpec) {
        let index = self.specs.len();
        for &switch in spec.switches {
            if self.by_switch.contains_key(switch) {
                debug!("switch {switch} is already registered; keeping the first registration");
                continue;
            }
            self.by_switch.insert(switch, index);
        }
        self.specs.push(spec);
    }

    /// The command registered for `switch`.
    pub fn resolve(&self, switch: &str) -> Option<&CommandSpec> {
        self.by_switch
            .get(switch)
            .and_then(|&index| self.specs.get(index))
    }

    /// Registered commands in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }

    /// Every switch each command still answers to, for help output.
    pub fn switches(&self) -> Vec<(Vec<&'static str>, &'static str)> {
        self.specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let owned = spec
                    .switches
                    .iter()
                    .copied()
                    .filter(|switch| self.by_switch.get(switch) == Some(&index))
                    .collect();
                (owned, spec.summary)
            })
            .collect()
    }
}
