//! Turns a flat argument list into an ordered list of commands.

use log::debug;

use crate::command::Command;
use crate::error::CompileError;
use crate::registry::CommandRegistry;
use crate::tokenizer::is_switch_at;

/// Compile `args` into commands, in order.
///
/// The token at the cursor must be a registered switch. Its parser takes the
/// parameters up to the next token starting with `--`, and the cursor moves
/// past the switch and its parameters. No checks span several commands; the
/// executor validates the pipeline shape.
///
/// # Examples
/// ```
/// use routeforge_pipeline::{CommandRegistry, compile};
///
/// let registry = CommandRegistry::with_builtin_commands();
/// let commands = compile(
///     &registry,
///     &["--read-pbf", "in.osm.pbf", "--write-graph", "graph=out.graph", "vehicles=car"],
/// )?;
/// assert_eq!(commands.len(), 2);
/// assert_eq!(commands[1].to_string(), "--write-graph graph=out.graph vehicles=car");
/// # Ok::<(), routeforge_pipeline::CompileError>(())
/// ```
pub fn compile<S: AsRef<str>>(
    registry: &CommandRegistry,
    args: &[S],
) -> Result<Vec<Command>, CompileError> {
    let tokens: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let mut commands = Vec::new();
    let mut cursor = 0;
    while let Some(&switch) = tokens.get(cursor) {
        let spec = is_switch_at(&tokens, cursor)
            .then(|| registry.resolve(switch))
            .flatten()
            .ok_or_else(|| CompileError::UnknownSwitch {
                token: switch.to_owned(),
                position: cursor,
            })?;
        let rest = tokens.get(cursor + 1..).unwrap_or_default();
        let (command, consumed) = (spec.parse)(switch, rest)?;
        debug!("compiled {command}");
        commands.push(command);
        cursor += 1 + consumed;
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ReadPbf, WriteGraph};
    use crate::error::CommandLineError;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> CommandRegistry {
        CommandRegistry::with_builtin_commands()
    }

    #[rstest]
    fn compiles_the_documented_example(registry: CommandRegistry) {
        let commands = compile(
            &registry,
            &["--read-pbf", "in.osm.pbf", "--write-graph", "graph=out.graph", "vehicles=car"],
        )
        .expect("compile");
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            Command::ReadPbf(ReadPbf {
                path: "in.osm.pbf".into()
            })
        );
        let Command::WriteGraph(WriteGraph { graph, vehicles, map, .. }) = &commands[1] else {
            panic!("expected a write-graph command, got {}", commands[1]);
        };
        assert_eq!(graph, "out.graph");
        assert_eq!(vehicles.len(), 1);
        assert!(map.is_none());
    }

    #[rstest]
    fn short_and_long_switches_compile_alike(registry: CommandRegistry) {
        let short = compile(&registry, &["--rb", "a.pbf", "--fe", "keys=shop", "--wgj", "b.json"])
            .expect("short");
        let long = compile(
            &registry,
            &["--read-pbf", "a.pbf", "--features", "keys=shop", "--write-geojson", "b.json"],
        )
        .expect("long");
        assert_eq!(short, long);
    }

    #[rstest]
    #[case(&["in.osm.pbf"], "in.osm.pbf", 0)]
    #[case(&["--rb", "in.pbf", "--nope"], "--nope", 2)]
    fn unknown_switches_report_their_position(
        registry: CommandRegistry,
        #[case] args: &[&str],
        #[case] token: &str,
        #[case] position: usize,
    ) {
        assert_eq!(
            compile(&registry, args),
            Err(CompileError::UnknownSwitch {
                token: token.to_owned(),
                position
            })
        );
    }

    #[rstest]
    fn parser_errors_name_the_switch(registry: CommandRegistry) {
        let err = compile(&registry, &["--rb", "in.pbf", "--wgr", "graph=g", "foo=bar"])
            .expect_err("foo is not a write-graph key");
        assert_eq!(
            err,
            CompileError::CommandLine(CommandLineError::new("--wgr", "unknown key `foo`"))
        );
    }

    #[rstest]
    fn quoted_parameters_are_not_switches(registry: CommandRegistry) {
        let commands = compile(&registry, &["--rb", "\"--odd.pbf\""]).expect("compile");
        assert_eq!(
            commands,
            [Command::ReadPbf(ReadPbf {
                path: "--odd.pbf".into()
            })]
        );
    }

    #[rstest]
    fn compiling_is_free_of_cross_command_checks(registry: CommandRegistry) {
        let commands = compile(&registry, &["--wgr", "graph=g", "--rb", "in.pbf"]).expect("compile");
        assert_eq!(commands.len(), 2);
    }

    #[rstest]
    fn empty_input_compiles_to_nothing(registry: CommandRegistry) {
        let none: [&str; 0] = [];
        assert_eq!(compile(&registry, &none), Ok(Vec::new()));
    }
}
