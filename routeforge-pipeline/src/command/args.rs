//! Parameter tokens collected for one switch.

use crate::error::{CommandLineError, CompileError};
use crate::tokenizer::{KeyValue, Parameter, is_switch, parse_parameter};

/// The parameters following a switch, up to the next switch.
///
/// Keys are matched case-insensitively and may appear at most once. Command
/// parsers take the values they understand and finish with
/// [`CommandArgs::finish`], which rejects anything left over.
#[derive(Debug)]
pub struct CommandArgs<'a> {
    switch: &'a str,
    positional: Vec<String>,
    pairs: Vec<(String, KeyValue<'a>)>,
    consumed: usize,
}

impl<'a> CommandArgs<'a> {
    /// Collect the parameters in `rest` that belong to `switch`.
    pub fn collect(switch: &'a str, rest: &[&'a str]) -> Result<Self, CompileError> {
        let mut args = Self {
            switch,
            positional: Vec::new(),
            pairs: Vec::new(),
            consumed: 0,
        };
        for token in rest.iter().copied().take_while(|token| !is_switch(token)) {
            args.consumed += 1;
            let parameter =
                parse_parameter(token).map_err(|source| CompileError::MalformedParameter {
                    switch: switch.to_owned(),
                    source,
                })?;
            match parameter {
                Parameter::Positional(value) => args.positional.push(value),
                Parameter::KeyValue(pair) => {
                    let key = pair.key().to_ascii_lowercase();
                    if args.pairs.iter().any(|(seen, _)| *seen == key) {
                        return Err(args.error(format!("key `{key}` given more than once")));
                    }
                    args.pairs.push((key, pair));
                }
            }
        }
        Ok(args)
    }

    /// Switch as written on the command line.
    pub const fn switch(&self) -> &'a str {
        self.switch
    }

    /// Number of tokens that belong to the switch.
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// A parser error attributed to this switch.
    pub fn error(&self, message: impl Into<String>) -> CompileError {
        CommandLineError::new(self.switch, message).into()
    }

    fn malformed(&self, source: crate::tokenizer::MalformedParameter) -> CompileError {
        CompileError::MalformedParameter {
            switch: self.switch.to_owned(),
            source,
        }
    }

    fn take_pair(&mut self, key: &str) -> Option<KeyValue<'a>> {
        let index = self.pairs.iter().position(|(seen, _)| seen == key)?;
        Some(self.pairs.remove(index).1)
    }

    /// Take the scalar value of `key`, if present.
    pub fn take_value(&mut self, key: &str) -> Result<Option<String>, CompileError> {
        self.take_pair(key)
            .map(|pair| pair.value().map_err(|source| self.malformed(source)))
            .transpose()
    }

    /// Take the scalar value of `key`, failing when it is absent.
    pub fn require_value(&mut self, key: &str) -> Result<String, CompileError> {
        self.take_value(key)?
            .ok_or_else(|| self.error(format!("missing required `{key}=`")))
    }

    /// Take the list value of `key`, if present.
    pub fn take_list(&mut self, key: &str) -> Result<Option<Vec<String>>, CompileError> {
        self.take_pair(key)
            .map(|pair| pair.values().map_err(|source| self.malformed(source)))
            .transpose()
    }

    /// Take the single positional value, failing when there is none.
    pub fn require_positional(&mut self, what: &str) -> Result<String, CompileError> {
        if self.positional.is_empty() {
            let message = match self.pairs.first() {
                Some((key, _)) => format!(
                    "missing {what}; `{key}=` was read as a parameter, quote values containing `=`"
                ),
                None => format!("missing {what}"),
            };
            return Err(self.error(message));
        }
        Ok(self.positional.remove(0))
    }

    /// Reject every parameter no parser step took.
    pub fn finish(self) -> Result<(), CompileError> {
        if let Some((key, _)) = self.pairs.first() {
            return Err(self.error(format!("unknown key `{key}`")));
        }
        if let Some(value) = self.positional.first() {
            return Err(self.error(format!("unexpected value `{value}`")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<'a>(rest: &[&'a str]) -> CommandArgs<'a> {
        CommandArgs::collect("--write-graph", rest).expect("collect parameters")
    }

    #[test]
    fn stops_at_the_next_switch() {
        let args = collect(&["graph=a", "map=b", "--read-pbf", "in.pbf"]);
        assert_eq!(args.consumed(), 2);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let mut args = collect(&["GRAPH=out.graph"]);
        assert_eq!(args.require_value("graph").expect("graph"), "out.graph");
        args.finish().expect("nothing left");
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = CommandArgs::collect("--wgr", &["graph=a", "Graph=b"]).expect_err("duplicate");
        assert_eq!(err.switch(), Some("--wgr"));
        assert!(err.to_string().contains("graph"));
    }

    #[test]
    fn unquoted_positional_with_equals_gets_a_quoting_hint() {
        let mut args = CommandArgs::collect("--rb", &["extracts/region=be.osm.pbf"])
            .expect("collect parameters");
        let err = args.require_positional("input file path").expect_err("no positional");
        let message = err.to_string();
        assert!(message.starts_with("--rb: missing input file path"), "{message}");
        assert!(message.contains("`extracts/region=`"), "{message}");
        assert!(message.contains("quote values containing `=`"), "{message}");
    }

    #[test]
    fn quoted_positional_with_equals_is_kept_whole() {
        let mut args = CommandArgs::collect("--rb", &["\"extracts/region=be.osm.pbf\""])
            .expect("collect parameters");
        assert_eq!(
            args.require_positional("input file path").expect("positional"),
            "extracts/region=be.osm.pbf"
        );
        args.finish().expect("nothing left");
    }

    #[test]
    fn missing_positional_without_parameters_has_no_hint() {
        let mut args = collect(&[]);
        let err = args.require_positional("input file path").expect_err("no positional");
        assert_eq!(err.to_string(), "--write-graph: missing input file path");
    }

    #[test]
    fn leftovers_name_the_unknown_key() {
        let mut args = collect(&["graph=a", "foo=bar"]);
        args.require_value("graph").expect("graph");
        let err = args.finish().expect_err("foo is unknown");
        assert_eq!(
            err,
            CompileError::CommandLine(CommandLineError::new(
                "--write-graph",
                "unknown key `foo`"
            ))
        );
    }

    #[test]
    fn missing_required_values_are_reported() {
        let mut args = collect(&[]);
        let err = args.require_value("graph").expect_err("graph missing");
        assert!(err.to_string().contains("graph="));
    }

    #[test]
    fn malformed_tokens_keep_the_switch() {
        let err = CommandArgs::collect("--rb", &["\"in.pbf"]).expect_err("unbalanced");
        assert!(matches!(err, CompileError::MalformedParameter { ref switch, .. } if switch == "--rb"));
    }
}
