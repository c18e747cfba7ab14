//! Argument tokenizer for the pipeline command language.
//!
//! A token is either a switch (`--name`) or a parameter. Parameters are a
//! bare value or `key=value`, where the value may be a comma-separated list.
//!
//! Quoting: a `"` or `'` opens a quoted region only at the start of a segment
//! (the token, the key, the value, or a list item). The region ends at the
//! next occurrence of the same quote character, which must also end the
//! segment. Everything inside is kept verbatim, including `=`, `,` and
//! whitespace. There are no escape sequences. Quote characters met inside a
//! bare segment are literal.
//!
//! A parameter that would otherwise look like a switch must be quoted:
//! `"--odd-name.pbf"` is a positional value, `--odd-name.pbf` is a switch.

use thiserror::Error;

/// Prefix shared by every switch.
pub const SWITCH_PREFIX: &str = "--";

const QUOTES: [char; 2] = ['"', '\''];

/// A parameter token that cannot be split as requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedParameter {
    /// `key=value` was required but the token has no unquoted `=`.
    #[error("expected `key=value`, found `{token}`")]
    MissingEquals {
        /// The offending token.
        token: String,
    },
    /// A quoted region is never closed.
    #[error("unbalanced quotes in `{segment}`")]
    UnbalancedQuotes {
        /// The segment containing the open quote.
        segment: String,
    },
    /// Text follows the closing quote of a segment.
    #[error("a closing quote must end its segment in `{segment}`")]
    TrailingText {
        /// The segment containing the stray text.
        segment: String,
    },
    /// The key of a `key=value` token is empty.
    #[error("empty key in `{token}`")]
    EmptyKey {
        /// The offending token.
        token: String,
    },
}

/// Whether `token` is a switch.
pub fn is_switch(token: &str) -> bool {
    token.starts_with(SWITCH_PREFIX)
}

/// Whether the token at `index` exists and is a switch.
pub fn is_switch_at<S: AsRef<str>>(args: &[S], index: usize) -> bool {
    args.get(index).is_some_and(|token| is_switch(token.as_ref()))
}

/// A parameter token split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter<'a> {
    /// A bare value with quotes removed.
    Positional(String),
    /// A `key=value` pair.
    KeyValue(KeyValue<'a>),
}

/// A `key=value` parameter. The value stays raw until it is requested as a
/// scalar or as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<'a> {
    key: String,
    raw: &'a str,
}

impl KeyValue<'_> {
    /// The key with quotes removed.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value as a single string with surrounding quotes removed.
    pub fn value(&self) -> Result<String, MalformedParameter> {
        unquote(self.raw)
    }

    /// The value split on unquoted commas, each item unquoted. An empty value
    /// is an empty list.
    pub fn values(&self) -> Result<Vec<String>, MalformedParameter> {
        split_list(self.raw)
    }
}

fn opening_quote(segment: &str) -> Option<char> {
    segment.chars().next().filter(|ch| QUOTES.contains(ch))
}

/// Split a segment that opens with `quote` into its interior and whatever
/// follows the closing quote.
fn quoted_prefix(segment: &str, quote: char) -> Result<(&str, &str), MalformedParameter> {
    let body = segment.get(quote.len_utf8()..).unwrap_or_default();
    let end = body
        .find(quote)
        .ok_or_else(|| MalformedParameter::UnbalancedQuotes {
            segment: segment.to_owned(),
        })?;
    let interior = body.get(..end).unwrap_or_default();
    let rest = body.get(end + quote.len_utf8()..).unwrap_or_default();
    Ok((interior, rest))
}

/// Remove the quotes wrapping a whole segment, if any.
///
/// # Examples
/// ```
/// use routeforge_pipeline::tokenizer::unquote;
///
/// assert_eq!(unquote("'a, b=c'").as_deref(), Ok("a, b=c"));
/// assert_eq!(unquote("plain").as_deref(), Ok("plain"));
/// assert!(unquote("\"open").is_err());
/// ```
pub fn unquote(segment: &str) -> Result<String, MalformedParameter> {
    let Some(quote) = opening_quote(segment) else {
        return Ok(segment.to_owned());
    };
    let (interior, rest) = quoted_prefix(segment, quote)?;
    if !rest.is_empty() {
        return Err(MalformedParameter::TrailingText {
            segment: segment.to_owned(),
        });
    }
    Ok(interior.to_owned())
}

/// Split a list value on unquoted commas, unquoting each item.
pub fn split_list(raw: &str) -> Result<Vec<String>, MalformedParameter> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    let mut rest = raw;
    loop {
        let (item, remainder) = match opening_quote(rest) {
            Some(quote) => {
                let (interior, after) = quoted_prefix(rest, quote)?;
                if !(after.is_empty() || after.starts_with(',')) {
                    return Err(MalformedParameter::TrailingText {
                        segment: raw.to_owned(),
                    });
                }
                (interior.to_owned(), after)
            }
            None => match rest.split_once(',') {
                Some((item, _)) => (item.to_owned(), rest.get(item.len()..).unwrap_or_default()),
                None => (rest.to_owned(), ""),
            },
        };
        items.push(item);
        match remainder.strip_prefix(',') {
            Some(next) => rest = next,
            None => break,
        }
    }
    Ok(items)
}

/// Split `token` on its first unquoted `=`. Returns `None` for positional
/// tokens.
pub fn split_key_value(token: &str) -> Result<Option<KeyValue<'_>>, MalformedParameter> {
    let (key, raw) = match opening_quote(token) {
        Some(quote) => {
            let (interior, after) = quoted_prefix(token, quote)?;
            if after.is_empty() {
                return Ok(None);
            }
            let Some(raw) = after.strip_prefix('=') else {
                return Err(MalformedParameter::TrailingText {
                    segment: token.to_owned(),
                });
            };
            (interior.to_owned(), raw)
        }
        None => match token.split_once('=') {
            Some((key, raw)) => (key.to_owned(), raw),
            None => return Ok(None),
        },
    };
    if key.is_empty() {
        return Err(MalformedParameter::EmptyKey {
            token: token.to_owned(),
        });
    }
    Ok(Some(KeyValue { key, raw }))
}

/// Split `token` as `key=value`, failing when it has no unquoted `=`.
pub fn key_value(token: &str) -> Result<KeyValue<'_>, MalformedParameter> {
    split_key_value(token)?.ok_or_else(|| MalformedParameter::MissingEquals {
        token: token.to_owned(),
    })
}

/// Classify a parameter token.
///
/// # Examples
/// ```
/// use routeforge_pipeline::tokenizer::{Parameter, parse_parameter};
///
/// let Ok(Parameter::KeyValue(pair)) = parse_parameter("vehicles=car,'bi cycle'") else {
///     panic!("expected a key/value pair");
/// };
/// assert_eq!(pair.key(), "vehicles");
/// assert_eq!(pair.values().expect("list"), ["car", "bi cycle"]);
///
/// let Ok(Parameter::Positional(path)) = parse_parameter("\"a=b.osm.pbf\"") else {
///     panic!("expected a positional value");
/// };
/// assert_eq!(path, "a=b.osm.pbf");
/// ```
pub fn parse_parameter(token: &str) -> Result<Parameter<'_>, MalformedParameter> {
    match split_key_value(token)? {
        Some(pair) => Ok(Parameter::KeyValue(pair)),
        None => unquote(token).map(Parameter::Positional),
    }
}

/// Whether a value must be quoted to survive re-tokenizing.
fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(QUOTES)
        || value.starts_with(SWITCH_PREFIX)
        || value.contains([',', '='])
        || value.contains(char::is_whitespace)
}

/// Render a value so that tokenizing it yields the value again.
///
/// Double quotes are used unless the value contains one. A value that needs
/// quoting and contains both quote characters cannot be represented.
pub fn render_value(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_owned();
    }
    let quote = if value.contains('"') { '\'' } else { '"' };
    format!("{quote}{value}{quote}")
}

/// Render a list value, quoting items as needed.
pub fn render_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| render_value(value.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a rendered command line back into tokens on unquoted whitespace.
///
/// Quotes are tracked with the same segment rules as the tokenizer, so
/// `split_line(&command.to_string())` returns the tokens the command was
/// rendered from.
pub fn split_line(line: &str) -> Result<Vec<String>, MalformedParameter> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut segment_start = true;
    let mut seen_equals = false;

    for ch in line.chars() {
        if let Some(open) = quote {
            current.push(ch);
            if ch == open {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            segment_start = true;
            seen_equals = false;
            continue;
        }
        current.push(ch);
        if segment_start && QUOTES.contains(&ch) {
            quote = Some(ch);
            segment_start = false;
            continue;
        }
        segment_start = match ch {
            '=' if !seen_equals => {
                seen_equals = true;
                true
            }
            ',' => true,
            _ => false,
        };
    }

    if quote.is_some() {
        return Err(MalformedParameter::UnbalancedQuotes { segment: current });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("--read-pbf", true)]
    #[case("--wgr", true)]
    #[case("-x", false)]
    #[case("\"--quoted\"", false)]
    #[case("graph=--x", false)]
    fn switch_detection(#[case] token: &str, #[case] switch: bool) {
        assert_eq!(is_switch(token), switch);
    }

    #[test]
    fn switch_detection_by_index() {
        let args = ["--read-pbf", "in.osm.pbf"];
        assert!(is_switch_at(&args, 0));
        assert!(!is_switch_at(&args, 1));
        assert!(!is_switch_at(&args, 2));
    }

    #[rstest]
    #[case("graph=out.graph", "graph", "out.graph")]
    #[case("graph=a=b", "graph", "a=b")]
    #[case("graph=\"my out.graph\"", "graph", "my out.graph")]
    #[case("'odd key'=v", "odd key", "v")]
    #[case("map=", "map", "")]
    fn splits_on_first_unquoted_equals(#[case] token: &str, #[case] key: &str, #[case] value: &str) {
        let pair = key_value(token).expect("key=value");
        assert_eq!(pair.key(), key);
        assert_eq!(pair.value().expect("value"), value);
    }

    #[rstest]
    #[case("car,bicycle", &["car", "bicycle"])]
    #[case("\"a,b\",c", &["a,b", "c"])]
    #[case("'x=1',\"y z\"", &["x=1", "y z"])]
    #[case("car", &["car"])]
    #[case("", &[])]
    #[case("a,", &["a", ""])]
    #[case("a\"b,c", &["a\"b", "c"])]
    fn splits_lists(#[case] raw: &str, #[case] expected: &[&str]) {
        assert_eq!(split_list(raw).expect("list"), expected);
    }

    #[rstest]
    #[case("in.osm.pbf")]
    #[case("\"in.osm.pbf")]
    fn missing_equals_is_malformed(#[case] token: &str) {
        let err = key_value(token).expect_err("no key");
        match err {
            MalformedParameter::MissingEquals { token: found } => assert_eq!(found, token),
            MalformedParameter::UnbalancedQuotes { .. } => assert!(token.starts_with('"')),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case("graph=\"open")]
    #[case("vehicles=car,'bike")]
    fn unbalanced_quotes_are_malformed(#[case] token: &str) {
        let pair = key_value(token).expect("key splits");
        let scalar = pair.value();
        let list = pair.values();
        assert!(
            matches!(scalar, Err(MalformedParameter::UnbalancedQuotes { .. }))
                || matches!(list, Err(MalformedParameter::UnbalancedQuotes { .. }))
        );
    }

    #[rstest]
    #[case("\"a\"b")]
    #[case("'a'b'")]
    fn closing_quote_must_end_segment(#[case] segment: &str) {
        match unquote(segment) {
            Err(MalformedParameter::TrailingText { .. }) => {}
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(
            key_value("=value"),
            Err(MalformedParameter::EmptyKey { .. })
        ));
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("", "\"\"")]
    #[case("a b", "\"a b\"")]
    #[case("a,b", "\"a,b\"")]
    #[case("say \"hi\"", "'say \"hi\"'")]
    #[case("--looks-like-switch", "\"--looks-like-switch\"")]
    #[case("it's", "it's")]
    fn renders_values(#[case] value: &str, #[case] rendered: &str) {
        assert_eq!(render_value(value), rendered);
    }

    #[test]
    fn split_line_keeps_quoted_whitespace() {
        let tokens = split_line("--write-graph graph=\"my graph.bin\" vehicles=car,\"a b\"")
            .expect("split");
        assert_eq!(
            tokens,
            ["--write-graph", "graph=\"my graph.bin\"", "vehicles=car,\"a b\""]
        );
    }

    #[test]
    fn split_line_rejects_unterminated_quotes() {
        assert!(split_line("--read-pbf \"in put").is_err());
    }
}
