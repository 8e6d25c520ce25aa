//! Grammar compiler for command declarations.
//!
//! A declaration is up to two bare path words followed by bracketed
//! arguments:
//!
//! ```text
//! group add <name> <count: 1 < x < 5> [*tag: red | blue]
//! ```
//!
//! `<...>` is required, `[...]` optional. Inside the brackets `name: spec`
//! where `spec` is a type name, a `|`-separated choice list, or a bound
//! expression over `x` (value) or `l` (length). A leading `*` on the name
//! requests autocomplete.
//!
//! Comparison operators may appear inside `<...>`, so a `>` only closes the
//! token when it is followed by the end of input or by the next bracketed
//! token.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::argument::{Argument, ChoiceValue, Number};
use crate::error::{ConfigError, ConfigResult};
use crate::path::PathKey;
use crate::types::ArgType;

const NUM: &str = r"-?\d+(?:\.\d+)?";

static MIN_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b([xl])\s*>=?\s*({NUM})")).expect("valid bound regex"));
static MIN_BEFORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"({NUM})\s*<=?\s*([xl])\b")).expect("valid bound regex"));
static MAX_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b([xl])\s*<=?\s*({NUM})")).expect("valid bound regex"));
static MAX_BEFORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"({NUM})\s*>=?\s*([xl])\b")).expect("valid bound regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Subgroup,
    Subcommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Path { name: String, role: PathRole },
    Argument(Argument),
}

/// A parsed declaration: where it lives and what arguments it adds there.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub path: PathKey,
    pub arguments: Vec<Argument>,
}

impl Declaration {
    pub fn to_syntax(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.path.subgroup.clone());
        parts.extend(self.path.subcommand.clone());
        parts.extend(self.arguments.iter().map(Argument::to_syntax));
        parts.join(" ")
    }
}

#[derive(Debug)]
enum Token<'a> {
    Bare(&'a str),
    Required(&'a str),
    Optional(&'a str),
}

fn closes_angle(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with('<') || rest.starts_with('[')
}

fn tokenize(raw: &str) -> ConfigResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < raw.len() {
        let rest = &raw[pos..];
        let Some(c) = rest.chars().next() else { break };
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }
        match c {
            '<' => {
                let close = rest
                    .char_indices()
                    .skip(1)
                    .find(|&(i, ch)| ch == '>' && closes_angle(&rest[i + 1..]))
                    .map(|(i, _)| i)
                    .ok_or_else(|| ConfigError::grammar(raw, "unclosed '<' in argument"))?;
                let inner = &rest[1..close];
                if inner.contains(['[', ']']) {
                    return Err(ConfigError::grammar(raw, "mismatched brackets in argument"));
                }
                tokens.push(Token::Required(inner));
                pos += close + 1;
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| ConfigError::grammar(raw, "unclosed '[' in argument"))?;
                let inner = &rest[1..close];
                if inner.contains('[') {
                    return Err(ConfigError::grammar(raw, "nested '[' in argument"));
                }
                tokens.push(Token::Optional(inner));
                pos += close + 1;
            }
            _ => {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                let word = &rest[..end];
                if word.contains(['<', '>', '[', ']']) {
                    return Err(ConfigError::grammar(
                        raw,
                        format!("mismatched brackets in '{word}'"),
                    ));
                }
                tokens.push(Token::Bare(word));
                pos += end;
            }
        }
    }
    Ok(tokens)
}

/// Tokenize and classify a declaration.
pub fn parse_segments(raw: &str) -> ConfigResult<Vec<Segment>> {
    let tokens = tokenize(raw)?;
    if tokens.is_empty() {
        return Err(ConfigError::grammar(raw, "no segments to parse"));
    }

    let mut paths: Vec<&str> = Vec::new();
    let mut bracketed: Vec<(&str, bool)> = Vec::new();
    for token in tokens {
        match token {
            Token::Bare(word) => {
                if !bracketed.is_empty() {
                    return Err(ConfigError::grammar(
                        raw,
                        format!("subcommand '{word}' cannot follow an argument"),
                    ));
                }
                if paths.len() == 2 {
                    return Err(ConfigError::grammar(
                        raw,
                        format!("'{word}' exceeds the subgroup and subcommand positions"),
                    ));
                }
                paths.push(word);
            }
            Token::Required(inner) => bracketed.push((inner, true)),
            Token::Optional(inner) => bracketed.push((inner, false)),
        }
    }

    let arguments = bracketed
        .into_iter()
        .map(|(inner, required)| parse_argument(raw, inner, required))
        .collect::<ConfigResult<Vec<_>>>()?;

    let mut segments: Vec<Segment> = match paths.as_slice() {
        [group, sub] => vec![
            Segment::Path {
                name: group.to_string(),
                role: PathRole::Subgroup,
            },
            Segment::Path {
                name: sub.to_string(),
                role: PathRole::Subcommand,
            },
        ],
        [sub] => vec![Segment::Path {
            name: sub.to_string(),
            role: PathRole::Subcommand,
        }],
        _ => Vec::new(),
    };
    segments.extend(arguments.into_iter().map(Segment::Argument));
    Ok(segments)
}

/// Parse a declaration into its path and the arguments it adds.
pub fn parse_declaration(raw: &str) -> ConfigResult<Declaration> {
    let mut path = PathKey::root();
    let mut arguments = Vec::new();
    for segment in parse_segments(raw)? {
        match segment {
            Segment::Path {
                name,
                role: PathRole::Subgroup,
            } => path.subgroup = Some(name),
            Segment::Path {
                name,
                role: PathRole::Subcommand,
            } => path.subcommand = Some(name),
            Segment::Argument(arg) => arguments.push(arg),
        }
    }
    Ok(Declaration { path, arguments })
}

/// Parse a declaration that must introduce exactly one argument.
pub fn parse_single(raw: &str) -> ConfigResult<(PathKey, Argument)> {
    let Declaration {
        path,
        mut arguments,
    } = parse_declaration(raw)?;
    if arguments.len() != 1 {
        return Err(ConfigError::grammar(
            raw,
            format!("expected exactly one argument, found {}", arguments.len()),
        ));
    }
    let argument = arguments.remove(0);
    Ok((path, argument))
}

fn parse_argument(raw: &str, inner: &str, required: bool) -> ConfigResult<Argument> {
    let inner = inner.trim();
    let (name, spec) = match inner.split_once(':') {
        Some((name, spec)) => (name.trim(), spec.trim()),
        None => (inner, ""),
    };
    let (name, autocomplete) = match name.strip_prefix('*') {
        Some(stripped) => (stripped.trim(), true),
        None => (name, false),
    };
    if name.is_empty() {
        return Err(ConfigError::grammar(raw, "argument name is empty"));
    }

    if spec.contains('|') {
        let literals: Vec<&str> = spec.split('|').map(str::trim).collect();
        if literals.len() < 2 || literals.iter().any(|l| l.is_empty()) {
            return Err(ConfigError::grammar(
                raw,
                format!("choice list for '{name}' needs at least two non-empty entries"),
            ));
        }
        let (datatype, choices) = ChoiceValue::infer(&literals);
        if autocomplete {
            debug!(argument = name, "choices take precedence over autocomplete");
        }
        let mut arg = Argument::new(name, datatype, required);
        arg.choices = choices;
        return Ok(arg);
    }

    if spec.contains(['<', '>']) {
        let mut arg = parse_bounds(raw, name, spec, required)?;
        arg.autocomplete = autocomplete;
        return Ok(arg);
    }

    let spec = if spec.is_empty() { "string" } else { spec };
    let datatype = ArgType::resolve(spec).ok_or_else(|| ConfigError::UnknownType {
        raw: spec.to_string(),
        suggestion: ArgType::suggest(spec).map(str::to_string),
    })?;
    let mut arg = Argument::new(name, datatype, required);
    arg.autocomplete = autocomplete;
    Ok(arg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Min,
    Max,
}

/// Every bound pattern in `spec` plus the byte spans the patterns covered.
fn collect_bounds(spec: &str) -> (Vec<(char, Side, &str)>, Vec<(usize, usize)>) {
    let mut found = Vec::new();
    let mut spans = Vec::new();
    for (regex, side, var_first) in [
        (&*MIN_AFTER, Side::Min, true),
        (&*MIN_BEFORE, Side::Min, false),
        (&*MAX_AFTER, Side::Max, true),
        (&*MAX_BEFORE, Side::Max, false),
    ] {
        for caps in regex.captures_iter(spec) {
            let (var, num) = if var_first { (1, 2) } else { (2, 1) };
            if let (Some(var), Some(num)) = (caps.get(var), caps.get(num)) {
                let var = var.as_str().chars().next().unwrap_or('x');
                found.push((var, side, num.as_str()));
            }
            if let Some(whole) = caps.get(0) {
                spans.push((whole.start(), whole.end()));
            }
        }
    }
    (found, spans)
}

/// Text outside every matched pattern, ignoring whitespace and `=`.
fn leftover(spec: &str, spans: &[(usize, usize)]) -> String {
    spec.char_indices()
        .filter(|&(i, c)| {
            !c.is_whitespace()
                && c != '='
                && !spans.iter().any(|&(start, end)| (start..end).contains(&i))
        })
        .map(|(_, c)| c)
        .collect()
}

fn parse_bounds(raw: &str, name: &str, spec: &str, required: bool) -> ConfigResult<Argument> {
    let (found, spans) = collect_bounds(spec);
    if found.is_empty() {
        return Err(ConfigError::grammar(
            raw,
            format!("no minimum or maximum found in bounds of '{name}'"),
        ));
    }
    let rest = leftover(spec, &spans);
    if !rest.is_empty() {
        return Err(ConfigError::grammar(
            raw,
            format!("unexpected '{rest}' in bounds of '{name}'"),
        ));
    }
    let length_mode = found.iter().any(|(var, _, _)| *var == 'l');
    let value_mode = found.iter().any(|(var, _, _)| *var == 'x');
    if length_mode && value_mode {
        return Err(ConfigError::grammar(
            raw,
            format!("bounds of '{name}' mix value (x) and length (l)"),
        ));
    }

    let mut mins = Vec::new();
    let mut maxes = Vec::new();
    for (_, side, literal) in &found {
        let number = Number::parse(literal)
            .ok_or_else(|| ConfigError::grammar(raw, format!("invalid number '{literal}'")))?;
        match side {
            Side::Min => mins.push(number),
            Side::Max => maxes.push(number),
        }
    }
    let min = mins
        .iter()
        .copied()
        .max_by(|a, b| a.as_f64().total_cmp(&b.as_f64()));
    let max = maxes
        .iter()
        .copied()
        .min_by(|a, b| a.as_f64().total_cmp(&b.as_f64()));

    if length_mode {
        let to_len = |n: Option<Number>| -> ConfigResult<Option<u16>> {
            match n {
                None => Ok(None),
                Some(Number::Int(v)) => u16::try_from(v).map(Some).map_err(|_| {
                    ConfigError::grammar(raw, format!("length bound {v} of '{name}' is out of range"))
                }),
                Some(other) => Err(ConfigError::grammar(
                    raw,
                    format!("length bound {other} of '{name}' must be a whole number"),
                )),
            }
        };
        let mut arg = Argument::new(name, ArgType::String, required);
        arg.min_length = to_len(min)?;
        arg.max_length = to_len(max)?;
        return Ok(arg);
    }

    let all_integers = mins.iter().chain(&maxes).all(|n| n.is_integer());
    let datatype = if all_integers {
        ArgType::Integer
    } else {
        ArgType::Float
    };
    let mut arg = Argument::new(name, datatype, required);
    arg.min = min;
    arg.max = max;
    arg.normalize_literals();
    Ok(arg)
}
