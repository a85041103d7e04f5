//! Variable Operations
//!
//! Operation chains follow a base value through pipes:
//! `{$files | filtered by extension ".rs" | sorted by name | first}`.
//! Arrays travel between operations as whitespace-joined tokens; `[a,b,c]`
//! literals are normalized into tokens when a chain starts.

use glob::Pattern;

use super::errors::{EngineError, ErrorKind};
use super::value::split_list;

/// One parsed pipe operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    WithoutPrefix(String),
    WithoutSuffix(String),
    Replace { from: String, to: String },
    Uppercase,
    Lowercase,
    Trim,
    Length,
    Slice { start: usize, end: usize },
    SplitBy(String),
    Concat(String),
    FilteredBy { kind: FilterKind, pattern: String },
    SortedBy(SortKind),
    Reversed,
    Unique,
    First,
    Last,
    Basename,
    Dirname,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Extension,
    Name,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Name,
    Length,
}

fn bad_operation(text: &str) -> EngineError {
    EngineError::new(ErrorKind::Type, format!("unknown operation: {}", text))
}

/// Split an operation's argument words, honoring double and single quotes.
fn split_args(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        words.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Parse one pipe segment, e.g. `replace "a" with "b"`.
pub fn parse_operation(text: &str) -> Result<Operation, EngineError> {
    let words = split_args(text);
    let parts: Vec<&str> = words.iter().map(String::as_str).collect();
    match parts.as_slice() {
        ["without", "prefix", s] => Ok(Operation::WithoutPrefix(s.to_string())),
        ["without", "suffix", s] => Ok(Operation::WithoutSuffix(s.to_string())),
        ["replace", a, "by", b] | ["replace", a, "with", b] => Ok(Operation::Replace {
            from: a.to_string(),
            to: b.to_string(),
        }),
        ["uppercase"] => Ok(Operation::Uppercase),
        ["lowercase"] => Ok(Operation::Lowercase),
        ["trim"] => Ok(Operation::Trim),
        ["length"] => Ok(Operation::Length),
        ["slice", i, j] => {
            let start = i.parse().map_err(|_| bad_operation(text))?;
            let end = j.parse().map_err(|_| bad_operation(text))?;
            Ok(Operation::Slice { start, end })
        }
        ["split", "by", d] => Ok(Operation::SplitBy(d.to_string())),
        ["concat", s] => Ok(Operation::Concat(s.to_string())),
        ["filtered", "by", kind, v] => {
            let kind = match *kind {
                "extension" => FilterKind::Extension,
                "name" => FilterKind::Name,
                "prefix" => FilterKind::Prefix,
                "suffix" => FilterKind::Suffix,
                _ => return Err(bad_operation(text)),
            };
            Ok(Operation::FilteredBy {
                kind,
                pattern: v.to_string(),
            })
        }
        ["sorted"] | ["sorted", "by", "name"] => Ok(Operation::SortedBy(SortKind::Name)),
        ["sorted", "by", "length"] => Ok(Operation::SortedBy(SortKind::Length)),
        ["reversed"] => Ok(Operation::Reversed),
        ["unique"] => Ok(Operation::Unique),
        ["first"] => Ok(Operation::First),
        ["last"] => Ok(Operation::Last),
        ["basename"] => Ok(Operation::Basename),
        ["dirname"] => Ok(Operation::Dirname),
        ["extension"] => Ok(Operation::Extension),
        _ => Err(bad_operation(text)),
    }
}

/// Parse a full `op1 | op2 | ...` chain.
pub fn parse_chain(text: &str) -> Result<Vec<Operation>, EngineError> {
    text.split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_operation)
        .collect()
}

/// Normalize a chain input: bracket literals become token arrays.
fn normalize(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        split_list(trimmed).join(" ")
    } else {
        value.to_string()
    }
}

fn tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn token_extension(token: &str) -> Option<&str> {
    let base = token.rsplit('/').next().unwrap_or(token);
    base.rsplit_once('.').map(|(_, ext)| ext)
}

/// Apply one operation to a value.
pub fn apply_operation(value: &str, op: &Operation) -> Result<String, EngineError> {
    match op {
        Operation::WithoutPrefix(prefix) => {
            Ok(value.strip_prefix(prefix.as_str()).unwrap_or(value).to_string())
        }
        Operation::WithoutSuffix(suffix) => {
            Ok(value.strip_suffix(suffix.as_str()).unwrap_or(value).to_string())
        }
        Operation::Replace { from, to } => Ok(value.replace(from.as_str(), to)),
        Operation::Uppercase => Ok(value.to_uppercase()),
        Operation::Lowercase => Ok(value.to_lowercase()),
        Operation::Trim => Ok(value.trim().to_string()),
        Operation::Length => Ok(value.chars().count().to_string()),
        Operation::Slice { start, end } => {
            let chars: Vec<char> = value.chars().collect();
            let start = (*start).min(chars.len());
            let end = (*end).min(chars.len());
            if start > end {
                return Err(EngineError::new(
                    ErrorKind::Type,
                    format!("slice bounds out of order: {} > {}", start, end),
                ));
            }
            Ok(chars[start..end].iter().collect())
        }
        Operation::SplitBy(delimiter) => Ok(value
            .split(delimiter.as_str())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")),
        Operation::Concat(suffix) => Ok(format!("{}{}", value, suffix)),
        Operation::FilteredBy { kind, pattern } => {
            let keep: Vec<String> = tokens(value)
                .into_iter()
                .filter(|token| match kind {
                    FilterKind::Extension => {
                        let want = pattern.trim_start_matches('.');
                        token_extension(token) == Some(want)
                    }
                    FilterKind::Name => {
                        let base = token.rsplit('/').next().unwrap_or(token);
                        Pattern::new(pattern)
                            .map(|p| p.matches(base))
                            .unwrap_or(false)
                    }
                    FilterKind::Prefix => token.starts_with(pattern.as_str()),
                    FilterKind::Suffix => token.ends_with(pattern.as_str()),
                })
                .collect();
            Ok(keep.join(" "))
        }
        Operation::SortedBy(kind) => {
            let mut items = tokens(value);
            match kind {
                SortKind::Name => items.sort(),
                // sort_by is stable, so equal-length tokens keep their order
                SortKind::Length => {
                    items.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()))
                }
            }
            Ok(items.join(" "))
        }
        Operation::Reversed => {
            let mut items = tokens(value);
            items.reverse();
            Ok(items.join(" "))
        }
        Operation::Unique => {
            let mut seen = std::collections::HashSet::new();
            let items: Vec<String> = tokens(value)
                .into_iter()
                .filter(|token| seen.insert(token.clone()))
                .collect();
            Ok(items.join(" "))
        }
        Operation::First => Ok(tokens(value).into_iter().next().unwrap_or_default()),
        Operation::Last => Ok(tokens(value).into_iter().last().unwrap_or_default()),
        Operation::Basename => {
            let clean = value.trim_end_matches('/');
            Ok(clean.rsplit('/').next().unwrap_or(clean).to_string())
        }
        Operation::Dirname => {
            let clean = value.trim_end_matches('/');
            match clean.rsplit_once('/') {
                Some(("", _)) => Ok("/".to_string()),
                Some((dir, _)) => Ok(dir.to_string()),
                None => Ok(".".to_string()),
            }
        }
        Operation::Extension => Ok(token_extension(value).unwrap_or_default().to_string()),
    }
}

/// Apply a parsed chain to a base value.
pub fn apply_chain(value: &str, ops: &[Operation]) -> Result<String, EngineError> {
    let mut current = normalize(value);
    for op in ops {
        current = apply_operation(&current, op)?;
    }
    Ok(current)
}
