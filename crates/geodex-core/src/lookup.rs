//! Field lookups: parsing `path__suffix` keys and evaluating them

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::limits::{
    validate_field_path, validate_in_operands, validate_regex_pattern, MAX_REGEX_COMPILED_SIZE,
};

/// Separator between path segments and the lookup suffix
pub const LOOKUP_SEPARATOR: &str = "__";

/// Separator between nested path segments
pub const PATH_SEPARATOR: char = '.';

/// Every recognised lookup suffix
pub const LOOKUP_NAMES: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "regex",
    "iregex",
    "gt",
    "gte",
    "lt",
    "lte",
    "in",
    "range",
    "isnull",
];

/// A compiled lookup with its operand
#[derive(Debug, Clone)]
pub enum Lookup {
    Exact(Value),
    IExact(String),
    Contains(String),
    IContains(String),
    StartsWith(String),
    IStartsWith(String),
    EndsWith(String),
    IEndsWith(String),
    Regex(Regex),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Range(Value, Value),
    IsNull(bool),
}

impl Lookup {
    /// Compile a suffix and operand; `key` is only used in error messages
    pub fn compile(key: &str, suffix: &str, operand: &Value) -> Result<Self> {
        let text = || text_of(operand).into_owned();
        let lower = || text_of(operand).to_lowercase();

        Ok(match suffix {
            "exact" => Self::Exact(operand.clone()),
            "iexact" => Self::IExact(lower()),
            "contains" => Self::Contains(text()),
            "icontains" => Self::IContains(lower()),
            "startswith" => Self::StartsWith(text()),
            "istartswith" => Self::IStartsWith(lower()),
            "endswith" => Self::EndsWith(text()),
            "iendswith" => Self::IEndsWith(lower()),
            "regex" => Self::Regex(compile_regex(key, &text(), false)?),
            "iregex" => Self::Regex(compile_regex(key, &text(), true)?),
            "gt" => Self::Gt(operand.clone()),
            "gte" => Self::Gte(operand.clone()),
            "lt" => Self::Lt(operand.clone()),
            "lte" => Self::Lte(operand.clone()),
            "in" => match operand {
                Value::Array(items) => {
                    validate_in_operands(items.len())?;
                    Self::In(items.clone())
                }
                _ => {
                    return Err(Error::query_field(
                        key,
                        format!("'in' expects an array, got {operand}"),
                    ))
                }
            },
            "range" => match operand.as_array().map(Vec::as_slice) {
                Some([low, high]) => Self::Range(low.clone(), high.clone()),
                _ => {
                    return Err(Error::query_field(
                        key,
                        format!("'range' expects a [low, high] pair, got {operand}"),
                    ))
                }
            },
            "isnull" => match operand {
                Value::Bool(flag) => Self::IsNull(*flag),
                _ => {
                    return Err(Error::query_field(
                        key,
                        format!("'isnull' expects true or false, got {operand}"),
                    ))
                }
            },
            other => {
                return Err(Error::query_field(
                    key,
                    format!("unknown lookup '{other}'"),
                ))
            }
        })
    }

    /// Evaluate against a resolved, non-null value
    fn matches_value(&self, value: &Value) -> bool {
        match self {
            Self::Exact(operand) => values_equal(value, operand),
            Self::IExact(operand) => text_of(value).to_lowercase() == *operand,
            Self::Contains(operand) => text_of(value).contains(operand.as_str()),
            Self::IContains(operand) => text_of(value).to_lowercase().contains(operand.as_str()),
            Self::StartsWith(operand) => text_of(value).starts_with(operand.as_str()),
            Self::IStartsWith(operand) => text_of(value).to_lowercase().starts_with(operand.as_str()),
            Self::EndsWith(operand) => text_of(value).ends_with(operand.as_str()),
            Self::IEndsWith(operand) => text_of(value).to_lowercase().ends_with(operand.as_str()),
            Self::Regex(re) => re.is_match(&text_of(value)),
            Self::Gt(operand) => compare_values(value, operand) == Some(Ordering::Greater),
            Self::Gte(operand) => matches!(
                compare_values(value, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt(operand) => compare_values(value, operand) == Some(Ordering::Less),
            Self::Lte(operand) => matches!(
                compare_values(value, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In(options) => options.iter().any(|option| values_equal(value, option)),
            Self::Range(low, high) => {
                matches!(
                    compare_values(value, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    compare_values(value, high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            Self::IsNull(flag) => !flag,
        }
    }
}

fn compile_regex(key: &str, pattern: &str, case_insensitive: bool) -> Result<Regex> {
    validate_regex_pattern(pattern)?;
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .size_limit(MAX_REGEX_COMPILED_SIZE)
        .build()
        .map_err(|e| Error::query_field(key, format!("invalid regex: {e}")))
}

/// One compiled `key=value` criterion
#[derive(Debug, Clone)]
pub struct Predicate {
    key: String,
    path: Vec<String>,
    lookup: Lookup,
}

impl Predicate {
    /// Parse `path[__lookup]`.
    ///
    /// A key without `__` is an exact match on its path. Otherwise the last
    /// `__` segment must be a known lookup and the earlier segments join
    /// into the path, so `point__coordinates__latitude__gte` reads the same
    /// as `point.coordinates.latitude__gte`.
    pub fn parse(key: &str, operand: &Value) -> Result<Self> {
        let parts: Vec<&str> = key.split(LOOKUP_SEPARATOR).collect();
        let (path_parts, suffix) = match parts.split_last() {
            Some((suffix, rest)) if !rest.is_empty() => (rest, *suffix),
            _ => (&parts[..], "exact"),
        };

        let path = split_path(&path_parts.join("."))
            .map_err(|e| Error::query_field(key, e.to_string()))?;
        let lookup = Lookup::compile(key, suffix, operand)?;
        Ok(Self {
            key: key.to_string(),
            path,
            lookup,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// `None` means the path did not resolve, which never matches.
    /// A resolved `null` only matches `isnull=true`.
    pub fn matches(&self, resolved: Option<&Value>) -> bool {
        match resolved {
            None => false,
            Some(Value::Null) => matches!(self.lookup, Lookup::IsNull(true)),
            Some(value) => self.lookup.matches_value(value),
        }
    }
}

/// Compile every criterion up front so malformed queries fail before iteration
pub fn compile(criteria: &Criteria) -> Result<Vec<Predicate>> {
    criteria
        .iter()
        .map(|(key, value)| Predicate::parse(key, value))
        .collect()
}

/// Split a dotted field path and check it against the limits
pub fn split_path(path: &str) -> std::result::Result<Vec<String>, crate::limits::LimitError> {
    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    validate_field_path(&segments)?;
    Ok(segments.into_iter().map(str::to_string).collect())
}

/// String form used by text lookups: raw for strings, JSON otherwise
pub fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Equality with numeric widening (`1 == 1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between comparable values; `None` for mismatched types
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => as_number(a)?.partial_cmp(&as_number(b)?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                match compare_values(left, right)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(x.len().cmp(&y.len()))
        }
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order for sorting: comparable values by value, the rest by type rank
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => {
            let x = as_number(a).unwrap_or(f64::NAN);
            let y = as_number(b).unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                match sort_order(left, right) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
        _ => compare_values(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b))),
    }
}
