//! Metadata filter expressions and their compiled predicate form.
//!
//! Callers describe filters as JSON mappings:
//!
//! ```json
//! {"$and": [{"lang": "hi"}, {"year": {"$gte": 1970}}]}
//! ```
//!
//! [`Predicate::compile`] validates such an expression and turns it into a
//! [`Predicate`] tree. Storage engines either evaluate the tree directly
//! ([`Predicate::matches`]) or translate it into their own query language.
//! Malformed expressions are rejected here, before any query is issued.
//!
//! Supported shapes:
//!
//! - `{"$and": [expr, ...]}`, `{"$or": [expr, ...]}`: variadic combinators
//! - `{"$not": expr}` or `{"$not": [expr, ...]}`: negation (a list negates each member)
//! - `{"field": value}`: equality shorthand
//! - `{"field": {"$op": operand}}`: one of `$eq $ne $lt $lte $gt $gte $between
//!   $in $nin $like $ilike $exists $contains $icontains`
//! - `{"a": ..., "b": ...}`: implicit AND across fields

use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::document::Metadata;
use crate::error::{Result, RetrievalError};

/// A compiled boolean condition over document metadata.
///
/// Leaves on a field the document does not carry evaluate to `false`, so
/// `Not` of a leaf matches documents missing that field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals `value`; numbers compare numerically.
    Eq { field: String, value: Value },
    /// Also matches documents without the field.
    Ne { field: String, value: Value },
    /// Field orders strictly below `value`.
    Lt { field: String, value: Value },
    /// Field orders at or below `value`.
    Lte { field: String, value: Value },
    /// Field orders strictly above `value`.
    Gt { field: String, value: Value },
    /// Field orders at or above `value`.
    Gte { field: String, value: Value },
    /// Inclusive on both ends.
    Between { field: String, low: Value, high: Value },
    /// Membership over string forms of the values.
    In { field: String, values: Vec<String> },
    /// Negated membership; also matches documents without the field.
    Nin { field: String, values: Vec<String> },
    /// SQL `LIKE` match on a string field.
    Like { field: String, pattern: LikePattern },
    /// Case-insensitive `LIKE`.
    Ilike { field: String, pattern: LikePattern },
    /// Field presence (`exists == true`) or absence.
    Exists { field: String, exists: bool },
    /// Every keyword must be contained (case-sensitive).
    Contains { field: String, keywords: Vec<String> },
    /// Every keyword must be contained (case-insensitive).
    Icontains { field: String, keywords: Vec<String> },
    /// Empty `And` matches everything.
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Validate a filter expression and compile it into a predicate tree.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Validation`] for unsupported operators,
    /// field mappings with more than one key, wrong operand shapes, and
    /// field names that are not valid identifiers.
    pub fn compile(expr: &Value) -> Result<Self> {
        let Value::Object(map) = expr else {
            return Err(RetrievalError::validation(format!(
                "expected a filter mapping but got {}",
                json_type(expr)
            )));
        };

        let mut entries = map.iter();
        if let (Some((key, value)), None) = (entries.next(), entries.next()) {
            return if key.starts_with('$') {
                compile_logical(key, value)
            } else {
                compile_field(key, value)
            };
        }

        map.iter()
            .map(|(field, value)| compile_field(field, value))
            .collect::<Result<Vec<_>>>()
            .map(Predicate::And)
    }

    /// Evaluate the predicate against a metadata map.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Predicate::Eq { field, value } => {
                metadata.get(field).is_some_and(|v| json_eq(v, value))
            }
            Predicate::Ne { field, value } => {
                !metadata.get(field).is_some_and(|v| json_eq(v, value))
            }
            Predicate::Lt { field, value } => {
                compare(metadata.get(field), value) == Some(Ordering::Less)
            }
            Predicate::Lte { field, value } => matches!(
                compare(metadata.get(field), value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Predicate::Gt { field, value } => {
                compare(metadata.get(field), value) == Some(Ordering::Greater)
            }
            Predicate::Gte { field, value } => matches!(
                compare(metadata.get(field), value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Predicate::Between { field, low, high } => {
                let v = metadata.get(field);
                matches!(compare(v, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(v, high), Some(Ordering::Less | Ordering::Equal))
            }
            Predicate::In { field, values } => is_member(metadata.get(field), values),
            Predicate::Nin { field, values } => !is_member(metadata.get(field), values),
            Predicate::Like { field, pattern } | Predicate::Ilike { field, pattern } => {
                metadata.get(field).is_some_and(|v| pattern.is_match(&string_form(v)))
            }
            Predicate::Exists { field, exists } => metadata.contains_key(field) == *exists,
            Predicate::Contains { field, keywords } => metadata
                .get(field)
                .is_some_and(|v| keywords.iter().all(|kw| contains_keyword(v, kw, false))),
            Predicate::Icontains { field, keywords } => metadata
                .get(field)
                .is_some_and(|v| keywords.iter().all(|kw| contains_keyword(v, kw, true))),
            Predicate::And(members) => members.iter().all(|p| p.matches(metadata)),
            Predicate::Or(members) => members.iter().any(|p| p.matches(metadata)),
            Predicate::Not(inner) => !inner.matches(metadata),
        }
    }
}

impl TryFrom<&Value> for Predicate {
    type Error = RetrievalError;

    fn try_from(expr: &Value) -> Result<Self> {
        Predicate::compile(expr)
    }
}

/// A SQL `LIKE` pattern (`%` any run, `_` any character, `\` escapes).
///
/// Keeps the source pattern for storage engines that evaluate `LIKE`
/// natively, and a compiled regex for in-memory evaluation.
#[derive(Debug, Clone)]
pub struct LikePattern {
    pattern: String,
    regex: Regex,
}

impl LikePattern {
    fn new(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let mut source = String::from("(?s)^");
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => {
                        source.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                    }
                    None => {
                        return Err(RetrievalError::validation(format!(
                            "invalid LIKE pattern '{pattern}': must not end with escape character"
                        )));
                    }
                },
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| {
                RetrievalError::validation(format!("invalid LIKE pattern '{pattern}': {e}"))
            })?;
        Ok(Self { pattern: pattern.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

fn compile_logical(key: &str, value: &Value) -> Result<Predicate> {
    match key.to_ascii_lowercase().as_str() {
        "$and" => Ok(Predicate::And(compile_members(key, value)?)),
        "$or" => Ok(Predicate::Or(compile_members(key, value)?)),
        "$not" => match value {
            Value::Object(_) => Ok(Predicate::Not(Box::new(Predicate::compile(value)?))),
            Value::Array(_) => Ok(Predicate::And(
                compile_members(key, value)?
                    .into_iter()
                    .map(|p| Predicate::Not(Box::new(p)))
                    .collect(),
            )),
            other => Err(RetrievalError::validation(format!(
                "`$not` expects a mapping or a list but got {}",
                json_type(other)
            ))),
        },
        _ => Err(RetrievalError::validation(format!("invalid filter operator: {key}"))),
    }
}

fn compile_members(key: &str, value: &Value) -> Result<Vec<Predicate>> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(Predicate::compile).collect(),
        Value::Array(_) => {
            Err(RetrievalError::validation(format!("`{key}` expects a non-empty list")))
        }
        other => Err(RetrievalError::validation(format!(
            "`{key}` expects a list but got {}",
            json_type(other)
        ))),
    }
}

fn compile_field(field: &str, value: &Value) -> Result<Predicate> {
    if field.starts_with('$') {
        return Err(RetrievalError::validation(format!(
            "invalid filter condition: expected a field but got an operator: {field}"
        )));
    }
    if !is_identifier(field) {
        return Err(RetrievalError::validation(format!(
            "invalid field name: {field:?}, expected a valid identifier"
        )));
    }

    let Value::Object(condition) = value else {
        return Ok(Predicate::Eq { field: field.to_string(), value: value.clone() });
    };

    let mut entries = condition.iter();
    match (entries.next(), entries.next()) {
        (Some((op, operand)), None) => compile_operator(field, op, operand),
        _ => Err(RetrievalError::validation(format!(
            "invalid filter condition for field `{field}`: \
             expected a mapping with a single operator key, got {} keys",
            condition.len()
        ))),
    }
}

fn compile_operator(field: &str, op: &str, operand: &Value) -> Result<Predicate> {
    let field = field.to_string();
    let predicate = match op {
        "$eq" => Predicate::Eq { field, value: operand.clone() },
        "$ne" => Predicate::Ne { field, value: operand.clone() },
        "$lt" => Predicate::Lt { value: comparable(op, operand)?, field },
        "$lte" => Predicate::Lte { value: comparable(op, operand)?, field },
        "$gt" => Predicate::Gt { value: comparable(op, operand)?, field },
        "$gte" => Predicate::Gte { value: comparable(op, operand)?, field },
        "$between" => match operand.as_array().map(Vec::as_slice) {
            Some([low, high]) => Predicate::Between {
                field,
                low: comparable(op, low)?,
                high: comparable(op, high)?,
            },
            _ => {
                return Err(RetrievalError::validation(
                    "`$between` expects a two-element list [low, high]",
                ));
            }
        },
        "$in" => Predicate::In { field, values: string_forms(op, operand)? },
        "$nin" => Predicate::Nin { field, values: string_forms(op, operand)? },
        "$like" => {
            Predicate::Like { field, pattern: LikePattern::new(pattern(op, operand)?, false)? }
        }
        "$ilike" => {
            Predicate::Ilike { field, pattern: LikePattern::new(pattern(op, operand)?, true)? }
        }
        "$exists" => match operand {
            Value::Bool(exists) => Predicate::Exists { field, exists: *exists },
            _ => return Err(RetrievalError::validation("expected a boolean value for `$exists`")),
        },
        "$contains" => Predicate::Contains { field, keywords: keywords(op, operand)? },
        "$icontains" => Predicate::Icontains { field, keywords: keywords(op, operand)? },
        other => {
            return Err(RetrievalError::validation(format!(
                "unsupported operator `{other}` for field `{field}`"
            )));
        }
    };
    Ok(predicate)
}

fn comparable(op: &str, operand: &Value) -> Result<Value> {
    match operand {
        Value::Number(_) | Value::String(_) => Ok(operand.clone()),
        other => Err(RetrievalError::validation(format!(
            "`{op}` expects a number or string but got {}",
            json_type(other)
        ))),
    }
}

fn string_forms(op: &str, operand: &Value) -> Result<Vec<String>> {
    let Value::Array(items) = operand else {
        return Err(RetrievalError::validation(format!("expected a list value for `{op}`")));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(string_form(item)),
            other => Err(RetrievalError::validation(format!(
                "`{op}` list members must be scalars but got {}",
                json_type(other)
            ))),
        })
        .collect()
}

fn pattern<'a>(op: &str, operand: &'a Value) -> Result<&'a str> {
    operand
        .as_str()
        .ok_or_else(|| RetrievalError::validation(format!("expected a string pattern for `{op}`")))
}

fn keywords(op: &str, operand: &Value) -> Result<Vec<String>> {
    match operand {
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    RetrievalError::validation(format!("`{op}` keywords must be strings"))
                })
            })
            .collect(),
        _ => Err(RetrievalError::validation(format!("expected a non-empty list value for `{op}`"))),
    }
}

/// A letter or underscore followed by letters, digits or underscores.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// The text form used for membership and pattern tests: strings as-is,
/// everything else as compact JSON.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_member(value: Option<&Value>, values: &[String]) -> bool {
    value.is_some_and(|v| {
        let form = string_form(v);
        values.iter().any(|candidate| *candidate == form)
    })
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => objects_eq(xs, ys),
        _ => a == b,
    }
}

fn objects_eq(xs: &Map<String, Value>, ys: &Map<String, Value>) -> bool {
    xs.len() == ys.len() && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
}

/// Orders two values of the same JSON type; mixed types are incomparable.
fn compare(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (value?, operand) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => Some(i.cmp(&j)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn contains_keyword(value: &Value, keyword: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| if case_insensitive { s.to_lowercase() } else { s.to_string() };
    let keyword = fold(keyword);
    match value {
        Value::String(s) => fold(s).contains(&keyword),
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(|s| fold(s) == keyword),
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
