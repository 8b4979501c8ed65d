//! Option Encoder
//!
//! Every request option struct describes itself once as a table of [`Field`]s.
//! The same table drives query-string encoding, JSON body encoding and
//! required-field validation, so an option is declared in one place only.
//!
//! # Example
//!
//! ```
//! use mistral_client::options::{encode_query, Field, Options};
//!
//! struct Filter {
//!     name: Option<String>,
//!     limit: u32,
//! }
//!
//! impl Options for Filter {
//!     fn fields(&self) -> Vec<Field<'_>> {
//!         vec![
//!             Field::query("name", self.name.as_deref()),
//!             Field::query("limit", self.limit),
//!         ]
//!     }
//! }
//!
//! let query = encode_query(&Filter { name: Some("flow".into()), limit: 0 }).unwrap();
//! assert_eq!(query, "?name=flow");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Whether a field must be set or is dropped when left at its zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    OmitEmpty,
}

/// Where an encoded field travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Query,
    Body,
}

/// A single option value, borrowed from the options struct where possible.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue<'a> {
    Absent,
    Str(Cow<'a, str>),
    Int(i64),
    Bool(bool),
    List(Vec<Cow<'a, str>>),
}

impl OptionValue<'_> {
    /// Zero values: absent, empty string, 0, `false` and the empty list.
    pub fn is_zero(&self) -> bool {
        match self {
            OptionValue::Absent => true,
            OptionValue::Str(s) => s.is_empty(),
            OptionValue::Int(n) => *n == 0,
            OptionValue::Bool(b) => !b,
            OptionValue::List(items) => items.is_empty(),
        }
    }

    fn to_query(&self) -> String {
        match self {
            OptionValue::Absent => String::new(),
            OptionValue::Str(s) => s.to_string(),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::List(items) => items.join(","),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            OptionValue::Absent => Value::Null,
            OptionValue::Str(s) => Value::String(s.to_string()),
            OptionValue::Int(n) => Value::from(*n),
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::List(items) => {
                Value::Array(items.iter().map(|s| Value::String(s.to_string())).collect())
            }
        }
    }
}

impl<'a> From<&'a str> for OptionValue<'a> {
    fn from(value: &'a str) -> Self {
        OptionValue::Str(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for OptionValue<'a> {
    fn from(value: &'a String) -> Self {
        OptionValue::Str(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for OptionValue<'_> {
    fn from(value: String) -> Self {
        OptionValue::Str(Cow::Owned(value))
    }
}

impl From<i64> for OptionValue<'_> {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<u32> for OptionValue<'_> {
    fn from(value: u32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<bool> for OptionValue<'_> {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl<'a> From<&'a [String]> for OptionValue<'a> {
    fn from(value: &'a [String]) -> Self {
        OptionValue::List(value.iter().map(|s| Cow::Borrowed(s.as_str())).collect())
    }
}

impl<'a> From<&'a Vec<String>> for OptionValue<'a> {
    fn from(value: &'a Vec<String>) -> Self {
        OptionValue::from(value.as_slice())
    }
}

impl<'a, T> From<Option<T>> for OptionValue<'a>
where
    T: Into<OptionValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(OptionValue::Absent, Into::into)
    }
}

/// One row of an options table.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
    /// Semantic name, used in validation errors.
    pub name: &'static str,
    /// Name on the wire.
    pub wire: &'static str,
    pub presence: Presence,
    pub location: Location,
    pub value: OptionValue<'a>,
}

impl<'a> Field<'a> {
    /// An omit-if-empty query parameter whose wire name equals `name`.
    pub fn query(name: &'static str, value: impl Into<OptionValue<'a>>) -> Self {
        Self {
            name,
            wire: name,
            presence: Presence::OmitEmpty,
            location: Location::Query,
            value: value.into(),
        }
    }

    /// An omit-if-empty body field whose wire name equals `name`.
    pub fn body(name: &'static str, value: impl Into<OptionValue<'a>>) -> Self {
        Self {
            location: Location::Body,
            ..Self::query(name, value)
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    /// Send the field under a different wire name.
    #[must_use]
    pub fn rename(mut self, wire: &'static str) -> Self {
        self.wire = wire;
        self
    }
}

/// Implemented by every request options struct.
pub trait Options {
    /// The field table, in encoding order.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// Check that every required field, in any location, is set.
pub fn validate<O: Options + ?Sized>(opts: &O) -> Result<()> {
    check_required(&opts.fields())
}

fn check_required(fields: &[Field<'_>]) -> Result<()> {
    match fields
        .iter()
        .find(|f| f.presence == Presence::Required && f.value.is_zero())
    {
        Some(field) => Err(Error::Validation { field: field.name }),
        None => Ok(()),
    }
}

fn is_emitted(field: &Field<'_>, location: Location) -> bool {
    field.location == location && !(field.presence == Presence::OmitEmpty && field.value.is_zero())
}

/// Encode the query-located fields as `?k=v&...`, or `""` when none remain.
pub fn encode_query<O: Options + ?Sized>(opts: &O) -> Result<String> {
    let fields = opts.fields();
    check_required(&fields)?;

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for field in fields.iter().filter(|f| is_emitted(f, Location::Query)) {
        serializer.append_pair(field.wire, &field.value.to_query());
        any = true;
    }

    if any {
        Ok(format!("?{}", serializer.finish()))
    } else {
        Ok(String::new())
    }
}

/// Encode the body-located fields as a JSON object, optionally wrapped under
/// `envelope`.
pub fn encode_body<O: Options + ?Sized>(opts: &O, envelope: Option<&str>) -> Result<Value> {
    let fields = opts.fields();
    check_required(&fields)?;

    let map: Map<String, Value> = fields
        .iter()
        .filter(|f| is_emitted(f, Location::Body))
        .map(|f| (f.wire.to_string(), f.value.to_json()))
        .collect();

    Ok(match envelope {
        Some(key) => {
            let mut outer = Map::new();
            outer.insert(key.to_string(), Value::Object(map));
            Value::Object(outer)
        }
        None => Value::Object(map),
    })
}

/// Sort direction for list requests. The service defaults to descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

impl From<SortDir> for OptionValue<'_> {
    fn from(value: SortDir) -> Self {
        OptionValue::Str(Cow::Borrowed(value.as_str()))
    }
}

/// Comparison used by timestamp filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        };
        f.write_str(op)
    }
}

/// Filter on a timestamp column, sent as `<op>:<RFC 3339 time>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    pub op: FilterOp,
    pub value: DateTime<Utc>,
}

impl DateFilter {
    pub fn new(op: FilterOp, value: DateTime<Utc>) -> Self {
        Self { op, value }
    }
}

impl From<&DateFilter> for OptionValue<'_> {
    fn from(filter: &DateFilter) -> Self {
        OptionValue::Str(Cow::Owned(format!(
            "{}:{}",
            filter.op,
            filter.value.to_rfc3339_opts(SecondsFormat::Secs, true)
        )))
    }
}
