//! Navigation-query interpretation.
//!
//! Query parameters arrive as string-or-sequence values (a router that
//! merges repeated keys into arrays). Everything the interactor derives
//! from them — the explicit file reference, the edited-variant switch, the
//! flow-classification booleans — is a pure function of the current map,
//! recomputed on demand and never stored.

use std::collections::BTreeMap;

/// A navigation query value: a single string or a repeated-key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// First scalar value, mirroring the "take index 0 of an array" rule.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::One(v) => Some(v),
            QueryValue::Many(vs) => vs.first().map(String::as_str),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::One(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::One(v)
    }
}

/// The full navigation query, keyed by parameter name.
pub type QueryMap = BTreeMap<String, QueryValue>;

/// First scalar value of `key`, if present.
pub fn first_param<'a>(query: &'a QueryMap, key: &str) -> Option<&'a str> {
    query.get(key).and_then(QueryValue::first)
}

/// True when `key` is present with first value `"true"`.
fn is_flag_true(query: &QueryMap, key: &str) -> bool {
    first_param(query, key) == Some("true")
}

/// Visitor arrived from the editor or account area without a conversion
/// redirect in between.
pub fn is_editor_flow(query: &QueryMap) -> bool {
    let source = first_param(query, "source");
    matches!(source, Some("editor") | Some("account")) && !query.contains_key("convertedFrom")
}

/// Visitor arrived from the second remarketing email.
pub fn is_second_email(query: &QueryMap) -> bool {
    is_flag_true(query, "fromEmail")
}

/// Visitor arrived from the third remarketing email.
///
/// Derived from the same campaign parameter as [`is_second_email`]; the
/// emails share one deep link and the view decides which copy to show.
pub fn is_third_email(query: &QueryMap) -> bool {
    is_flag_true(query, "fromEmail")
}
