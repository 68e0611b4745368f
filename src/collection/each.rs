//! Parameterized case expansion and title templating.

use super::format::{format, obj_display, object_attr};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

const ESCAPED_PERCENT: &str = "\u{0}escaped-percent\u{0}";

lazy_static! {
    static ref ATTR_PLACEHOLDER_RE: Regex = Regex::new(r"\$([$\w.]+)").expect("placeholder pattern");
}

/// The case set handed to `each`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cases {
    /// One value per case. Array values are tuples.
    List(Vec<Value>),
    /// A header row such as `"a | b"` plus the row values, flattened.
    Table { template: String, args: Vec<Value> },
}

impl Cases {
    pub fn table(template: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Table {
            template: template.into(),
            args,
        }
    }

    /// Resolves the case values. A table without values is a single case
    /// holding the raw template text.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::List(values) => values,
            Self::Table { template, args } if args.is_empty() => vec![Value::String(template)],
            Self::Table { template, args } => format_template_string(&template, &args),
        }
    }
}

impl From<Vec<Value>> for Cases {
    fn from(values: Vec<Value>) -> Self {
        Self::List(values)
    }
}

impl<const N: usize> From<[Value; N]> for Cases {
    fn from(values: [Value; N]) -> Self {
        Self::List(values.into())
    }
}

/// One child to declare: its title and the positional arguments for the
/// user function.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedCase {
    pub title: String,
    pub args: Vec<Value>,
}

/// Expands `cases` against the title template `name`.
///
/// Arguments are spread only when every case is an array; otherwise each case
/// is passed whole as the single argument.
pub fn expand(name: &str, cases: &[Value]) -> Vec<ExpandedCase> {
    let spread = cases.iter().all(Value::is_array);
    cases
        .iter()
        .enumerate()
        .map(|(idx, case)| {
            let items = match case {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            let title = format_title(name, &items, idx);
            let args = if spread { items } else { vec![case.clone()] };
            ExpandedCase { title, args }
        })
        .collect()
}

/// Formats a case title: `%#` is the case index, printf directives consume
/// leading items, and `$path` placeholders read from a keyed first item.
pub fn format_title(template: &str, items: &[Value], idx: usize) -> String {
    let mut template = template.to_string();
    if template.contains("%#") {
        template = template
            .replace("%%", ESCAPED_PERCENT)
            .replace("%#", &idx.to_string())
            .replace(ESCAPED_PERCENT, "%%");
    }

    let count = template.replace("%%", "").matches('%').count();
    let mut formatted = format(&template, &items[..count.min(items.len())]);

    if let Some(first) = items.first().filter(|v| v.is_object()) {
        formatted = ATTR_PLACEHOLDER_RE
            .replace_all(&formatted, |caps: &Captures<'_>| {
                obj_display(object_attr(first, &caps[1]))
            })
            .into_owned();
    }
    formatted
}

/// Groups flat `args` into records keyed by the template's header row.
/// A trailing partial row is dropped.
pub fn format_template_string(template: &str, args: &[Value]) -> Vec<Value> {
    let first_line = template.trim().lines().next().unwrap_or("");
    let compact: String = first_line.chars().filter(|c| !c.is_whitespace()).collect();
    let header: Vec<&str> = compact.split('|').collect();

    args.chunks_exact(header.len())
        .map(|row| {
            let record: Map<String, Value> = header
                .iter()
                .map(|key| key.to_string())
                .zip(row.iter().cloned())
                .collect();
            Value::Object(record)
        })
        .collect()
}
