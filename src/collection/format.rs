//! printf-like formatting of case values into titles.
//!
//! Values are `serde_json::Value`s. Rendering follows the conventions test
//! titles have always had in this family of runners: `%s` prints strings raw
//! and inspects objects shallowly, `%d`/`%i`/`%f` coerce to numbers, `%j`
//! prints JSON, `%o`/`%O` inspect, `%c` swallows its argument and `%%` is a
//! literal percent sign.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

/// Nesting shown by `inspect` before containers collapse to `[Object]`.
pub const DEFAULT_DEPTH: usize = 2;

/// Inspected values at least this long are abbreviated by [`obj_display`].
pub const TRUNCATE_THRESHOLD: usize = 40;

lazy_static! {
    static ref DIRECTIVE_RE: Regex = Regex::new(r"%[sdjifoOc%]").expect("directive pattern");
    static ref FLOAT_PREFIX_RE: Regex =
        Regex::new(r"^[+-]?(Infinity|(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?)").expect("float pattern");
    static ref INT_PREFIX_RE: Regex = Regex::new(r"^[+-]?\d+").expect("int pattern");
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("ident pattern");
}

/// Substitutes directives in `template` with `args`, left to right.
///
/// Directives without a remaining argument are kept verbatim. Arguments left
/// over after the template is exhausted are appended, separated by spaces.
pub fn format(template: &str, args: &[Value]) -> String {
    let mut next = 0;
    let mut out = DIRECTIVE_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let directive = &caps[0];
            if directive == "%%" {
                return "%".to_string();
            }
            let Some(value) = args.get(next) else {
                return directive.to_string();
            };
            next += 1;
            match directive {
                "%s" => format_string(value),
                "%d" => js_number(to_number(value)),
                "%i" => parse_int(value),
                "%f" => parse_float(value),
                "%j" => serde_json::to_string(value).unwrap_or_default(),
                "%o" => inspect(value, 4),
                "%O" => inspect(value, DEFAULT_DEPTH),
                "%c" => String::new(),
                other => other.to_string(),
            }
        })
        .into_owned();

    for value in args.iter().skip(next) {
        out.push(' ');
        match value {
            Value::Array(_) | Value::Object(_) => out.push_str(&inspect(value, DEFAULT_DEPTH)),
            other => out.push_str(&js_string(other)),
        }
    }
    out
}

fn format_string(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => inspect(value, 0),
        other => js_string(other),
    }
}

/// Human-readable rendering, e.g. `{ a: 1, b: [ 'x' ] }`.
pub fn inspect(value: &Value, depth: usize) -> String {
    inspect_at(value, 0, depth)
}

fn inspect_at(value: &Value, level: usize, depth: usize) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Array(_) if level > depth => "[Array]".to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| inspect_at(item, level + 1, depth))
                .collect();
            format!("[ {} ]", parts.join(", "))
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(_) if level > depth => "[Object]".to_string(),
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, item)| {
                    let key = if IDENT_RE.is_match(key) {
                        key.clone()
                    } else {
                        format!("'{key}'")
                    };
                    format!("{key}: {}", inspect_at(item, level + 1, depth))
                })
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        other => js_string(other),
    }
}

/// Inspects `value`, abbreviating long arrays and objects.
/// A missing value renders as `undefined`.
pub fn obj_display(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "undefined".to_string();
    };
    let rendered = inspect(value, DEFAULT_DEPTH);
    if rendered.len() < TRUNCATE_THRESHOLD {
        return rendered;
    }
    match value {
        Value::Array(items) => format!("[ Array({}) ]", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            let listed = if keys.len() > 2 {
                format!("{}, ...", keys[..2].join(", "))
            } else {
                keys.join(", ")
            };
            format!("{{ Object ({listed}) }}")
        }
        _ => rendered,
    }
}

/// Looks up a dotted path such as `user.tags.0` or `user.tags[0]`.
pub fn object_attr<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let normalized = path.replace('[', ".").replace(']', "");
    let mut current = source;
    for segment in normalized.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// String coercion: arrays join with commas, objects are opaque.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                js_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Number coercion.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number_literal(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_number_literal(&js_string(single)),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_number_literal(text: &str) -> f64 {
    let trimmed = text.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            let lower = trimmed.to_ascii_lowercase();
            if lower.contains("inf") || lower.contains("nan") {
                return f64::NAN;
            }
            trimmed.parse::<f64>().unwrap_or(f64::NAN)
        }
    }
}

fn parse_int(value: &Value) -> String {
    let text = js_string(value);
    match INT_PREFIX_RE.find(text.trim_start()) {
        Some(m) => js_number(m.as_str().parse::<f64>().unwrap_or(f64::NAN)),
        None => "NaN".to_string(),
    }
}

fn parse_float(value: &Value) -> String {
    let text = js_string(value);
    match FLOAT_PREFIX_RE.find(text.trim_start()) {
        Some(m) => js_number(parse_number_literal(m.as_str())),
        None => "NaN".to_string(),
    }
}

/// Number rendering without a trailing `.0` for integral values.
pub fn js_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_directives() {
        assert_eq!(format("%s and %s", &[json!("a"), json!(1)]), "a and 1");
        assert_eq!(format("%d items", &[json!("42")]), "42 items");
        assert_eq!(format("%i", &[json!(3.9)]), "3");
        assert_eq!(format("%f", &[json!("1.5kg")]), "1.5");
        assert_eq!(format("%j", &[json!({"a": [1, 2]})]), r#"{"a":[1,2]}"#);
        assert_eq!(format("%c|%s", &[json!("css"), json!("x")]), "|x");
    }

    #[test]
    fn test_escaped_percent() {
        assert_eq!(format("100%%", &[]), "100%");
        assert_eq!(format("%% of %s", &[json!("all")]), "% of all");
    }

    #[test]
    fn test_missing_argument_keeps_directive() {
        assert_eq!(format("%s + %s", &[json!(1)]), "1 + %s");
    }

    #[test]
    fn test_extra_arguments_are_appended() {
        assert_eq!(
            format("sum", &[json!(1), json!([1, 2]), json!(null)]),
            "sum 1 [ 1, 2 ] null"
        );
    }

    #[test]
    fn test_unknown_directive_untouched() {
        assert_eq!(format("%x %s", &[json!("y")]), "%x y");
    }

    #[test]
    fn test_number_coercions() {
        assert_eq!(format("%d", &[json!({"a": 1})]), "NaN");
        assert_eq!(format("%d", &[json!(true)]), "1");
        assert_eq!(format("%i", &[json!("abc")]), "NaN");
        assert_eq!(format("%i", &[json!("  -12px")]), "-12");
        assert_eq!(format("%f", &[json!(".5e1")]), "5");
    }

    #[test]
    fn test_string_directive_inspects_objects_shallowly() {
        assert_eq!(
            format("%s", &[json!({"a": 1, "b": {"c": 2}})]),
            "{ a: 1, b: [Object] }"
        );
    }

    #[test]
    fn test_inspect() {
        assert_eq!(inspect(&json!("it's"), DEFAULT_DEPTH), r"'it\'s'");
        assert_eq!(inspect(&json!([]), DEFAULT_DEPTH), "[]");
        assert_eq!(inspect(&json!({}), DEFAULT_DEPTH), "{}");
        assert_eq!(
            inspect(&json!({"first-name": "x", "n": [1, {"k": true}]}), DEFAULT_DEPTH),
            "{ 'first-name': 'x', n: [ 1, { k: true } ] }"
        );
    }

    #[test]
    fn test_obj_display_abbreviates_long_values() {
        let long_array = json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(obj_display(Some(&long_array)), "[ Array(15) ]");

        let long_object = json!({
            "alpha": "aaaaaaaa",
            "beta": "bbbbbbbb",
            "gamma": "cccccccc"
        });
        assert_eq!(obj_display(Some(&long_object)), "{ Object (alpha, beta, ...) }");
        assert_eq!(obj_display(Some(&json!("short"))), "'short'");
        assert_eq!(obj_display(None), "undefined");
    }

    #[test]
    fn test_object_attr() {
        let value = json!({"user": {"name": "ada", "tags": ["x", "y"]}});
        assert_eq!(object_attr(&value, "user.name"), Some(&json!("ada")));
        assert_eq!(object_attr(&value, "user.tags.1"), Some(&json!("y")));
        assert_eq!(object_attr(&value, "user.tags[0]"), Some(&json!("x")));
        assert_eq!(object_attr(&value, "user.age"), None);
        assert_eq!(object_attr(&value, "user.name.first"), None);
    }

    #[test]
    fn test_js_number() {
        assert_eq!(js_number(3.0), "3");
        assert_eq!(js_number(-0.0), "0");
        assert_eq!(js_number(0.25), "0.25");
        assert_eq!(js_number(f64::NAN), "NaN");
        assert_eq!(js_number(f64::NEG_INFINITY), "-Infinity");
    }
}
