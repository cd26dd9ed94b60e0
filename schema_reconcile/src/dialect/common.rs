//! Helpers shared by the dialect renderers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::datatype::{base_type_name, SqlDatatype};
use crate::schema::types::{normalize_action, ConstraintDefinition, IndexDefinition};

/// Niladic SQL functions such as `getdate()` or `now()`
static FUNCTION_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*\(\s*\)$").expect("valid regex")
});

/// Defaults that are expressions and must never be quoted
const DEFAULT_KEYWORDS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "SYSDATE",
    "SYSTIMESTAMP",
];

/// Normalize a default value as reported by a metadata catalog.
///
/// Surrounding whitespace, matching single or double quotes and (when
/// `strip_parens` is set) wrapping parentheses are removed repeatedly until
/// nothing changes, so the result is a fixed point of this function. An empty
/// value or a `NULL` token means "no default". Expression defaults are
/// upper-cased since catalogs report them in their own case.
pub fn normalize_default_with(raw: Option<&str>, strip_parens: bool) -> Option<String> {
    let mut value = raw?.trim().to_string();

    loop {
        let before = value.clone();

        if strip_parens {
            if let Some(inner) = strip_wrapping_parens(&value) {
                value = inner.trim().to_string();
            }
        }

        if let Some(inner) = strip_wrapping_quotes(&value) {
            value = inner.trim().to_string();
        }

        if value == before {
            break;
        }
    }

    if value.is_empty() || value.eq_ignore_ascii_case("NULL") {
        None
    } else if is_expression(&value) {
        Some(value.to_uppercase())
    } else {
        Some(value)
    }
}

/// Keyword or niladic function call, never rendered as a quoted literal
fn is_expression(value: &str) -> bool {
    DEFAULT_KEYWORDS.contains(&value.to_uppercase().as_str()) || FUNCTION_CALL.is_match(value)
}

/// Inner text when the whole value is one parenthesized group
fn strip_wrapping_parens(value: &str) -> Option<&str> {
    if value.len() < 2 || !value.starts_with('(') || !value.ends_with(')') {
        return None;
    }

    let last = value.len() - 1;
    let mut depth = 0i32;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != last {
                    // `(a) + (b)`
                    return None;
                }
            }
            _ => {}
        }
    }

    if depth == 0 {
        Some(&value[1..last])
    } else {
        None
    }
}

/// Unquoted text when the whole value is one quoted literal
fn strip_wrapping_quotes(value: &str) -> Option<String> {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            let doubled = format!("{0}{0}", quote);
            if inner.replace(&doubled, "").contains(quote) {
                // `'a' + 'b'`
                return None;
            }
            return Some(inner.replace(&doubled, &quote.to_string()));
        }
    }
    None
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a normalized default as a SQL literal for `data_type`
pub fn default_literal(data_type: &SqlDatatype, value: &str) -> String {
    let value = value.trim();

    if is_expression(value) {
        return value.to_string();
    }

    if data_type.is_numeric() && value.parse::<f64>().is_ok() {
        return value.to_string();
    }

    quote_literal(value)
}

/// `DEFAULT <literal>` for a normalized default, if there is one
pub fn default_clause(data_type: &SqlDatatype, normalized: Option<&str>) -> Option<String> {
    normalized.map(|value| format!("DEFAULT {}", default_literal(data_type, value)))
}

/// Comma-separated list of escaped identifiers
pub fn ident_list<'a>(
    names: impl Iterator<Item = &'a str>,
    quote: impl Fn(&str) -> String,
) -> String {
    names.map(|name| quote(name)).collect::<Vec<_>>().join(", ")
}

/// Index columns with an optional per-column prefix length
pub fn index_column_list(
    index: &IndexDefinition,
    quote: impl Fn(&str) -> String,
    key_length: impl Fn(&str) -> Option<u32>,
) -> String {
    index
        .column_names()
        .map(|name| match key_length(name) {
            Some(length) => format!("{}({})", quote(name), length),
            None => quote(name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// ` ON DELETE …` / ` ON UPDATE …` for non-default actions
pub fn referential_actions(constraint: &ConstraintDefinition, with_update: bool) -> String {
    let mut sql = String::new();

    if let Some(action) = normalize_action(constraint.on_delete.as_deref()) {
        sql.push_str(&format!(" ON DELETE {}", action));
    }

    if with_update {
        if let Some(action) = normalize_action(constraint.on_update.as_deref()) {
            sql.push_str(&format!(" ON UPDATE {}", action));
        }
    }

    sql
}

/// Upper-cased base name with `aliases` folded to their canonical spelling
pub fn fold_type_alias(name: &str, aliases: &[(&str, &str)]) -> String {
    let base = base_type_name(name);
    aliases
        .iter()
        .find(|(alias, _)| *alias == base)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(base)
}
