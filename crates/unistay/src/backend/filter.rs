use serde_json::Value;

use super::Row;

/// Row predicate understood by every [`super::DataService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),
    #[error("malformed filter expression '{0}'")]
    Malformed(String),
}

/// Query keys that carry modifiers rather than predicates.
const RESERVED_KEYS: [&str; 4] = ["select", "order", "limit", "offset"];

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), other) => {
                left.push(other);
                Filter::Or(left)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(column, expected) => match row.get(column) {
                Some(actual) => cells_match(actual, expected),
                None => expected.is_null(),
            },
            Filter::In(column, candidates) => row
                .get(column)
                .is_some_and(|actual| candidates.iter().any(|c| cells_match(actual, c))),
            Filter::IsNull(column) => row.get(column).map_or(true, Value::is_null),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(row)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(row)),
            Filter::Not(inner) => !inner.matches(row),
        }
    }

    /// Top-level query-string pairs, e.g. `("status", "in.(pending,approved)")`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        match self {
            Filter::Eq(column, Value::Null) | Filter::IsNull(column) => {
                vec![(column.clone(), "is.null".to_string())]
            }
            Filter::Eq(column, value) => vec![(column.clone(), format!("eq.{}", literal(value)))],
            Filter::In(column, values) => {
                vec![(column.clone(), format!("in.({})", list_literal(values)))]
            }
            Filter::And(filters) => filters
                .iter()
                .flat_map(Filter::to_query_pairs)
                .collect(),
            Filter::Or(filters) => vec![("or".to_string(), group(filters))],
            Filter::Not(inner) => match inner.as_ref() {
                Filter::And(filters) => vec![("not.and".to_string(), group(filters))],
                Filter::Or(filters) => vec![("not.or".to_string(), group(filters))],
                Filter::Not(innermost) => innermost.to_query_pairs(),
                leaf => leaf
                    .to_query_pairs()
                    .into_iter()
                    .map(|(column, op)| (column, format!("not.{op}")))
                    .collect(),
            },
        }
    }

    /// Nested form used inside `or=(...)` groups.
    fn to_expression(&self) -> String {
        match self {
            Filter::Eq(column, Value::Null) | Filter::IsNull(column) => {
                format!("{column}.is.null")
            }
            Filter::Eq(column, value) => format!("{column}.eq.{}", quoted(&literal(value))),
            Filter::In(column, values) => format!("{column}.in.({})", list_literal(values)),
            Filter::And(filters) => format!("and{}", group(filters)),
            Filter::Or(filters) => format!("or{}", group(filters)),
            Filter::Not(inner) => format!("not.{}", inner.to_expression()),
        }
    }

    /// Rebuild a filter from query-string pairs; modifier keys are skipped.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Option<Self>, FilterParseError> {
        let mut filters = Vec::new();
        for (key, value) in pairs {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let filter = match key.as_str() {
                "or" => Filter::Or(parse_group(value)?),
                "and" => Filter::And(parse_group(value)?),
                "not.or" => Filter::Or(parse_group(value)?).negate(),
                "not.and" => Filter::And(parse_group(value)?).negate(),
                column => parse_operation(column, value)?,
            };
            filters.push(filter);
        }

        Ok(match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        })
    }
}

/// Text form of a cell as it appears in query strings.
pub(crate) fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Cells compare by value, falling back to text and then to numbers so a
/// filter parsed from a query string still matches typed JSON.
fn cells_match(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    let (actual, expected) = (literal(actual), literal(expected));
    if actual == expected {
        return true;
    }
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => (a - b).abs() < f64::EPSILON,
        _ => false,
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty() || text.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\'))
}

fn quoted(text: &str) -> String {
    if !needs_quotes(text) {
        return text.to_string();
    }
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn unquoted(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => trimmed.to_string(),
    }
}

fn list_literal(values: &[Value]) -> String {
    values
        .iter()
        .map(|value| quoted(&literal(value)))
        .collect::<Vec<_>>()
        .join(",")
}

fn group(filters: &[Filter]) -> String {
    let inner = filters
        .iter()
        .map(Filter::to_expression)
        .collect::<Vec<_>>()
        .join(",");
    format!("({inner})")
}

fn strip_parens(text: &str) -> Result<&str, FilterParseError> {
    text.trim()
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .ok_or_else(|| FilterParseError::Malformed(text.to_string()))
}

/// Split on commas that sit outside parentheses and quotes.
fn split_top_level(text: &str) -> Result<Vec<&str>, FilterParseError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| FilterParseError::Malformed(text.to_string()))?;
            }
            ',' if !in_quotes && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || in_quotes {
        return Err(FilterParseError::Malformed(text.to_string()));
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    Ok(parts)
}

fn parse_group(text: &str) -> Result<Vec<Filter>, FilterParseError> {
    split_top_level(strip_parens(text)?)?
        .into_iter()
        .map(parse_expression)
        .collect()
}

fn parse_expression(text: &str) -> Result<Filter, FilterParseError> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("not.") {
        return Ok(parse_expression(rest)?.negate());
    }
    if let Some(rest) = text.strip_prefix("and") {
        if rest.starts_with('(') {
            return Ok(Filter::And(parse_group(rest)?));
        }
    }
    if let Some(rest) = text.strip_prefix("or") {
        if rest.starts_with('(') {
            return Ok(Filter::Or(parse_group(rest)?));
        }
    }
    let (column, operation) = text
        .split_once('.')
        .ok_or_else(|| FilterParseError::Malformed(text.to_string()))?;
    parse_operation(column, operation)
}

/// Parse `[not.]op.value` for one column.
fn parse_operation(column: &str, operation: &str) -> Result<Filter, FilterParseError> {
    if let Some(rest) = operation.strip_prefix("not.") {
        return Ok(parse_operation(column, rest)?.negate());
    }
    let (op, value) = operation
        .split_once('.')
        .ok_or_else(|| FilterParseError::Malformed(operation.to_string()))?;
    match op {
        "eq" => Ok(Filter::Eq(column.to_string(), Value::String(unquoted(value)))),
        "in" => {
            let items = split_top_level(strip_parens(value)?)?
                .into_iter()
                .map(|item| Value::String(unquoted(item)))
                .collect();
            Ok(Filter::In(column.to_string(), items))
        }
        "is" if value.eq_ignore_ascii_case("null") => Ok(Filter::IsNull(column.to_string())),
        other => Err(FilterParseError::UnknownOperator(other.to_string())),
    }
}
