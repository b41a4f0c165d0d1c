use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A single column value as seen by the query layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Ordering used by `Order`: `Null` sorts before everything, numbers compare across
    /// int/float, mismatched kinds compare equal.
    fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Row predicate. A `Query` holds a conjunction of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Case-insensitive SQL `LIKE` with `%` wildcards.
    ILike(String, String),
    In(String, Vec<Value>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Every column name the filter touches, nested `Or` branches included.
    pub(crate) fn columns(&self) -> Vec<&str> {
        match self {
            Filter::Eq(column, _) | Filter::ILike(column, _) | Filter::In(column, _) => {
                vec![column.as_str()]
            }
            Filter::Or(filters) => filters.iter().flat_map(Filter::columns).collect(),
        }
    }

    /// Evaluates the filter, resolving columns through `lookup`.
    pub(crate) fn matches<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self {
            Filter::Eq(column, expected) => {
                lookup(column).is_some_and(|value| same_value(&value, expected))
            }
            Filter::ILike(column, pattern) => match lookup(column) {
                Some(Value::Text(text)) => ilike(&text, pattern),
                _ => false,
            },
            Filter::In(column, candidates) => lookup(column).is_some_and(|value| {
                candidates
                    .iter()
                    .any(|candidate| same_value(&value, candidate))
            }),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(lookup)),
        }
    }
}

/// SQL equality: `Null` never equals anything and kinds must agree.
fn same_value(value: &Value, expected: &Value) -> bool {
    !matches!(value, Value::Null)
        && std::mem::discriminant(value) == std::mem::discriminant(expected)
        && value.compare(expected) == Ordering::Equal
}

/// Sort direction for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }
}

/// Filtered, ordered read against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ILike(column.into(), pattern.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(column.into(), values));
        self
    }

    pub fn or(mut self, filters: Vec<Filter>) -> Self {
        self.filters.push(Filter::Or(filters));
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Column names referenced by filters and sort keys.
    pub(crate) fn columns(&self) -> Vec<&str> {
        self.filters
            .iter()
            .flat_map(Filter::columns)
            .chain(self.order.iter().map(|order| order.column.as_str()))
            .collect()
    }

    pub(crate) fn compare<A, B>(&self, left: &A, right: &B) -> Ordering
    where
        A: Fn(&str) -> Option<Value>,
        B: Fn(&str) -> Option<Value>,
    {
        for order in &self.order {
            let a = left(&order.column).unwrap_or(Value::Null);
            let b = right(&order.column).unwrap_or(Value::Null);
            let ordering = match order.direction {
                Direction::Ascending => a.compare(&b),
                Direction::Descending => b.compare(&a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Wraps free text into a substring pattern for `ILike`.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim())
}

/// Case-insensitive match where `%` stands for any run of characters.
pub(crate) fn ilike(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    let segments: Vec<&str> = pattern.split('%').collect();

    if segments.len() == 1 {
        return text == pattern;
    }

    let first = segments[0];
    let last = segments[segments.len() - 1];
    if !text.starts_with(first) {
        return false;
    }

    let mut cursor = first.len();
    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match text[cursor..].find(segment) {
            Some(offset) => cursor += offset + segment.len(),
            None => return false,
        }
    }

    text.len() >= cursor + last.len() && text[cursor..].ends_with(last)
}
