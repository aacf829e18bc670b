use crate::core::{RecordError, Result, Row, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Filter applied to the rows of one entity during a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    True,
    Compare {
        key: String,
        op: ComparisonOp,
        value: Value,
    },
    IsNull(String),
    In {
        key: String,
        values: Vec<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::Eq, value)
    }

    pub fn ne(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::NotEq, value)
    }

    pub fn lt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::Lt, value)
    }

    pub fn le(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::LtEq, value)
    }

    pub fn gt(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::Gt, value)
    }

    pub fn ge(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, ComparisonOp::GtEq, value)
    }

    pub fn compare(key: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Self::IsNull(key.into())
    }

    pub fn is_in<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Attribute names this predicate reads.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Self::True => {}
            Self::Compare { key, .. } | Self::IsNull(key) | Self::In { key, .. } => {
                keys.push(key)
            }
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.collect_keys(keys);
                }
            }
            Self::Not(inner) => inner.collect_keys(keys),
        }
    }

    pub fn evaluate(&self, row: &Row) -> Result<bool> {
        match self {
            Self::True => Ok(true),
            Self::Compare { key, op, value } => {
                let stored = row.get(key).unwrap_or(&Value::Null);
                compare(stored, value, *op)
            }
            Self::IsNull(key) => Ok(row.get(key).is_none_or(Value::is_null)),
            Self::In { key, values } => {
                let stored = row.get(key).unwrap_or(&Value::Null);
                Ok(!stored.is_null() && values.iter().any(|v| v == stored))
            }
            Self::And(parts) => {
                for part in parts {
                    if !part.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(parts) => {
                for part in parts {
                    if part.evaluate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(row)?),
        }
    }
}

fn compare(left: &Value, right: &Value, op: ComparisonOp) -> Result<bool> {
    if left.is_null() || right.is_null() {
        return Ok(false);
    }

    match op {
        ComparisonOp::Eq => return Ok(left == right),
        ComparisonOp::NotEq => return Ok(left != right),
        _ => {}
    }

    let ordering = left.compare(right).map_err(|_| {
        RecordError::TypeMismatch(format!(
            "Cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))
    })?;

    Ok(match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::LtEq => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::GtEq => ordering != Ordering::Less,
        ComparisonOp::Eq | ComparisonOp::NotEq => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_equality_is_type_strict() {
        let r = row(&[("remote_id", Value::Text("42".into()))]);
        assert!(Predicate::eq("remote_id", "42").evaluate(&r).unwrap());
        assert!(!Predicate::eq("remote_id", 42i64).evaluate(&r).unwrap());
    }

    #[test]
    fn test_null_never_compares() {
        let r = row(&[("score", Value::Null)]);
        assert!(!Predicate::eq("score", 1i64).evaluate(&r).unwrap());
        assert!(!Predicate::ne("score", 1i64).evaluate(&r).unwrap());
        assert!(Predicate::is_null("score").evaluate(&r).unwrap());
        assert!(Predicate::is_null("missing").evaluate(&r).unwrap());
    }

    #[test]
    fn test_ordering_ops() {
        let r = row(&[("score", Value::Integer(5))]);
        assert!(Predicate::gt("score", 4i64).evaluate(&r).unwrap());
        assert!(Predicate::le("score", 5.0).evaluate(&r).unwrap());
        assert!(!Predicate::lt("score", 5i64).evaluate(&r).unwrap());
        assert!(Predicate::gt("score", "x").evaluate(&r).is_err());
    }

    #[test]
    fn test_logical_combinators() {
        let r = row(&[
            ("score", Value::Integer(5)),
            ("name", Value::Text("A".into())),
        ]);
        let p = Predicate::gt("score", 1i64).and(Predicate::eq("name", "A"));
        assert!(p.evaluate(&r).unwrap());
        assert!(!p.clone().negate().evaluate(&r).unwrap());
        let q = Predicate::eq("name", "B").or(Predicate::is_in("score", [4i64, 5]));
        assert!(q.evaluate(&r).unwrap());
        assert_eq!(p.keys(), vec!["score", "name"]);
    }
}
