//! Positional predicates and the equality filters built from them
//!
//! A predicate has the shape of a record: one slot per schema field, each
//! either a concrete value or a wildcard. Concrete slots become `field = ?N`
//! terms joined with `AND`; wildcards contribute nothing. Values are only ever
//! carried as bound parameters.

use crate::schema::{Schema, quote};
use crate::{Error, Result};

/// Record-shaped match pattern; `None` is a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    terms: Vec<Option<String>>,
}

impl Predicate {
    pub fn new(terms: Vec<Option<String>>) -> Self {
        Self { terms }
    }

    /// All-wildcard predicate of the given width
    pub fn wildcard(width: usize) -> Self {
        Self {
            terms: vec![None; width],
        }
    }

    /// Predicate matching one exact record
    pub fn exact<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            terms: values.iter().map(|v| Some(v.as_ref().to_string())).collect(),
        }
    }

    /// Set a concrete value at `index`.
    ///
    /// An index past the end widens the predicate with wildcards, so it no
    /// longer matches the schema's arity and is rejected instead of silently
    /// dropping the term.
    pub fn with(mut self, index: usize, value: impl Into<String>) -> Self {
        if index >= self.terms.len() {
            self.terms.resize(index + 1, None);
        }
        self.terms[index] = Some(value.into());
        self
    }

    /// Predicate sized for `schema` with a single concrete field
    pub fn on_field(schema: &Schema, field: &str, value: impl Into<String>) -> Result<Self> {
        let index = schema.position(field).ok_or_else(|| Error::MissingField {
            schema: schema.name().to_string(),
            field: field.to_string(),
        })?;
        Ok(Self::wildcard(schema.field_count()).with(index, value))
    }

    /// Parse CLI-style terms where `*` is a wildcard
    pub fn parse_terms<S: AsRef<str>>(terms: &[S]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|t| match t.as_ref() {
                    "*" => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        }
    }

    pub fn terms(&self) -> &[Option<String>] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn concrete_count(&self) -> usize {
        self.terms.iter().filter(|t| t.is_some()).count()
    }

    /// True when no slot carries a concrete value
    pub fn is_empty(&self) -> bool {
        self.concrete_count() == 0
    }
}

/// Conjunctive equality filter ready to be appended to a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// `"a" = ?1 AND "b" = ?2`
    pub clause: String,
    /// Values bound to `?1..?N`, in clause order
    pub params: Vec<String>,
}

impl Filter {
    /// Build the filter for `predicate` against `schema`.
    ///
    /// Rejects a predicate whose width differs from the schema's field count,
    /// and one with no concrete slot.
    pub fn build(schema: &Schema, predicate: &Predicate) -> Result<Self> {
        check_arity(schema, predicate.len())?;
        if predicate.is_empty() {
            return Err(Error::EmptyPredicate {
                schema: schema.name().to_string(),
            });
        }

        let mut terms = Vec::with_capacity(predicate.concrete_count());
        let mut params = Vec::with_capacity(predicate.concrete_count());
        for (field, term) in schema.fields().iter().zip(predicate.terms()) {
            if let Some(value) = term {
                params.push(value.clone());
                terms.push(format!("{} = ?{}", quote(&field.name), params.len()));
            }
        }

        Ok(Self {
            clause: terms.join(" AND "),
            params,
        })
    }
}

/// Reject tuples whose width differs from the schema
pub(crate) fn check_arity(schema: &Schema, actual: usize) -> Result<()> {
    if actual != schema.field_count() {
        return Err(Error::ArityMismatch {
            schema: schema.name().to_string(),
            expected: schema.field_count(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn trips() -> Schema {
        Schema::define(
            "trips",
            [
                ("tripId", FieldType::Text),
                ("owner", FieldType::Text),
                ("title", FieldType::Text),
            ],
            Some("tripId"),
        )
        .unwrap()
    }

    #[test]
    fn test_filter_skips_wildcards() {
        let schema = trips();
        let predicate = Predicate::wildcard(3).with(0, "t1").with(2, "Lisbon");
        let filter = Filter::build(&schema, &predicate).unwrap();
        assert_eq!(filter.clause, "\"tripId\" = ?1 AND \"title\" = ?2");
        assert_eq!(filter.params, ["t1", "Lisbon"]);
    }

    #[test]
    fn test_filter_keeps_values_out_of_clause() {
        let schema = trips();
        let hostile = "x' OR '1'='1";
        let filter = Filter::build(&schema, &Predicate::wildcard(3).with(1, hostile)).unwrap();
        assert!(!filter.clause.contains(hostile));
        assert_eq!(filter.params, [hostile]);
    }

    #[test]
    fn test_all_wildcard_rejected() {
        let err = Filter::build(&trips(), &Predicate::wildcard(3)).unwrap_err();
        assert!(matches!(err, Error::EmptyPredicate { .. }));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = Filter::build(&trips(), &Predicate::exact(&["t1", "bob"])).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_out_of_range_index_breaks_arity() {
        let predicate = Predicate::wildcard(3).with(0, "t1").with(5, "Lisbon");
        assert_eq!(predicate.len(), 6);
        assert_eq!(predicate.concrete_count(), 2);

        let err = Filter::build(&trips(), &predicate).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { expected: 3, actual: 6, .. }));
    }

    #[test]
    fn test_on_field_and_parse_terms() {
        let schema = trips();
        let predicate = Predicate::on_field(&schema, "owner", "bob").unwrap();
        assert_eq!(predicate.terms(), [None, Some("bob".to_string()), None]);
        assert!(Predicate::on_field(&schema, "nope", "x").is_err());

        let parsed = Predicate::parse_terms(&["*", "bob", "*"]);
        assert_eq!(parsed, predicate);
    }

    #[test]
    fn test_empty_string_is_concrete() {
        let predicate = Predicate::wildcard(3).with(2, "");
        assert!(!predicate.is_empty());
        assert_eq!(predicate.concrete_count(), 1);
    }
}
