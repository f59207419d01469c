//! Grammar for the `where` query parameter.
//!
//! A `where` value is a comma-separated list of clauses, each `field<op>value`.
//! Operators are recognised by precedence rather than position: the first
//! operator in [`Operator::PRECEDENCE`] that occurs anywhere in a clause is the
//! one the clause is split on, so `age>=5` is never read as `age` `>` `=5`.

use std::collections::BTreeMap;

use crate::model::{FilterCondition, FilterQuery, RangeOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lte,
    Gte,
    Gt,
    Lt,
    Eq,
}

impl Operator {
    /// Multi-character operators must be tried before their one-character prefixes.
    pub const PRECEDENCE: [Operator; 5] = [
        Operator::Lte,
        Operator::Gte,
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
        }
    }

    /// The store-native comparison for inequality operators.
    pub fn range_op(&self) -> Option<RangeOp> {
        match self {
            Operator::Lte => Some(RangeOp::Lte),
            Operator::Gte => Some(RangeOp::Gte),
            Operator::Gt => Some(RangeOp::Gt),
            Operator::Lt => Some(RangeOp::Lt),
            Operator::Eq => None,
        }
    }

    /// The highest-precedence operator present in `clause`.
    pub fn detect(clause: &str) -> Option<Operator> {
        Self::PRECEDENCE
            .into_iter()
            .find(|operator| clause.contains(operator.symbol()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl FilterClause {
    /// Split one clause on its detected operator. The value runs up to the
    /// next occurrence of the same operator, if any.
    pub fn parse(clause: &str) -> Option<Self> {
        let operator = Operator::detect(clause)?;
        let mut parts = clause.split(operator.symbol());
        let field = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();

        Some(Self {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        })
    }
}

/// Clauses of a `where` value in order; clauses without an operator are skipped.
pub fn tokenize(where_clause: &str) -> impl Iterator<Item = FilterClause> + '_ {
    where_clause.split(',').filter_map(FilterClause::parse)
}

pub fn parse_filter(where_clause: &str) -> FilterQuery {
    tokenize(where_clause).fold(FilterQuery::new(), |mut query, clause| {
        match clause.operator.range_op() {
            None => query.set(clause.field, FilterCondition::Equals(clause.value)),
            Some(op) => {
                let bound = coerce_number(&clause.value);
                match query.get_mut(&clause.field) {
                    Some(FilterCondition::Range(bounds)) => {
                        bounds.insert(op, bound);
                    }
                    _ => query.set(
                        clause.field,
                        FilterCondition::Range(BTreeMap::from([(op, bound)])),
                    ),
                }
            }
        }
        query
    })
}

/// Numeric reading of a bound: blank is zero, anything unparsable is NaN and
/// matches nothing.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(bounds: &[(RangeOp, f64)]) -> FilterCondition {
        FilterCondition::Range(bounds.iter().copied().collect())
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(Operator::detect("age>=5"), Some(Operator::Gte));
        assert_eq!(Operator::detect("age<=5"), Some(Operator::Lte));
        assert_eq!(Operator::detect("age>5"), Some(Operator::Gt));
        assert_eq!(Operator::detect("age<5"), Some(Operator::Lt));
        assert_eq!(Operator::detect("name=Ann"), Some(Operator::Eq));
        assert_eq!(Operator::detect("garbage"), None);
    }

    #[test]
    fn test_precedence_beats_position() {
        // `=` appears first but `<` outranks it.
        let clause = FilterClause::parse("a=b<c").unwrap();
        assert_eq!(clause.operator, Operator::Lt);
        assert_eq!(clause.field, "a=b");
        assert_eq!(clause.value, "c");
    }

    #[test]
    fn test_equality_keeps_raw_string() {
        for (input, field, value) in [
            ("floor=3", "floor", "3"),
            ("name=Blue Room", "name", "Blue Room"),
            ("isReviewed=false", "isReviewed", "false"),
            ("slug=", "slug", ""),
        ] {
            let query = parse_filter(input);
            assert_eq!(query.len(), 1);
            assert_eq!(
                query.get(field),
                Some(&FilterCondition::Equals(value.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_gte_is_never_read_as_gt() {
        for input in ["age>=5", "pricePerHour>=49.5", "x>=0", "rating>=-1"] {
            let clause = FilterClause::parse(input).unwrap();
            assert_eq!(clause.operator, Operator::Gte, "{input}");
            assert!(!clause.value.starts_with('='), "{input}");
        }
    }

    #[test]
    fn test_value_stops_at_second_operator() {
        let clause = FilterClause::parse("a=b=c").unwrap();
        assert_eq!(clause.field, "a");
        assert_eq!(clause.value, "b");
    }

    #[test]
    fn test_inequalities_accumulate_per_field() {
        let query = parse_filter("age>=5,age<=10");
        assert_eq!(
            query.get("age"),
            Some(&range(&[(RangeOp::Gte, 5.0), (RangeOp::Lte, 10.0)]))
        );
    }

    #[test]
    fn test_same_operator_last_wins() {
        let query = parse_filter("age>5,age>7,name=a,name=b");
        assert_eq!(query.get("age"), Some(&range(&[(RangeOp::Gt, 7.0)])));
        assert_eq!(
            query.get("name"),
            Some(&FilterCondition::Equals("b".to_string()))
        );
    }

    #[test]
    fn test_mixed_shapes_later_clause_replaces_entry() {
        let query = parse_filter("floor=3,floor>1");
        assert_eq!(query.get("floor"), Some(&range(&[(RangeOp::Gt, 1.0)])));

        let query = parse_filter("floor>1,floor<9,floor=3");
        assert_eq!(
            query.get("floor"),
            Some(&FilterCondition::Equals("3".to_string()))
        );
    }

    #[test]
    fn test_malformed_clauses_are_ignored() {
        let query = parse_filter("nonsense,,rating>4");
        assert_eq!(query.len(), 1);
        assert_eq!(query.get("rating"), Some(&range(&[(RangeOp::Gt, 4.0)])));
        assert!(parse_filter("").is_empty());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(coerce_number("42"), 42.0);
        assert_eq!(coerce_number(" 1.5 "), 1.5);
        assert_eq!(coerce_number(""), 0.0);
        assert!(coerce_number("abc").is_nan());
    }
}
