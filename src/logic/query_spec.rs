use crate::logic::filter_parser::parse_filter;
use crate::model::{FilterQuery, Limit, Pagination, QuerySpec, SortKey, DEFAULT_LIMIT, MAX_WINDOW};

/// A [`QuerySpec`] read into typed parts, ready for the execution pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedQuery {
    pub base_scope: Option<FilterQuery>,
    pub filter: Option<FilterQuery>,
    pub sort: Vec<SortKey>,
    pub pagination: Pagination,
    pub projection: Vec<String>,
    pub population: Vec<String>,
    pub count: bool,
}

impl NormalizedQuery {
    pub fn from_spec(spec: &QuerySpec) -> Self {
        Self {
            base_scope: spec.special_filter().cloned(),
            filter: spec.where_clause().map(parse_filter),
            sort: split_list(spec.sort()).iter().map(|t| SortKey::parse(t)).collect(),
            pagination: Pagination {
                page: parse_page(spec.page()),
                limit: parse_limit(spec.limit()),
            },
            projection: parse_projection(spec.fields()),
            population: spec
                .with()
                .map(|with| with.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            count: spec.count() != Some("false"),
        }
    }
}

/// Comma-separated values with blanks removed.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// `all`, or a positive page size capped at [`MAX_WINDOW`]; anything else falls
/// back to the default.
pub fn parse_limit(raw: Option<&str>) -> Limit {
    match raw {
        Some("all") => Limit::All,
        Some(value) => match value.trim().parse::<u64>() {
            Ok(limit) if limit > 0 => Limit::Count(limit.min(MAX_WINDOW)),
            _ => Limit::Count(DEFAULT_LIMIT),
        },
        None => Limit::Count(DEFAULT_LIMIT),
    }
}

pub fn parse_page(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

/// Requested fields, never including anything password-like.
pub fn parse_projection(raw: Option<&str>) -> Vec<String> {
    split_list(raw)
        .into_iter()
        .filter(|field| !field.to_lowercase().contains("password"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterCondition, SortDirection};

    #[test]
    fn test_defaults() {
        let query = NormalizedQuery::from_spec(&QuerySpec::default());

        assert_eq!(query.base_scope, None);
        assert_eq!(query.filter, None);
        assert!(query.sort.is_empty());
        assert_eq!(query.pagination.limit, Limit::Count(10));
        assert_eq!(query.pagination.page, None);
        assert!(query.projection.is_empty());
        assert!(query.population.is_empty());
        assert!(query.count);
    }

    #[test]
    fn test_full_spec() {
        let spec = QuerySpec::from_pairs([
            ("where", "pricePerHour>=50,name=Loft"),
            ("sort", "-rating,name"),
            ("fields", "name,rating"),
            ("limit", "5"),
            ("page", "2"),
            ("with", "reviews,reviews.user"),
            ("count", "false"),
        ])
        .with_special_filter(FilterQuery::equals("user", "u1"));

        let query = NormalizedQuery::from_spec(&spec);

        assert_eq!(query.base_scope, Some(FilterQuery::equals("user", "u1")));
        let filter = query.filter.unwrap();
        assert_eq!(
            filter.get("name"),
            Some(&FilterCondition::Equals("Loft".to_string()))
        );
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
        assert_eq!(query.sort[1].field, "name");
        assert_eq!(query.pagination.limit, Limit::Count(5));
        assert_eq!(query.pagination.page, Some(2));
        assert_eq!(query.projection, vec!["name", "rating"]);
        assert_eq!(query.population, vec!["reviews", "reviews.user"]);
        assert!(!query.count);
    }

    #[test]
    fn test_limit_parsing() {
        assert_eq!(parse_limit(Some("all")), Limit::All);
        assert_eq!(parse_limit(Some("25")), Limit::Count(25));
        assert_eq!(parse_limit(Some("0")), Limit::Count(10));
        assert_eq!(parse_limit(Some("-3")), Limit::Count(10));
        assert_eq!(parse_limit(Some("lots")), Limit::Count(10));
        assert_eq!(
            parse_limit(Some("18446744073709551615")),
            Limit::Count(i64::MAX as u64)
        );
    }

    #[test]
    fn test_page_parsing() {
        assert_eq!(parse_page(Some("3")), Some(3));
        assert_eq!(parse_page(Some("-5")), Some(-5));
        assert_eq!(parse_page(Some("two")), None);
        assert_eq!(parse_page(None), None);
    }

    #[test]
    fn test_projection_never_includes_password_fields() {
        for raw in [
            "name,password,email",
            "name,Password,email",
            "name,PASSWORD,email",
            "name,passwordConfirm,email,-password",
        ] {
            assert_eq!(parse_projection(Some(raw)), vec!["name", "email"], "{raw}");
        }
    }

    #[test]
    fn test_count_is_on_unless_false() {
        let on = QuerySpec::from_pairs([("count", "true")]);
        let off = QuerySpec::from_pairs([("count", "false")]);
        assert!(NormalizedQuery::from_spec(&on).count);
        assert!(!NormalizedQuery::from_spec(&off).count);
    }
}
