use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::Document;

/// Raw query parameters of one request, plus the base scope a collaborator
/// may inject before the caller's own filters apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    params: HashMap<String, String>,
    special_filter: Option<FilterQuery>,
}

impl QuerySpec {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self {
            params,
            special_filter: None,
        }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Narrow every query built from these parameters to `filter`.
    pub fn with_special_filter(self, filter: FilterQuery) -> Self {
        Self {
            special_filter: Some(filter),
            ..self
        }
    }

    /// A parameter value; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.get("where")
    }

    pub fn sort(&self) -> Option<&str> {
        self.get("sort")
    }

    pub fn fields(&self) -> Option<&str> {
        self.get("fields")
    }

    pub fn limit(&self) -> Option<&str> {
        self.get("limit")
    }

    pub fn page(&self) -> Option<&str> {
        self.get("page")
    }

    pub fn with(&self) -> Option<&str> {
        self.get("with")
    }

    pub fn count(&self) -> Option<&str> {
        self.get("count")
    }

    pub fn special_filter(&self) -> Option<&FilterQuery> {
        self.special_filter.as_ref()
    }
}

/// Store-native comparison operators produced by the inequality clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl RangeOp {
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            RangeOp::Lt => left < right,
            RangeOp::Lte => left <= right,
            RangeOp::Gt => left > right,
            RangeOp::Gte => left >= right,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterCondition {
    /// Raw string match, cast by the store against the stored attribute.
    Equals(String),
    /// Numeric bounds, all of which must hold.
    Range(BTreeMap<RangeOp, f64>),
}

/// Field → condition mapping; every entry must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterQuery(BTreeMap<String, FilterCondition>);

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        let mut query = Self::new();
        query.set(field.into(), FilterCondition::Equals(value.into()));
        query
    }

    pub fn and_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field.into(), FilterCondition::Equals(value.into()));
        self
    }

    pub fn set(&mut self, field: String, condition: FilterCondition) {
        self.0.insert(field, condition);
    }

    pub fn get(&self, field: &str) -> Option<&FilterCondition> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut FilterCondition> {
        self.0.get_mut(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterCondition)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// `rating` sorts ascending, `-rating` descending.
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => Self {
                field: token.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

pub const DEFAULT_LIMIT: u64 = 10;

/// Largest skip or page size a store is asked for; fits a signed 64-bit column.
pub const MAX_WINDOW: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    All,
    Count(u64),
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Count(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// The caller's page number as given; may be zero or negative.
    pub page: Option<i64>,
    pub limit: Limit,
}

impl Pagination {
    /// Documents to skip before the cap applies.
    pub fn skip(&self) -> u64 {
        match (self.limit, self.page) {
            (Limit::Count(limit), Some(page)) if page != 0 => {
                let pages_before = page.saturating_sub(1).max(0) as u64;
                pages_before.saturating_mul(limit).min(MAX_WINDOW)
            }
            _ => 0,
        }
    }

    pub fn cap(&self) -> Option<u64> {
        match self.limit {
            Limit::All => None,
            Limit::Count(limit) => Some(limit),
        }
    }

    /// 1-based page echoed back to the caller; never below 1.
    pub fn current_page(&self) -> u64 {
        match self.page {
            Some(page) if page > 0 => page as u64,
            _ => 1,
        }
    }

    pub fn last_page(&self, total_count: Option<u64>) -> u64 {
        match (self.limit, total_count) {
            (Limit::Count(limit), Some(total)) => total.div_ceil(limit),
            _ => 1,
        }
    }
}

/// One relation expansion, optionally with a nested expansion on the
/// populated documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationInstruction {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<Box<PopulationInstruction>>,
}

impl PopulationInstruction {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            populate: None,
        }
    }

    pub fn with_child(self, child: impl Into<String>) -> Self {
        Self {
            populate: Some(Box::new(Self::new(child))),
            ..self
        }
    }
}

/// What a backend needs to fetch documents: conjunctive conditions, order and window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub conditions: Vec<FilterQuery>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn matching(condition: FilterQuery) -> Self {
        Self {
            conditions: vec![condition],
            ..Self::default()
        }
    }

    pub fn first(self) -> Self {
        Self {
            limit: Some(1),
            ..self
        }
    }
}

/// The accumulated description of a list query after every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    pub scope: Option<FilterQuery>,
    pub filter: Option<FilterQuery>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub projection: Vec<String>,
    pub population: Vec<PopulationInstruction>,
    pub count: bool,
}

impl QueryPlan {
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            conditions: self.scope.iter().chain(self.filter.iter()).cloned().collect(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }

    /// Conditions the total count is computed over: the base scope alone.
    pub fn count_conditions(&self) -> Vec<FilterQuery> {
        self.scope.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub documents: Vec<Document>,
    pub total_count: Option<u64>,
    pub pagination: Pagination,
}

impl ExecutionResult {
    pub fn current_page(&self) -> u64 {
        self.pagination.current_page()
    }

    pub fn last_page(&self) -> u64 {
        self.pagination.last_page(self.total_count)
    }
}
