use crate::logic::document_filter::DocumentFilterEvaluator;
use crate::logic::populate::populate_documents;
use crate::logic::population::resolve;
use crate::logic::query_spec::NormalizedQuery;
use crate::model::{Collection, Document, ExecutionResult, QueryPlan, QuerySpec};
use crate::store::traits::{DocumentStore, StoreError};

// Each stage takes the plan built so far and returns the next one.

pub fn with_scope(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        scope: query.base_scope.clone(),
        ..plan
    }
}

/// The parsed `where` clause, AND-ed with the scope by the store.
pub fn with_filter(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        filter: query.filter.clone(),
        ..plan
    }
}

pub fn with_sort(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        sort: query.sort.clone(),
        ..plan
    }
}

pub fn with_pagination(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        skip: query.pagination.skip(),
        limit: query.pagination.cap(),
        ..plan
    }
}

pub fn with_projection(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        projection: query.projection.clone(),
        ..plan
    }
}

/// Requested relations, kept only when the resource declares a whitelist.
pub fn with_population(
    plan: QueryPlan,
    query: &NormalizedQuery,
    whitelist: Option<&[&str]>,
) -> QueryPlan {
    let population = match whitelist {
        Some(whitelist) if !query.population.is_empty() => {
            let requested: Vec<&str> = query.population.iter().map(String::as_str).collect();
            resolve(&requested, whitelist)
        }
        _ => Vec::new(),
    };
    QueryPlan { population, ..plan }
}

pub fn with_count(plan: QueryPlan, query: &NormalizedQuery) -> QueryPlan {
    QueryPlan {
        count: query.count,
        ..plan
    }
}

/// Run every stage in order.
pub fn build_plan(query: &NormalizedQuery, whitelist: Option<&[&str]>) -> QueryPlan {
    let plan = with_scope(QueryPlan::default(), query);
    let plan = with_filter(plan, query);
    let plan = with_sort(plan, query);
    let plan = with_pagination(plan, query);
    let plan = with_projection(plan, query);
    let plan = with_population(plan, query, whitelist);
    with_count(plan, query)
}

/// Execute a list query against `collection`.
///
/// Store failures are returned as they are.
pub async fn execute<S>(
    store: &S,
    collection: Collection,
    spec: &QuerySpec,
    whitelist: Option<&[&str]>,
) -> Result<ExecutionResult, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let query = NormalizedQuery::from_spec(spec);
    let plan = build_plan(&query, whitelist);
    log::debug!("{collection} query plan: {plan:?}");

    let found = store.find(collection, &plan.find_options()).await?;
    let mut documents: Vec<Document> = found
        .into_iter()
        .map(|document| DocumentFilterEvaluator::project(document, &plan.projection))
        .collect();

    populate_documents(store, collection, &mut documents, &plan.population).await?;

    let total_count = if plan.count {
        Some(
            store
                .estimated_count(collection, &plan.count_conditions())
                .await?,
        )
    } else {
        None
    };

    Ok(ExecutionResult {
        documents,
        total_count,
        pagination: query.pagination,
    })
}
