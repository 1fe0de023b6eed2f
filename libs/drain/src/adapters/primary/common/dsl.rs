use serde_json::{json, Value};

use super::settings::{MatchClause, QuerySettings, TermsClause};
use crate::domain::model::query::Query;

pub fn build_query(settings: &QuerySettings) -> Query {
    if let Some(q) = settings.query_string.as_ref().filter(|q| !q.trim().is_empty()) {
        return Query::QueryString(q.clone());
    }

    let must: Vec<Value> = settings
        .must_terms
        .iter()
        .filter(|clause| !clause.values.is_empty())
        .map(build_terms)
        .chain(build_matches(&settings.must_match))
        .collect();
    let should = build_matches(&settings.should_match);

    if must.is_empty() && should.is_empty() {
        return Query::default();
    }

    let mut bool_query = serde_json::Map::new();
    if !must.is_empty() {
        bool_query.insert(String::from("must"), Value::Array(must));
    }
    if !should.is_empty() {
        bool_query.insert(String::from("should"), Value::Array(should));
    }
    Query::QueryDSL(json!({ "bool": bool_query }))
}

fn build_terms(clause: &TermsClause) -> Value {
    json!({
        "terms": {
            clause.field.as_str(): clause.values
        }
    })
}

// One match per (word, field) pair, words first.
fn build_matches(clause: &MatchClause) -> Vec<Value> {
    clause
        .words
        .iter()
        .flat_map(|word| {
            clause.fields.iter().map(move |field| {
                json!({
                    "match": {
                        field.as_str(): word
                    }
                })
            })
        })
        .collect()
}
