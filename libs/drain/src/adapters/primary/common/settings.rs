use serde::{Deserialize, Serialize};

/// Documents whose `field` holds one of `values`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct TermsClause {
    pub field: String,
    pub values: Vec<String>,
}

/// Full text match of every word against every field.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct MatchClause {
    pub fields: Vec<String>,
    pub words: Vec<String>,
}

/// How to build the query sent with each scan.
///
/// A `query_string` takes precedence over the structured clauses. With
/// neither, every document matches.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct QuerySettings {
    #[serde(default)]
    pub query_string: Option<String>,
    #[serde(default)]
    pub must_terms: Vec<TermsClause>,
    #[serde(default)]
    pub must_match: MatchClause,
    #[serde(default)]
    pub should_match: MatchClause,
}
