/// Predicate selecting the documents of a scan.
///
/// The scroll protocol never looks inside a query, it is handed over to the
/// backend as is.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Lucene query string, eg `source:source01 AND title:foo`
    QueryString(String),
    /// Body of the `query` section of a search request.
    QueryDSL(serde_json::Value),
}

impl Default for Query {
    fn default() -> Self {
        Query::QueryDSL(serde_json::json!({ "match_all": {} }))
    }
}
