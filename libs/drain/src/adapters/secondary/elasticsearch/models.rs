//! ES response for various ES queries, these only deserialize the fields that we use,
//! which can be prone to change in the future
use serde::Deserialize;

/// ES response for a search query opening a scroll, or for a scroll query.
#[derive(Deserialize)]
pub struct ElasticsearchScrollResponse<D> {
    #[serde(rename = "_scroll_id")]
    pub scroll_id: Option<String>,
    pub hits: ElasticsearchHits<D>,
}

#[derive(Deserialize)]
pub struct ElasticsearchHits<D> {
    #[serde(default)]
    pub total: Option<ElasticsearchTotalHits>,
    pub hits: Vec<ElasticsearchHit<D>>,
}

#[derive(Deserialize)]
pub struct ElasticsearchHit<D> {
    #[serde(rename = "_source")]
    pub source: D,
}

/// Total number of hits, an object since Elasticsearch 7, a plain number before.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ElasticsearchTotalHits {
    Tracked { value: u64, relation: String },
    Count(u64),
}

impl ElasticsearchTotalHits {
    pub fn value(&self) -> u64 {
        match self {
            ElasticsearchTotalHits::Tracked { value, .. } => *value,
            ElasticsearchTotalHits::Count(value) => *value,
        }
    }

    /// False when Elasticsearch only reports a lower bound.
    pub fn is_exact(&self) -> bool {
        match self {
            ElasticsearchTotalHits::Tracked { relation, .. } => relation == "eq",
            ElasticsearchTotalHits::Count(_) => true,
        }
    }
}

impl<D> ElasticsearchScrollResponse<D> {
    /// Consume the response into the responded documents.
    pub fn into_hits(self) -> Vec<D> {
        self.hits.hits.into_iter().map(|hit| hit.source).collect()
    }
}

/// ES response for a clear scroll query.
#[derive(Debug, Deserialize)]
pub struct ElasticsearchClearScrollResponse {
    pub succeeded: bool,
    pub num_freed: u64,
}
