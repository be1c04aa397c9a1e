/// Decides whether a free-text query starts a live streaming session or is
/// answered by a single fetch.
pub trait StreamingPredicate: Send + Sync {
    fn is_streaming(&self, query: &str) -> bool;
}

impl<F> StreamingPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_streaming(&self, query: &str) -> bool {
        self(query)
    }
}

/// Case-insensitive keyword match.
///
/// A query streams when it contains any of `any_of`, or every keyword of at
/// least one group in `all_of`. The default mirrors the dashboard's rule:
/// "portfolio" or "retrieve", or both "yc" and "antler".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPredicate {
    any_of: Vec<String>,
    all_of: Vec<Vec<String>>,
}

impl Default for KeywordPredicate {
    fn default() -> Self {
        Self::new(
            ["portfolio", "retrieve"],
            [vec!["yc".to_string(), "antler".to_string()]],
        )
    }
}

impl KeywordPredicate {
    pub fn new<A, S, G>(any_of: A, all_of: G) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
        G: IntoIterator<Item = Vec<String>>,
    {
        Self {
            any_of: any_of
                .into_iter()
                .map(|keyword| keyword.into().to_lowercase())
                .collect(),
            all_of: all_of
                .into_iter()
                .map(|group| {
                    group
                        .into_iter()
                        .map(|keyword| keyword.to_lowercase())
                        .collect::<Vec<_>>()
                })
                .filter(|group| !group.is_empty())
                .collect(),
        }
    }
}

impl StreamingPredicate for KeywordPredicate {
    fn is_streaming(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.any_of.iter().any(|keyword| query.contains(keyword.as_str()))
            || self
                .all_of
                .iter()
                .any(|group| group.iter().all(|keyword| query.contains(keyword.as_str())))
    }
}
