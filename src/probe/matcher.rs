/// Case-insensitive substring test of `keyword` in `body`
///
/// An empty keyword matches every body.
pub fn matches(body: &str, keyword: &str) -> bool {
    body.to_lowercase().contains(&keyword.to_lowercase())
}

/// Keyword matcher that lower-cases the keyword once for reuse across pages
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keyword: String,
    needle: String,
}

impl KeywordMatcher {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            needle: keyword.to_lowercase(),
        }
    }

    /// The keyword as given by the user
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_match(&self, body: &str) -> bool {
        body.to_lowercase().contains(&self.needle)
    }
}
