#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to parse feed: {0}")]
    FeedParseFailed(#[from] feed_rs::parser::ParseFeedError),

    #[error("Failed to parse page: {message}")]
    PageParseFailed { message: String },

    #[error("The URL `{url}` has an invalid format.")]
    InvalidUrl { url: String },
}

impl From<wreq::Error> for FeedError {
    fn from(e: wreq::Error) -> Self {
        FeedError::RequestFailed(Box::new(e))
    }
}
