use thiserror::Error;

/// Errors surfaced by the query engine before it ever touches the
/// store — these map onto the HTTP layer's 400-class responses.
#[derive(Debug, PartialEq, Error)]
pub enum QueryError {
  #[error("query must contain at least one alphabetic token")]
  EmptyQuery,
}
