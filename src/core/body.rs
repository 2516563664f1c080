//! Read-once, view-many request bodies
//!
//! The middleware needs to look at a request body and still hand an intact
//! body to the wrapped handler. Instead of rewinding a stream, the body is
//! collected into [`Bytes`] once and every consumer gets its own [`Body`] view
//! over the same immutable buffer.

use axum::body::{Body, Bytes};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

/// Why a request body could not be mapped into a model instance
///
/// All variants produce the same client-visible response. The distinction is
/// kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingFailure {
    /// The body had no bytes
    #[error("request body is empty")]
    Empty,

    /// The body was the JSON literal `null`
    #[error("request body is JSON null")]
    Null,

    /// The body is not syntactically valid JSON
    #[error("request body is not valid JSON: {0}")]
    Syntax(String),

    /// The body is valid JSON that does not fit the model
    #[error("request body does not match the model: {0}")]
    Shape(String),

    /// The body stream failed or exceeded the size limit
    #[error("request body could not be read: {0}")]
    Unreadable(String),
}

impl MappingFailure {
    /// Short label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            MappingFailure::Empty => "empty",
            MappingFailure::Null => "null",
            MappingFailure::Syntax(_) => "syntax",
            MappingFailure::Shape(_) => "shape",
            MappingFailure::Unreadable(_) => "unreadable",
        }
    }

    fn from_json_error(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => MappingFailure::Shape(err.to_string()),
            Category::Syntax | Category::Eof => MappingFailure::Syntax(err.to_string()),
            Category::Io => MappingFailure::Unreadable(err.to_string()),
        }
    }
}

/// A request body held fully in memory
#[derive(Debug, Clone, Default)]
pub struct BufferedBody {
    bytes: Bytes,
}

impl BufferedBody {
    /// Collect `body` into memory, failing if it is larger than `limit` bytes
    pub async fn read(body: Body, limit: usize) -> Result<Self, MappingFailure> {
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| MappingFailure::Unreadable(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Wrap bytes that are already in memory
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A fresh body positioned at the first byte
    ///
    /// Views share the underlying buffer; reading one never affects another.
    pub fn view(&self) -> Body {
        Body::from(self.bytes.clone())
    }

    /// Consume the buffer into a body for the downstream handler
    pub fn into_body(self) -> Body {
        Body::from(self.bytes)
    }

    /// Deserialize the buffered bytes as JSON into `T`
    ///
    /// Whitespace-only input counts as [`MappingFailure::Empty`], and a bare
    /// `null` as [`MappingFailure::Null`], even when `T` itself could accept it.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, MappingFailure> {
        if self.bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(MappingFailure::Empty);
        }

        match serde_json::from_slice::<Option<T>>(&self.bytes) {
            Ok(Some(model)) => Ok(model),
            Ok(None) => Err(MappingFailure::Null),
            Err(e) => Err(MappingFailure::from_json_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Team {
        name: String,
        founded: i32,
    }

    #[test]
    fn test_parse_valid_model() {
        let body = BufferedBody::from_bytes(r#"{"name":"Ajax","founded":1900}"#);
        let team: Team = body.parse().unwrap();
        assert_eq!(
            team,
            Team {
                name: "Ajax".to_string(),
                founded: 1900
            }
        );
    }

    #[test]
    fn test_parse_empty_body() {
        let body = BufferedBody::from_bytes("");
        assert_eq!(body.parse::<Team>(), Err(MappingFailure::Empty));
    }

    #[test]
    fn test_parse_whitespace_body_is_empty() {
        let body = BufferedBody::from_bytes(" \n\t ");
        assert_eq!(body.parse::<Team>(), Err(MappingFailure::Empty));
    }

    #[test]
    fn test_parse_null_body() {
        let body = BufferedBody::from_bytes("null");
        assert_eq!(body.parse::<Team>(), Err(MappingFailure::Null));
    }

    #[test]
    fn test_parse_malformed_json_is_syntax() {
        let body = BufferedBody::from_bytes(r#"{"name": "Ajax""#);
        assert_eq!(body.parse::<Team>().unwrap_err().kind(), "syntax");
    }

    #[test]
    fn test_parse_wrong_shape_is_shape() {
        let body = BufferedBody::from_bytes(r#"{"name": 42, "founded": "soon"}"#);
        assert_eq!(body.parse::<Team>().unwrap_err().kind(), "shape");
    }

    #[test]
    fn test_parse_json_array_for_struct_is_shape() {
        let body = BufferedBody::from_bytes("[1, 2, 3]");
        assert_eq!(body.parse::<Team>().unwrap_err().kind(), "shape");
    }

    #[test]
    fn test_parse_does_not_consume_buffer() {
        let body = BufferedBody::from_bytes(r#"{"name":"Ajax","founded":1900}"#);
        let _first: Team = body.parse().unwrap();
        let second: Team = body.parse().unwrap();
        assert_eq!(second.name, "Ajax");
        assert_eq!(body.len(), 30);
    }

    #[tokio::test]
    async fn test_read_collects_body() {
        let body = BufferedBody::read(Body::from("hello"), 1024).await.unwrap();
        assert_eq!(body.bytes().as_ref(), b"hello");
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn test_read_over_limit_is_unreadable() {
        let failure = BufferedBody::read(Body::from("0123456789"), 4)
            .await
            .unwrap_err();
        assert_eq!(failure.kind(), "unreadable");
    }

    #[tokio::test]
    async fn test_views_are_independent() {
        let body = BufferedBody::from_bytes("payload");

        let first = axum::body::to_bytes(body.view(), usize::MAX).await.unwrap();
        let second = axum::body::to_bytes(body.view(), usize::MAX).await.unwrap();
        let last = axum::body::to_bytes(body.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(first.as_ref(), b"payload");
        assert_eq!(second.as_ref(), b"payload");
        assert_eq!(last.as_ref(), b"payload");
    }
}
