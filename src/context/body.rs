//! One-shot request body access.
//!
//! The transport body can be consumed exactly once, as text, as JSON or as a
//! stream. Any later read fails with [`BodyError::AlreadyConsumed`] instead of
//! yielding empty data.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use axum::body::{Body, BodyDataStream, Bytes};
use futures_util::StreamExt;
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;

/// How the body was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRead {
    Text,
    Json,
    Stream,
    Drained,
}

impl fmt::Display for BodyRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyRead::Text => "text",
            BodyRead::Json => "json",
            BodyRead::Stream => "stream",
            BodyRead::Drained => "drained",
        };
        f.write_str(name)
    }
}

/// Error type for body reads.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body already consumed as {0}")]
    AlreadyConsumed(BodyRead),

    #[error("request body exceeded {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("request body is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

enum BodySlot {
    Unread(Body),
    Consumed(BodyRead),
}

/// Guards the transport body behind a consumed flag.
pub(crate) struct BodyReader {
    slot: Mutex<BodySlot>,
    limit: usize,
}

impl BodyReader {
    pub(crate) fn new(body: Body, limit: usize) -> Self {
        Self {
            slot: Mutex::new(BodySlot::Unread(body)),
            limit,
        }
    }

    fn take(&self, read: BodyRead) -> Result<Body, BodyError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *slot, BodySlot::Consumed(read)) {
            BodySlot::Unread(body) => Ok(body),
            BodySlot::Consumed(previous) => {
                *slot = BodySlot::Consumed(previous);
                Err(BodyError::AlreadyConsumed(previous))
            }
        }
    }

    pub(crate) fn is_consumed(&self) -> bool {
        matches!(
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner),
            BodySlot::Consumed(_)
        )
    }

    pub(crate) async fn read_text(&self) -> Result<String, BodyError> {
        let body = self.take(BodyRead::Text)?;
        let bytes = collect(body, self.limit).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let body = self.take(BodyRead::Json)?;
        let bytes = collect(body, self.limit).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) fn read_stream(&self) -> Result<BodyDataStream, BodyError> {
        Ok(self.take(BodyRead::Stream)?.into_data_stream())
    }

    /// Discard an unread body. Returns the number of bytes drained, or
    /// `None` when the body was already consumed.
    ///
    /// Draining stops at the size limit; the remainder is dropped with the
    /// connection.
    pub(crate) async fn drain(&self) -> Option<usize> {
        let body = self.take(BodyRead::Drained).ok()?;
        let mut stream = body.into_data_stream();
        let mut drained = 0usize;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    drained += chunk.len();
                    if drained > self.limit {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        Some(drained)
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyReader")
            .field("consumed", &self.is_consumed())
            .field("limit", &self.limit)
            .finish()
    }
}

async fn collect(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let cause = e.into_inner();
        if is_length_limit(&*cause) {
            BodyError::TooLarge { limit }
        } else {
            BodyError::Read(axum::Error::new(cause))
        }
    })
}

fn is_length_limit(mut error: &(dyn StdError + 'static)) -> bool {
    loop {
        if error.is::<LengthLimitError>() {
            return true;
        }
        match error.source() {
            Some(source) => error = source,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_text_once() {
        let reader = BodyReader::new(Body::from("hello"), 1024);
        assert_eq!(reader.read_text().await.unwrap(), "hello");
        assert!(reader.is_consumed());

        let err = reader.read_text().await.unwrap_err();
        assert!(matches!(err, BodyError::AlreadyConsumed(BodyRead::Text)));
    }

    #[tokio::test]
    async fn test_second_read_with_other_representation_fails() {
        let reader = BodyReader::new(Body::from(r#"{"a":1}"#), 1024);
        let value: serde_json::Value = reader.read_json().await.unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));

        assert!(matches!(
            reader.read_stream(),
            Err(BodyError::AlreadyConsumed(BodyRead::Json))
        ));
        assert_eq!(
            reader.read_text().await.unwrap_err().to_string(),
            "request body already consumed as json"
        );
    }

    #[tokio::test]
    async fn test_limit_enforced() {
        let reader = BodyReader::new(Body::from("0123456789"), 4);
        assert!(matches!(
            reader.read_text().await,
            Err(BodyError::TooLarge { limit: 4 })
        ));
    }

    #[tokio::test]
    async fn test_limit_spans_chunks() {
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"012")),
            Ok(Bytes::from_static(b"345")),
        ]);
        let reader = BodyReader::new(Body::from_stream(chunks), 5);
        assert!(matches!(
            reader.read_text().await,
            Err(BodyError::TooLarge { limit: 5 })
        ));

        let reader = BodyReader::new(Body::from("01234"), 5);
        assert_eq!(reader.read_text().await.unwrap(), "01234");
    }

    #[tokio::test]
    async fn test_stream_failure_is_read_error() {
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let reader = BodyReader::new(Body::from_stream(chunks), 1024);
        assert!(matches!(reader.read_text().await, Err(BodyError::Read(_))));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let reader = BodyReader::new(Body::from("{nope"), 1024);
        let result: Result<serde_json::Value, _> = reader.read_json().await;
        assert!(matches!(result, Err(BodyError::InvalidJson(_))));
    }

    #[tokio::test]
    async fn test_drain_only_unread_bodies() {
        let reader = BodyReader::new(Body::from("abc"), 1024);
        assert_eq!(reader.drain().await, Some(3));
        assert_eq!(reader.drain().await, None);

        let reader = BodyReader::new(Body::from("abc"), 1024);
        let _ = reader.read_stream().unwrap();
        assert_eq!(reader.drain().await, None);
    }
}
