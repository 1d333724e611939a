//! Response bodies.
//!
//! A [`ResponseBody`] is either a single-use byte stream handed over by the
//! transport, an in-memory buffer, or a detached placeholder that only keeps
//! the content type and length of a body that was moved elsewhere.

use crate::error::CallError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

enum Source {
    Stream(Box<dyn Read + Send>),
    Buffered(Bytes),
    Detached,
}

/// Payload of a raw response.
pub struct ResponseBody {
    content_type: Option<String>,
    content_length: Option<u64>,
    source: Source,
}

impl ResponseBody {
    /// Create a streaming body
    pub fn new(
        content_type: Option<String>,
        content_length: Option<u64>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_type,
            content_length,
            source: Source::Stream(Box::new(reader)),
        }
    }

    /// Create an in-memory body
    pub fn from_bytes(content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_type,
            content_length: Some(bytes.len() as u64),
            source: Source::Buffered(bytes),
        }
    }

    /// Create an empty body
    pub fn empty() -> Self {
        Self::from_bytes(None, Bytes::new())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Whether this is a placeholder for a body that was taken away
    pub fn is_detached(&self) -> bool {
        matches!(self.source, Source::Detached)
    }

    /// Whether the whole payload is held in memory
    pub fn is_buffered(&self) -> bool {
        matches!(self.source, Source::Buffered(_))
    }

    /// The payload, if it is already in memory
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            Source::Buffered(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// Read the whole payload.
    ///
    /// A streaming source is drained once and kept in memory, so later calls
    /// return the same bytes without touching the source again.
    pub fn bytes(&mut self) -> Result<Bytes, CallError> {
        match std::mem::replace(&mut self.source, Source::Detached) {
            Source::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                let bytes = Bytes::from(buf);
                self.content_length.get_or_insert(bytes.len() as u64);
                self.source = Source::Buffered(bytes.clone());
                Ok(bytes)
            }
            Source::Buffered(bytes) => {
                self.source = Source::Buffered(bytes.clone());
                Ok(bytes)
            }
            Source::Detached => Err(detached()),
        }
    }

    /// Read the whole payload as UTF-8 text
    pub fn text(&mut self) -> Result<String, CallError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CallError::conversion(format!("Body is not valid UTF-8: {e}")))
    }

    /// Turn the body into a reader over its payload
    pub fn into_reader(self) -> Result<Box<dyn Read + Send>, CallError> {
        match self.source {
            Source::Stream(reader) => Ok(reader),
            Source::Buffered(bytes) => Ok(Box::new(Cursor::new(bytes))),
            Source::Detached => Err(detached()),
        }
    }

    /// Read the payload into memory and release the source
    pub fn buffer(mut self) -> Result<Self, CallError> {
        self.bytes()?;
        Ok(self)
    }

    /// Move the payload out, leaving a placeholder with the same metadata.
    pub(crate) fn detach(&mut self) -> Self {
        let placeholder = Self {
            content_type: self.content_type.clone(),
            content_length: self.content_length,
            source: Source::Detached,
        };
        std::mem::replace(self, placeholder)
    }

    /// Wrap the source so I/O failures raised while a converter reads are
    /// recorded in the returned slot.
    pub(crate) fn catching(self) -> (Self, CaughtError) {
        let caught = CaughtError::default();
        let source = match self.source {
            Source::Stream(inner) => Source::Stream(Box::new(CatchingReader {
                inner,
                caught: caught.clone(),
            })),
            other => other,
        };
        let body = Self {
            content_type: self.content_type,
            content_length: self.content_length,
            source,
        };
        (body, caught)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.source {
            Source::Stream(_) => "stream",
            Source::Buffered(_) => "buffered",
            Source::Detached => "detached",
        };
        f.debug_struct("ResponseBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("state", &state)
            .finish()
    }
}

fn detached() -> CallError {
    CallError::illegal_state("Cannot read raw response body of a converted body.")
}

/// Slot holding the first I/O failure seen by a [`CatchingReader`].
#[derive(Clone, Default)]
pub(crate) struct CaughtError(Arc<Mutex<Option<io::Error>>>);

impl CaughtError {
    pub(crate) fn take(&self) -> Option<CallError> {
        self.0.lock().take().map(CallError::from)
    }
}

struct CatchingReader {
    inner: Box<dyn Read + Send>,
    caught: CaughtError,
}

impl Read for CatchingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != io::ErrorKind::Interrupted => {
                // The converter gets a copy; the original is kept for the caller.
                let echo = io::Error::new(e.kind(), e.to_string());
                let mut slot = self.caught.0.lock();
                if slot.is_none() {
                    *slot = Some(e);
                }
                Err(echo)
            }
            other => other,
        }
    }
}
