//! Request bodies and the replicator that makes them replayable.
//!
//! A body arrives as whatever reader the caller supplied. Before dispatch it is
//! drained into `Bytes` once; from then on the request carries a cursor over
//! that buffer, which the local server reads during dispatch and which is
//! rewound afterwards so history and the caller see the full payload again.

use std::fmt;
use std::io::{self, Cursor, Read};

use bytes::Bytes;

/// A request body: an arbitrary stream or a rewindable in-memory buffer.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Stream(Box<dyn Read + Send>),
    Buffered(Cursor<Bytes>),
}

impl Body {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Inner::Stream(Box::new(reader)),
        }
    }

    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Inner::Buffered(Cursor::new(bytes.into())),
        }
    }

    /// Whether the body can be read again after `rewind`.
    pub fn is_replayable(&self) -> bool {
        matches!(self.inner, Inner::Buffered(_))
    }

    /// Moves a buffered body back to its first byte. Streams cannot rewind.
    pub fn rewind(&mut self) -> bool {
        match &mut self.inner {
            Inner::Buffered(cursor) => {
                cursor.set_position(0);
                true
            }
            Inner::Stream(_) => false,
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Stream(reader) => reader.read(buf),
            Inner::Buffered(cursor) => cursor.read(buf),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Stream(_) => f.write_str("Body::Stream(..)"),
            Inner::Buffered(cursor) => f
                .debug_struct("Body::Buffered")
                .field("len", &cursor.get_ref().len())
                .field("position", &cursor.position())
                .finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::buffered(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::buffered(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::buffered(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::buffered(text)
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::buffered(bytes)
    }
}

/// A body that failed mid-drain, handed back so it can be put back in place.
#[derive(Debug)]
pub(crate) struct DrainError {
    pub source: io::Error,
    pub body: Body,
}

/// Drains `body` from its current position into memory and closes it.
pub(crate) fn replicate(body: Body) -> Result<Bytes, DrainError> {
    match body.inner {
        Inner::Buffered(cursor) => {
            let start = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
            let bytes = cursor.into_inner();
            Ok(bytes.slice(start.min(bytes.len())..))
        }
        Inner::Stream(mut reader) => {
            let mut buf = Vec::new();
            match reader.read_to_end(&mut buf) {
                Ok(_) => Ok(Bytes::from(buf)),
                Err(source) => Err(DrainError {
                    source,
                    body: Body {
                        inner: Inner::Stream(reader),
                    },
                }),
            }
        }
    }
}
