//! Request/response bodies and the request-body replay capability.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use http::{Method, Request, Uri};

/// Readable body stream with an optional known length.
///
/// A body is empty only when its length is known to be zero; a stream of
/// unknown length counts as non-empty.
pub struct Body {
    reader: Box<dyn Read + Send>,
    len: Option<u64>,
}

impl Body {
    pub fn empty() -> Self {
        Self {
            reader: Box::new(io::empty()),
            len: Some(0),
        }
    }

    pub fn from_reader<R>(reader: R, len: Option<u64>) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            len,
        }
    }

    fn from_shared(bytes: Arc<[u8]>) -> Self {
        let len = bytes.len() as u64;
        Self::from_reader(Cursor::new(bytes), Some(len))
    }

    pub fn content_length(&self) -> Option<u64> {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Reads and discards at most `limit` bytes; returns how many were read.
    pub fn drain(&mut self, limit: u64) -> io::Result<u64> {
        io::copy(&mut (&mut self.reader).take(limit), &mut io::sink())
    }

    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len.unwrap_or(0).min(1 << 20) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").field("len", &self.len).finish()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self::from_reader(Cursor::new(bytes), Some(len))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::from_reader(Cursor::new(s.as_bytes()), Some(s.len() as u64))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_reader(Cursor::new(bytes), Some(bytes.len() as u64))
    }
}

/// Replay capability for a request body: returns a fresh, unread copy.
///
/// Stored in the request extensions. Transports that may send a request more
/// than once look it up and must fail when it is absent and the body is not empty.
#[derive(Clone)]
pub struct GetBody(Arc<dyn Fn() -> io::Result<Body> + Send + Sync>);

impl GetBody {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> io::Result<Body> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Replays an in-memory body.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self::new(move || Ok(Body::from_shared(Arc::clone(&bytes))))
    }

    pub fn get(&self) -> io::Result<Body> {
        (self.0)()
    }
}

impl fmt::Debug for GetBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GetBody(..)")
    }
}

/// Builds a request with an in-memory body that can be replayed on retries.
pub fn new_request<U>(
    method: Method,
    uri: U,
    body: impl Into<Vec<u8>>,
) -> Result<Request<Body>, http::Error>
where
    Uri: TryFrom<U>,
    <Uri as TryFrom<U>>::Error: Into<http::Error>,
{
    let bytes: Arc<[u8]> = body.into().into();
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(GetBody::from_bytes(Arc::clone(&bytes)))
        .body(Body::from_shared(bytes))
}
