use std::io::{self, Write};

/// A fully buffered response body.
#[derive(Default)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn empty() -> Self {
        Body(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Body {
    fn from(body: Vec<u8>) -> Self {
        Self(body)
    }
}

impl From<&[u8]> for Body {
    fn from(body: &[u8]) -> Self {
        body.to_vec().into()
    }
}

impl From<&str> for Body {
    fn from(body: &str) -> Self {
        body.as_bytes().to_vec().into()
    }
}

impl From<String> for Body {
    fn from(body: String) -> Self {
        body.into_bytes().into()
    }
}

/// Serializes one response: status line, headers, and a `content-length`
/// derived from the buffered body (omitted when the body is empty).
pub(crate) fn write_response(res: http::Response<Body>, stream: &mut impl Write) -> io::Result<()> {
    let (parts, body) = res.into_parts();

    stream.write_all(format!("{:?} {}\r\n", parts.version, parts.status).as_bytes())?;

    for (name, val) in parts.headers.iter() {
        stream.write_all(&[format!("{name}: ").as_bytes(), val.as_bytes(), b"\r\n"].concat())?;
    }

    if !body.0.is_empty() {
        stream.write_all(format!("content-length: {}\r\n", body.0.len()).as_bytes())?;
    }

    stream.write_all(b"\r\n")?;
    stream.write_all(&body.0)?;

    Ok(())
}
