//! A minimal synchronous HTTP server for `multipart/form-data` file uploads.
//!
//! `GET` on any path serves a fixed HTML upload form; `POST` on any path
//! expects a multipart body, extracts the first file-bearing part with a
//! hand-written parser (see [`multipart`]), and writes it to the upload
//! directory. Every outcome is a plain-text, status-coded response.
//!
//! ```no_run
//! use updrop::{Server, UploadHandler};
//!
//! fn main() -> std::io::Result<()> {
//!     let handler = UploadHandler::new("uploaded_files");
//!     Server::bind("0.0.0.0:8000").serve(handler)
//! }
//! ```

pub mod config;
pub mod multipart;
mod request;
mod response;
pub mod server;
pub mod upload;

use std::{
    error::Error,
    io::{self, BufReader, BufWriter, Write},
    net::TcpStream,
};

pub use config::Config;
use headers::{HeaderMapExt, HeaderValue};
pub use http::{header, Method, Request, Response, StatusCode, Uri, Version};
use request::ParseError;
pub use response::Body;
pub use server::Server;
pub use upload::UploadHandler;

type IncomingRequest = Request<Vec<u8>>;

/// Maps [`Request`]s to [`Response`]s.
///
/// Usually you don't need to manually implement this trait, as its `Fn`
/// implementation might suffice most of the needs.
///
/// ```no_run
/// # use std::convert::Infallible;
/// # use updrop::{Body, Request, Response, Server, StatusCode};
/// fn app(_req: Request<Vec<u8>>) -> Result<Response<Body>, Infallible> {
///     Ok(Response::builder()
///         .status(StatusCode::OK)
///         .body(Body::empty())
///         .unwrap())
/// }
///
/// fn main() -> std::io::Result<()> {
///     Server::bind("0.0.0.0:8000").serve(app)
/// }
/// ```
pub trait App {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    fn handle(&self, request: IncomingRequest) -> Result<Response<Body>, Self::Error>;
}

impl<F, Err> App for F
where
    F: Fn(IncomingRequest) -> Result<Response<Body>, Err>,
    F: Sync + Send,
    F: Clone,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Error = Err;

    fn handle(&self, request: IncomingRequest) -> Result<Response<Body>, Self::Error> {
        self(request)
    }
}

pub(crate) fn serve<A: App>(stream: TcpStream, app: A) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    loop {
        match request::parse_request(&mut reader) {
            Ok(req) => {
                let asks_for_close = req
                    .headers()
                    .typed_get::<headers::Connection>()
                    .filter(|conn| conn.contains("close"))
                    .is_some();

                let asks_for_keep_alive = req
                    .headers()
                    .typed_get::<headers::Connection>()
                    .filter(|conn| conn.contains("keep-alive"))
                    .is_some();

                let version = req.version();

                let demands_close = match version {
                    Version::HTTP_10 => !asks_for_keep_alive,
                    _ => asks_for_close,
                };

                let mut res = app
                    .handle(req)
                    .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

                *res.version_mut() = version;

                if version == Version::HTTP_10 && !asks_for_keep_alive {
                    res.headers_mut()
                        .insert("connection", HeaderValue::from_static("close"));
                }

                response::write_response(res, &mut writer)?;
                writer.flush()?;

                if demands_close {
                    break;
                }
            }
            Err(ParseError::ConnectionClosed) => break,
            Err(err) => return Err(io::Error::new(io::ErrorKind::Other, err)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        thread,
    };

    use super::*;

    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn hello(_req: Request<Vec<u8>>) -> Result<Response<Body>, Infallible> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("hello"))
            .unwrap())
    }

    #[test]
    fn serves_a_request_over_a_socket() {
        let (mut client, server) = socket_pair();
        let handle = thread::spawn(move || serve(server, hello));

        client
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("hello"));
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn keeps_http11_connections_alive() {
        let (mut client, server) = socket_pair();
        let handle = thread::spawn(move || serve(server, hello));

        client
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert_eq!(2, response.matches("HTTP/1.1 200 OK").count());
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn answers_uploads_with_a_garbled_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let handler = UploadHandler::new(dir.path());

        let (mut client, server) = socket_pair();
        let handle = thread::spawn(move || serve(server, handler));

        client
            .write_all(
                b"POST / HTTP/1.1\r\n\
                  host: localhost\r\n\
                  connection: close\r\n\
                  content-type: multipart/form-data; boundary=bx\r\n\
                  content-length: abc\r\n\r\n",
            )
            .unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(response.contains("Error processing upload:"));
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn uploads_a_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let handler = UploadHandler::new(dir.path());

        let (mut client, server) = socket_pair();
        let handle = thread::spawn(move || serve(server, handler));

        let body = b"--bx\r\n\
            Content-Disposition: form-data; name=\"uploaded_file\"; filename=\"e2e.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            end to end\r\n\
            --bx--\r\n";

        client
            .write_all(
                format!(
                    "POST / HTTP/1.1\r\n\
                     host: localhost\r\n\
                     connection: close\r\n\
                     content-type: multipart/form-data; boundary=bx\r\n\
                     content-length: {}\r\n\r\n",
                    body.len()
                )
                .as_bytes(),
            )
            .unwrap();
        client.write_all(body).unwrap();

        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("File 'e2e.txt' uploaded successfully."));
        assert_eq!(
            b"end to end".as_slice(),
            std::fs::read(dir.path().join("e2e.txt")).unwrap()
        );
        handle.join().unwrap().unwrap();
    }
}
