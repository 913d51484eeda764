//! The upload request handler: one state machine per request, no state
//! shared across requests besides the upload directory on disk.

use std::{fs, io, path::PathBuf};

use http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Method, Request, Response, StatusCode,
};
use thiserror::Error;

use crate::{multipart, response::Body};

const UPLOAD_FORM: &str = "\
<!DOCTYPE html>
<html>
<head><title>Upload File</title></head>
<body>
    <h1>Upload a File</h1>
    <form action=\"/\" method=\"post\" enctype=\"multipart/form-data\">
        <input type=\"file\" name=\"uploaded_file\">
        <input type=\"submit\" value=\"Upload\">
    </form>
</body>
</html>
";

#[derive(Error, Debug)]
enum UploadError {
    #[error("Method Not Allowed or Invalid Content-Type")]
    ProtocolMismatch,
    #[error("No file found in the upload.")]
    NoFile,
    #[error("missing or invalid Content-Length header")]
    BadContentLength,
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("unsafe filename: {0:?}")]
    UnsafeFilename(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::ProtocolMismatch => StatusCode::METHOD_NOT_ALLOWED,
            UploadError::NoFile => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Accepts `multipart/form-data` uploads and persists them under a fixed
/// directory. Cheap to clone, so every connection thread can carry its own
/// copy; concurrent uploads of the same filename race with last writer wins.
#[derive(Clone)]
pub struct UploadHandler {
    upload_dir: PathBuf,
}

impl UploadHandler {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    /// Maps one request to its response. Never fails: every error becomes a
    /// status-coded response, so a bad upload can't take the connection (or
    /// the process) down with it.
    pub fn respond(&self, req: Request<Vec<u8>>) -> Response<Body> {
        if req.method() != Method::POST {
            return serve_form();
        }

        match self.store_upload(req) {
            Ok(filename) => {
                tracing::debug!(filename = %filename, "upload stored");
                html_response(
                    StatusCode::OK,
                    format!("File '{filename}' uploaded successfully."),
                )
            }
            Err(err) => {
                tracing::warn!(status = %err.status(), "upload rejected: {err}");
                match err.status() {
                    StatusCode::INTERNAL_SERVER_ERROR => html_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Error processing upload: {err}"),
                    ),
                    status => html_response(status, err.to_string()),
                }
            }
        }
    }

    fn store_upload(&self, req: Request<Vec<u8>>) -> Result<String, UploadError> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if !content_type.starts_with("multipart/form-data") {
            return Err(UploadError::ProtocolMismatch);
        }

        // The body was read against the declared length; an upload that
        // never declared one (or garbled it) has no trustworthy body.
        req.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or(UploadError::BadContentLength)?;

        let boundary = multipart::boundary(content_type).ok_or(UploadError::MissingBoundary)?;

        let file = multipart::parse(req.body(), boundary.as_bytes()).ok_or(UploadError::NoFile)?;

        let filename = sanitize_filename(&file.filename)?;

        fs::create_dir_all(&self.upload_dir)?;
        fs::write(self.upload_dir.join(&filename), &file.content)?;

        Ok(filename)
    }
}

impl crate::App for UploadHandler {
    type Error = std::convert::Infallible;

    fn handle(&self, request: Request<Vec<u8>>) -> Result<Response<Body>, Self::Error> {
        Ok(self.respond(request))
    }
}

/// The read-only side of the server: any non-POST request gets the fixed
/// HTML upload form.
pub fn serve_form() -> Response<Body> {
    html_response(StatusCode::OK, UPLOAD_FORM)
}

fn html_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html")
        .body(body.into())
        .unwrap()
}

/// Clients get no say over where their file lands: keep only the final path
/// component of whatever name they sent, and refuse names that are nothing
/// but traversal.
fn sanitize_filename(raw: &str) -> Result<String, UploadError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadError::UnsafeFilename(raw.to_owned()));
    }

    Ok(name.to_owned())
}
