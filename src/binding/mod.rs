//! Request body binding.
//!
//! # Responsibilities
//! - Pick a decoder from the request `Content-Type`
//! - Decode JSON, url-encoded and multipart form bodies into typed values
//! - Split multipart bodies into text fields and uploaded files
//!
//! # Design Decisions
//! - Media type parameters (`; charset=utf-8`) are ignored for selection
//! - Bodies arrive fully buffered, so multipart parsing drives the
//!   parser to completion on the calling thread
//! - Repeated keys keep their first value when decoding into a struct
//! - Decoding failures are plain values; handlers decide whether to abort

use std::collections::HashSet;

use axum::body::Bytes;
use futures::future::ready;
use futures::stream::once;
use serde::de::DeserializeOwned;

pub const MIME_JSON: &str = "application/json";
pub const MIME_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_MULTIPART_FORM: &str = "multipart/form-data";

/// Errors produced while binding a request body.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("missing content type")]
    MissingContentType,
    #[error("non-existent binding for content type {0}")]
    UnsupportedContentType(String),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("no uploaded file for field {0}")]
    MissingFile(String),
}

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct FormFile {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl FormFile {
    /// Form field the file was sent under.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Client-supplied file name, unsanitized.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A parsed `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<FormFile>,
}

impl MultipartForm {
    /// Text fields in the order they were sent.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// First text value for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn files(&self) -> &[FormFile] {
        &self.files
    }

    /// First file uploaded under `key`.
    pub fn file(&self, key: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.field == key)
    }
}

/// Parse a buffered `multipart/form-data` body.
///
/// Parts with a file name are kept as files; everything else must be
/// UTF-8 text.
pub fn parse_multipart(content_type: &str, body: Bytes) -> Result<MultipartForm, BindingError> {
    let boundary = multer::parse_boundary(content_type)?;
    let stream = once(ready(Ok::<_, std::io::Error>(body)));
    let mut multipart = multer::Multipart::new(stream, boundary);

    futures::executor::block_on(async move {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(|m| m.to_string());
                    let data = field.bytes().await?;
                    form.files.push(FormFile {
                        field: name,
                        file_name: Some(file_name),
                        content_type,
                        data,
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.push((name, text));
                }
            }
        }
        Ok::<_, BindingError>(form)
    })
}

/// Decode key/value pairs into `T`, keeping the first value of each key.
pub fn decode_pairs<T, I>(pairs: I) -> Result<T, BindingError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    let mut seen = HashSet::new();
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.into_iter().filter(|(k, _)| seen.insert(k.clone())))
        .finish();
    Ok(serde_urlencoded::from_str(&encoded)?)
}

/// Body decoders keyed by media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Json,
    Form,
    MultipartForm,
}

impl Binding {
    /// Select a binding for a `Content-Type` header value.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        let media = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media.as_str() {
            MIME_JSON => Some(Binding::Json),
            MIME_FORM => Some(Binding::Form),
            MIME_MULTIPART_FORM => Some(Binding::MultipartForm),
            _ => None,
        }
    }

    /// Decode `body`. `content_type` carries the multipart boundary.
    pub fn decode<T: DeserializeOwned>(self, content_type: &str, body: &[u8]) -> Result<T, BindingError> {
        match self {
            Binding::Json => Ok(serde_json::from_slice(body)?),
            Binding::Form => Ok(serde_urlencoded::from_bytes(body)?),
            Binding::MultipartForm => {
                let form = parse_multipart(content_type, Bytes::copy_from_slice(body))?;
                decode_pairs(form.fields)
            }
        }
    }
}

/// Decode `body` using the binding selected by `content_type`.
pub fn bind<T: DeserializeOwned>(content_type: Option<&str>, body: &[u8]) -> Result<T, BindingError> {
    let content_type = content_type.ok_or(BindingError::MissingContentType)?;
    let binding = Binding::for_content_type(content_type)
        .ok_or_else(|| BindingError::UnsupportedContentType(content_type.to_string()))?;
    binding.decode(content_type, body)
}
