//! `multipart/form-data` bodies.
//!
//! Parts without a filename are plain form fields and become body values.
//! Parts with a filename are [`Upload`]s, keyed by field name; when a field
//! name repeats, the last part wins.
//!
//! Parsing goes through `multer`, which is stream based. The body is already
//! fully buffered, so it is fed as a single chunk and the parser is driven to
//! completion on the calling thread.

use crate::dispatcher::HttpError;
use futures::executor::block_on;
use futures::stream;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::future::ready;
use tracing::debug;

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Form field the file was sent under
    pub field: String,
    /// Client-supplied file name
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The content as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Files of one request, registered as the request-scoped `uploads`
/// dependency. Empty for anything but a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    files: BTreeMap<String, Upload>,
}

impl Uploads {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Upload> {
        self.files.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.files.contains_key(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Uploads ordered by field name.
    pub fn iter(&self) -> impl Iterator<Item = &Upload> {
        self.files.values()
    }
}

/// A decoded multipart body.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    /// Plain fields as JSON strings
    pub fields: Map<String, Value>,
    pub uploads: Uploads,
}

/// Decode `body` using the boundary named in `content_type`.
///
/// # Errors
///
/// A 400 [`HttpError`] when the boundary is missing or the body is not
/// well-formed multipart.
pub fn parse(content_type: &str, body: &[u8]) -> anyhow::Result<FormData> {
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;
    let source = stream::once(ready(Ok::<_, Infallible>(body.to_vec())));
    let mut multipart = multer::Multipart::new(source, boundary);

    let form = block_on(async move {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(malformed)?;
            match filename {
                Some(filename) => {
                    form.uploads.files.insert(
                        name.clone(),
                        Upload {
                            field: name,
                            filename,
                            content_type,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    form.fields.insert(name, Value::String(text));
                }
            }
        }
        Ok::<_, anyhow::Error>(form)
    })?;

    debug!(
        fields = form.fields.len(),
        uploads = form.uploads.len(),
        "Multipart body decoded"
    );
    Ok(form)
}

fn malformed(err: multer::Error) -> anyhow::Error {
    HttpError::bad_request(format!("malformed multipart body: {err}")).into()
}
