//! Multipart file reception. Files are vetted against the form's upload questions before they
//! touch the disk, so the validator only ever sees accepted descriptors.

use crate::error::{Error, Result};
use futures_util::TryStreamExt;
use http_body_util::BodyStream;
use hyper::body::Incoming;
use model::{
    submission::{FileDescriptor, Value},
    Question, Uuid,
};
use multer::{Field, Multipart};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::{fs, io::AsyncWriteExt};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Text answers and stored files of one submission request.
#[derive(Debug, Default)]
pub struct Received {
    pub answers: BTreeMap<Uuid, Value>,
    pub files: BTreeMap<Uuid, Vec<FileDescriptor>>,
}

impl Received {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.values().flatten().map(|file| PathBuf::from(&file.path)).collect()
    }
}

/// Removes stored uploads of a request that did not go through.
pub async fn discard(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path).await {
            log::warn!("cannot remove upload {}: {err}", path.display());
        }
    }
}

/// Adds a text part to the answers. A repeated name or a `[]` suffix turns the answer into a list.
pub fn accumulate(answers: &mut BTreeMap<Uuid, Value>, id: Uuid, text: String, list: bool) {
    use std::collections::btree_map::Entry;
    match answers.entry(id) {
        Entry::Vacant(entry) => {
            entry.insert(if list { Value::List(vec![text]) } else { Value::Text(text) });
        }
        Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::List(values) => values.push(text),
            Value::Text(first) => {
                let first = core::mem::take(first);
                entry.insert(Value::List(vec![first, text]));
            }
        },
    }
}

/// Reduces a client-supplied file name to a safe final path component.
pub fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        String::from("upload")
    } else {
        clean.to_owned()
    }
}

fn stored_name(original: &str) -> String {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
    format!("{millis}-{}", sanitize(original))
}

/// Splits a multipart field name into its question id and whether it was marked as a list.
fn parse_name(name: &str) -> (Option<Uuid>, bool) {
    let (name, list) = match name.strip_suffix("[]") {
        Some(name) => (name, true),
        None => (name, false),
    };
    (Uuid::parse_str(name).ok(), list)
}

/// Reads a multipart body. Text parts become raw answers while file parts are checked against
/// `uploads` (the form's live upload questions) and streamed into `dir`. On any rejection the
/// files stored so far are removed again.
pub async fn receive(body: Incoming, boundary: String, uploads: &[Question], dir: &Path) -> Result<Received> {
    let stream = BodyStream::new(body).try_filter_map(|frame| core::future::ready(Ok(frame.into_data().ok())));
    let mut multipart = Multipart::new(stream, boundary);

    let mut received = Received::default();
    if let Err(err) = read_fields(&mut multipart, uploads, dir, &mut received).await {
        discard(&received.paths()).await;
        return Err(err);
    }
    Ok(received)
}

async fn read_fields(
    multipart: &mut Multipart<'_>,
    uploads: &[Question],
    dir: &Path,
    received: &mut Received,
) -> Result<()> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        let (id, list) = parse_name(&name);

        if field.file_name().is_none() {
            let text = field.text().await?;
            match id {
                Some(id) => accumulate(&mut received.answers, id, text, list),
                None => log::debug!("dropping unknown field {name}"),
            }
            continue;
        }

        let question = id
            .and_then(|id| uploads.iter().find(|q| q.id == id))
            .ok_or_else(|| Error::UnexpectedFile(name.clone()))?;

        let mimetype = field.content_type().map_or_else(|| FALLBACK_CONTENT_TYPE.to_owned(), ToString::to_string);
        if !question.accepts_content_type(&mimetype) {
            return Err(Error::MimeTypeNotAllowed { question: question.id, mimetype });
        }

        let limit = question.file_limit();
        let stored = received.files.entry(question.id).or_default();
        if stored.len() >= limit {
            return Err(Error::TooManyFiles { question: question.id, limit });
        }

        let original_name = field.file_name().unwrap_or_default().to_owned();
        let path = dir.join(stored_name(&original_name));
        let size = match store(field, &path).await {
            Ok(size) => size,
            Err(err) => {
                discard(core::slice::from_ref(&path)).await;
                return Err(err);
            }
        };

        log::debug!("stored {size} bytes for question {} at {}", question.id, path.display());
        stored.push(FileDescriptor { original_name, mimetype, size, path: path.to_string_lossy().into_owned() });
    }
    Ok(())
}

async fn store(mut field: Field<'_>, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut size = 0;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(size)
}
