pub mod error;

mod form;
mod question;
mod submission;
mod upload;

mod util {
    pub mod session;
}

use db::Database;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    HeaderMap, Method, Request, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;

pub type Reply = Response<Full<Bytes>>;

pub struct App {
    db: Database,
    uploads: PathBuf,
}

impl App {
    pub fn new(db: Database, uploads: impl Into<PathBuf>) -> Self {
        Self { db, uploads: uploads.into() }
    }

    /// Routes a request and renders any failure as a JSON error message.
    pub async fn try_respond(&self, req: Request<Incoming>) -> Reply {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        match self.route(req).await {
            Ok(res) => res,
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    log::error!("{method} {path} failed: {err}");
                } else {
                    log::warn!("{method} {path} rejected with {status}: {err}");
                }
                let message = serde_json::json!({ "message": err.to_string() });
                json(status, &message).unwrap_or_else(|_| fallback())
            }
        }
    }

    async fn route(&self, req: Request<Incoming>) -> error::Result<Reply> {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().trim_matches('/');
        let segments: Vec<_> = path.split('/').collect();
        let query = parts.uri.query().unwrap_or_default();

        match (&parts.method, segments.as_slice()) {
            (&Method::POST, ["form"]) => {
                let author = self.authenticate(&parts.headers).await?;
                self.create_form(author, read_json(body).await?).await
            }
            (&Method::GET, ["form"]) => self.list_forms(query).await,
            (&Method::GET, ["form", id]) => self.get_form(parse_form_id(id)?).await,
            (&Method::PATCH, ["form", id]) => {
                self.authenticate(&parts.headers).await?;
                self.update_form(parse_form_id(id)?, read_json(body).await?).await
            }
            (&Method::DELETE, ["form", id]) => {
                self.authenticate(&parts.headers).await?;
                self.delete_form(parse_form_id(id)?).await
            }
            (&Method::POST, ["question"]) => {
                self.authenticate(&parts.headers).await?;
                self.create_question(read_json(body).await?).await
            }
            (&Method::PATCH, ["question", "reorder"]) => {
                self.authenticate(&parts.headers).await?;
                self.reorder(read_json(body).await?).await
            }
            (&Method::GET, ["question", "form", id]) => self.questions_by_form(parse_form_id(id)?).await,
            (&Method::GET, ["question", id]) => self.get_question(parse_question_id(id)?).await,
            (&Method::PATCH, ["question", id]) => {
                self.authenticate(&parts.headers).await?;
                self.update_question(parse_question_id(id)?, read_json(body).await?).await
            }
            (&Method::DELETE, ["question", id]) => {
                self.authenticate(&parts.headers).await?;
                self.delete_question(parse_question_id(id)?).await
            }
            (&Method::POST, ["submission", form]) => {
                self.create_submission(parse_form_id(form)?, &parts.headers, body).await
            }
            (&Method::GET, ["submission", "form", form]) => {
                self.authenticate(&parts.headers).await?;
                self.submissions_by_form(parse_form_id(form)?).await
            }
            (&Method::GET, ["submission", id]) => {
                self.authenticate(&parts.headers).await?;
                self.get_submission(parse_form_id(id)?).await
            }
            _ => Err(error::Error::NoRoute),
        }
    }

    /// Resolves the account behind the `sid` cookie.
    async fn authenticate(&self, headers: &HeaderMap) -> error::Result<i32> {
        let sid = util::session::extract_session(headers)?;
        self.db.get_session(sid).await?.ok_or(error::Error::Unauthorized)
    }
}

fn parse_form_id(id: &str) -> error::Result<i32> {
    id.parse().map_err(|_| error::Error::BadParams)
}

fn parse_question_id(id: &str) -> error::Result<model::Uuid> {
    model::Uuid::parse_str(id).map_err(|_| error::Error::BadParams)
}

/// Looks up a `key=value` pair of the query string.
fn query_param<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query.split('&').filter_map(|chunk| chunk.split_once('=')).find_map(|(k, v)| (k == key).then_some(v))
}

async fn read_json<T: DeserializeOwned>(body: Incoming) -> error::Result<T> {
    let bytes = body.collect().await.map_err(|_| error::Error::BadBody)?.to_bytes();
    serde_json::from_slice(&bytes).map_err(|err| {
        log::debug!("malformed request body: {err}");
        error::Error::BadBody
    })
}

fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> error::Result<Reply> {
    let bytes = serde_json::to_vec(value).map_err(|err| {
        log::error!("cannot serialize response: {err}");
        error::Error::Fatal
    })?;
    let mut res = Response::new(Full::new(Bytes::from(bytes)));
    *res.status_mut() = status;
    assert!(res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json")).is_none());
    Ok(res)
}

fn empty(status: StatusCode) -> Reply {
    let mut res = Response::new(Full::default());
    *res.status_mut() = status;
    res
}

fn fallback() -> Reply {
    empty(StatusCode::INTERNAL_SERVER_ERROR)
}
