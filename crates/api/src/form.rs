use crate::{empty, error::Result, json, query_param, App, Reply};
use db::TryStreamExt;
use hyper::StatusCode;
use model::{FormPatch, FormSummary, NewForm};

const DEFAULT_TAKE: i64 = 20;

/// Reads `take` and `skip` from the query string. Negative or malformed values fall back to
/// the defaults.
fn pagination(query: &str) -> (i64, i64) {
    let read = |key: &str| query_param(query, key).and_then(|v| v.parse::<i64>().ok()).filter(|&v| v >= 0);
    (read("take").unwrap_or(DEFAULT_TAKE), read("skip").unwrap_or_default())
}

impl App {
    pub(crate) async fn create_form(&self, author: i32, new: NewForm) -> Result<Reply> {
        let form = self.db.create_form(author, &new).await?;
        json(StatusCode::CREATED, &form)
    }

    pub(crate) async fn list_forms(&self, query: &str) -> Result<Reply> {
        let (take, skip) = pagination(query);
        let forms: Vec<FormSummary> = self.db.list_forms(take, skip).await?.try_collect().await?;
        json(StatusCode::OK, &forms)
    }

    pub(crate) async fn get_form(&self, id: i32) -> Result<Reply> {
        let form = self.db.get_form(id).await?;
        json(StatusCode::OK, &form)
    }

    pub(crate) async fn update_form(&self, id: i32, patch: FormPatch) -> Result<Reply> {
        let form = if patch.is_empty() { self.db.get_form(id).await? } else { self.db.update_form(id, &patch).await? };
        json(StatusCode::OK, &form)
    }

    pub(crate) async fn delete_form(&self, id: i32) -> Result<Reply> {
        self.db.delete_form(id).await?;
        log::info!("deleted form {id}");
        Ok(empty(StatusCode::NO_CONTENT))
    }
}
