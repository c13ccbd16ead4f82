pub mod error;

mod form;
mod order;
mod question;
mod session;
mod submission;

use model::{Form, FormSummary, MimeType, Question, QuestionType, Submission};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_postgres::{types::Json, Row, Transaction};

pub use futures_util::{TryStream, TryStreamExt};
pub use tokio_postgres::{tls::NoTls, Client, Config};

/// Shared handle to the database. Plain statements are pipelined through a shared borrow of the
/// client. Transactions take it exclusively so that no foreign statement lands inside them.
pub struct Database(RwLock<Client>);

impl From<Client> for Database {
    fn from(client: Client) -> Self {
        Self(RwLock::new(client))
    }
}

impl Database {
    async fn shared(&self) -> RwLockReadGuard<'_, Client> {
        self.0.read().await
    }

    async fn exclusive(&self) -> RwLockWriteGuard<'_, Client> {
        self.0.write().await
    }
}

macro_rules! question_columns {
    () => {
        "id, form_id, title, label, position, kind, required, choices, multiple, file_max_count, mime_types, deleted, answered"
    };
}

macro_rules! form_columns {
    () => {
        "id, title, description, inactive, author, created_on, last_updated"
    };
}

pub(crate) use {form_columns, question_columns};

/// Serializes all writers of one form's question ordering until the transaction ends.
async fn lock_form(tx: &Transaction<'_>, form: i32) -> error::Result<()> {
    tx.execute("SELECT pg_advisory_xact_lock($1)", &[&i64::from(form)]).await?;
    Ok(())
}

fn deserialize_question_from_row(row: &Row) -> error::Result<Question> {
    let kind: &str = row.try_get("kind")?;
    let kind = QuestionType::parse(kind).ok_or_else(|| {
        log::error!("unknown question type {kind} in storage");
        error::Error::Fatal
    })?;

    let mime_types = row
        .try_get::<_, Option<Vec<&str>>>("mime_types")?
        .map(|labels| labels.into_iter().map(MimeType::parse).collect::<Option<Vec<_>>>().ok_or(error::Error::Fatal))
        .transpose()?;

    Ok(Question {
        id: row.try_get("id")?,
        form_id: row.try_get("form_id")?,
        title: row.try_get("title")?,
        label: row.try_get("label")?,
        order: row.try_get("position")?,
        kind,
        required: row.try_get("required")?,
        choices: row.try_get("choices")?,
        multiple: row.try_get("multiple")?,
        file_max_count: row.try_get("file_max_count")?,
        mime_types,
        deleted: row.try_get("deleted")?,
        answered: row.try_get("answered")?,
    })
}

fn deserialize_form_from_row(row: &Row, questions: Vec<Question>) -> error::Result<Form> {
    Ok(Form {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        inactive: row.try_get("inactive")?,
        author: row.try_get("author")?,
        created_on: row.try_get("created_on")?,
        last_updated: row.try_get("last_updated")?,
        questions,
    })
}

fn deserialize_summary_from_row(row: &Row) -> error::Result<FormSummary> {
    Ok(FormSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_on: row.try_get("created_on")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn deserialize_submission_from_row(row: &Row) -> error::Result<Submission> {
    let Json(answers) = row.try_get("answers")?;
    Ok(Submission {
        id: row.try_get("id")?,
        form_id: row.try_get("form_id")?,
        answers,
        created_on: row.try_get("created_on")?,
    })
}
