use crate::{
    deserialize_question_from_row, deserialize_submission_from_row,
    error::{Error, Result},
    lock_form, question_columns, Database,
};
use futures_util::{TryStream, TryStreamExt};
use model::{
    submission::{self, FileDescriptor, Validated, Value},
    Question, Submission, Uuid,
};
use std::collections::BTreeMap;
use tokio_postgres::types::Json;

impl Database {
    /// Validates the payload against a snapshot of the form's questions taken under the form
    /// lock, then persists the submission and flags the answered questions. Nothing is written
    /// unless every question passes.
    pub async fn create_submission(
        &self,
        form: i32,
        answers: BTreeMap<Uuid, Value>,
        files: BTreeMap<Uuid, Vec<FileDescriptor>>,
    ) -> Result<Submission> {
        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        lock_form(&tx, form).await?;

        if tx.query_opt("SELECT 1 FROM form WHERE id = $1", &[&form]).await?.is_none() {
            return Err(Error::FormNotFound);
        }

        let questions = tx
            .query(concat!("SELECT ", question_columns!(), " FROM question WHERE form_id = $1 ORDER BY position"), &[&form])
            .await?
            .iter()
            .map(deserialize_question_from_row)
            .collect::<Result<Vec<_>>>()?;

        let Validated { answers, answered } = submission::validate(&questions, answers, files).map_err(|err| {
            log::warn!("rejected submission to form {form}: {err}");
            Error::from(err)
        })?;

        let row = tx
            .query_one(
                "INSERT INTO submission (form_id, answers) VALUES ($1, $2) RETURNING id, form_id, answers, created_on",
                &[&form, &Json(&answers)],
            )
            .await?;
        tx.execute("UPDATE question SET answered = TRUE WHERE id = ANY($1) AND NOT answered", &[&answered]).await?;
        let submission = deserialize_submission_from_row(&row)?;
        tx.commit().await?;

        log::info!("stored submission {} to form {form} answering {} questions", submission.id, answered.len());
        Ok(submission)
    }

    /// The submission along with its form's questions sorted by order.
    pub async fn get_submission(&self, id: i32) -> Result<(Submission, Vec<Question>)> {
        let row = self
            .shared()
            .await
            .query_opt("SELECT id, form_id, answers, created_on FROM submission WHERE id = $1", &[&id])
            .await?
            .ok_or(Error::SubmissionNotFound)?;
        let submission = deserialize_submission_from_row(&row)?;
        let questions = self.questions_by_form(submission.form_id).await?;
        Ok((submission, questions))
    }

    /// Newest first.
    pub async fn submissions_by_form(&self, form: i32) -> Result<impl TryStream<Ok = Submission, Error = Error>> {
        Ok(self
            .shared()
            .await
            .query_raw(
                "SELECT id, form_id, answers, created_on FROM submission WHERE form_id = $1 ORDER BY id DESC",
                [&form],
            )
            .await?
            .map_err(Error::from)
            .and_then(|row| core::future::ready(deserialize_submission_from_row(&row))))
    }
}
