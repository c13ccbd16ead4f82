use crate::{
    deserialize_question_from_row,
    error::{Error, Result},
    lock_form,
    order::{ensure_vacant, shift},
    question_columns, Database,
};
use model::{MimeType, NewQuestion, Question, QuestionPatch, Retirement, Uuid};

fn mime_labels(mime_types: Option<&[MimeType]>) -> Option<Vec<&'static str>> {
    mime_types.map(|mimes| mimes.iter().map(|mime| mime.as_str()).collect())
}

impl Database {
    /// Checks the new question against its type rules, claims its order, then inserts it.
    pub async fn create_question(&self, new: NewQuestion) -> Result<Question> {
        new.check()?;

        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        lock_form(&tx, new.form_id).await?;
        ensure_vacant(&tx, new.form_id, new.order).await?;

        let mime_types = mime_labels(new.mime_types.as_deref());
        let row = tx
            .query_one(
                "INSERT INTO question \
                 (form_id, title, label, position, kind, required, choices, multiple, file_max_count, mime_types) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
                &[
                    &new.form_id,
                    &new.title,
                    &new.label,
                    &new.order,
                    &new.kind.as_str(),
                    &new.required,
                    &new.choices,
                    &new.multiple,
                    &new.file_max_count,
                    &mime_types,
                ],
            )
            .await?;
        let id: Uuid = row.try_get("id")?;
        tx.commit().await?;

        log::info!("created question {id} at order {} of form {}", new.order, new.form_id);
        Ok(new.into_question(id))
    }

    pub async fn get_question(&self, id: Uuid) -> Result<Question> {
        let row = self
            .shared()
            .await
            .query_opt(concat!("SELECT ", question_columns!(), " FROM question WHERE id = $1"), &[&id])
            .await?
            .ok_or(Error::QuestionNotFound)?;
        deserialize_question_from_row(&row)
    }

    /// All questions of a form sorted by order, archived ones included.
    pub async fn questions_by_form(&self, form: i32) -> Result<Vec<Question>> {
        self.shared()
            .await
            .query(
                concat!("SELECT ", question_columns!(), " FROM question WHERE form_id = $1 ORDER BY deleted, position"),
                &[&form],
            )
            .await?
            .iter()
            .map(deserialize_question_from_row)
            .collect()
    }

    /// Live upload questions of a form, for vetting incoming files.
    pub async fn file_questions_by_form(&self, form: i32) -> Result<Vec<Question>> {
        self.shared()
            .await
            .query(
                concat!(
                    "SELECT ",
                    question_columns!(),
                    " FROM question WHERE form_id = $1 AND kind = 'FileInput' AND NOT deleted ORDER BY position"
                ),
                &[&form],
            )
            .await?
            .iter()
            .map(deserialize_question_from_row)
            .collect()
    }

    /// Merges the patch onto the stored question. A changed order goes through the move
    /// operation within the same transaction as the other columns.
    pub async fn update_question(&self, id: Uuid, patch: QuestionPatch) -> Result<Question> {
        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;

        let form: i32 = tx
            .query_opt("SELECT form_id FROM question WHERE id = $1 AND NOT deleted", &[&id])
            .await?
            .ok_or(Error::QuestionNotFound)?
            .try_get("form_id")?;
        lock_form(&tx, form).await?;

        let row = tx
            .query_opt(
                concat!("SELECT ", question_columns!(), " FROM question WHERE id = $1 AND NOT deleted FOR UPDATE"),
                &[&id],
            )
            .await?
            .ok_or(Error::QuestionNotFound)?;
        let current = deserialize_question_from_row(&row)?;
        let next = current.patched(patch)?;

        shift(&tx, form, id, current.order, next.order).await?;

        let mime_types = mime_labels(next.mime_types.as_deref());
        tx.execute(
            "UPDATE question SET title = $2, label = $3, required = $4, choices = $5, multiple = $6, \
             file_max_count = $7, mime_types = $8, last_updated = now() WHERE id = $1",
            &[
                &id,
                &next.title,
                &next.label,
                &next.required,
                &next.choices,
                &next.multiple,
                &next.file_max_count,
                &mime_types,
            ],
        )
        .await?;
        tx.commit().await?;
        Ok(next)
    }

    /// Removes a question. Unanswered questions lose their row while answered ones are
    /// archived so that old submissions still resolve.
    pub async fn delete_question(&self, id: Uuid) -> Result<Retirement> {
        let mut client = self.exclusive().await;
        let tx = client.transaction().await?;
        let row = tx
            .query_opt(concat!("SELECT ", question_columns!(), " FROM question WHERE id = $1 FOR UPDATE"), &[&id])
            .await?
            .ok_or(Error::QuestionNotFound)?;
        let question = deserialize_question_from_row(&row)?;
        let retirement = question.retire().ok_or(Error::QuestionNotFound)?;

        let statement = match retirement {
            Retirement::Deleted => "DELETE FROM question WHERE id = $1",
            Retirement::Archived => "UPDATE question SET deleted = TRUE, last_updated = now() WHERE id = $1",
        };
        match tx.execute(statement, &[&id]).await? {
            1 => (),
            0 => return Err(Error::QuestionNotFound),
            _ => return Err(Error::Fatal),
        }
        tx.commit().await?;

        log::info!("retired question {id} of form {}: {retirement:?}", question.form_id);
        Ok(retirement)
    }
}
