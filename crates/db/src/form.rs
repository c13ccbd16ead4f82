use crate::{
    deserialize_form_from_row, deserialize_summary_from_row,
    error::{Error, Result},
    form_columns, Database,
};
use futures_util::{TryStream, TryStreamExt};
use model::{Form, FormPatch, FormSummary, NewForm};

impl Database {
    pub async fn create_form(&self, author: i32, form: &NewForm) -> Result<Form> {
        let row = self
            .shared()
            .await
            .query_one(
                concat!(
                    "INSERT INTO form (title, description, author) VALUES ($1, $2, $3) RETURNING ",
                    form_columns!()
                ),
                &[&form.title, &form.description, &author],
            )
            .await?;
        let form = deserialize_form_from_row(&row, Vec::new())?;
        log::info!("account {author} created form {}", form.id);
        Ok(form)
    }

    /// The form along with all of its questions.
    pub async fn get_form(&self, id: i32) -> Result<Form> {
        let row = self
            .shared()
            .await
            .query_opt(concat!("SELECT ", form_columns!(), " FROM form WHERE id = $1"), &[&id])
            .await?
            .ok_or(Error::FormNotFound)?;
        let questions = self.questions_by_form(id).await?;
        deserialize_form_from_row(&row, questions)
    }

    pub async fn list_forms(
        &self,
        take: i64,
        skip: i64,
    ) -> Result<impl TryStream<Ok = FormSummary, Error = Error>> {
        Ok(self
            .shared()
            .await
            .query_raw(
                "SELECT id, title, created_on, last_updated FROM form ORDER BY id LIMIT $1 OFFSET $2",
                [&take, &skip],
            )
            .await?
            .map_err(Error::from)
            .and_then(|row| core::future::ready(deserialize_summary_from_row(&row))))
    }

    /// Only the fields present in the patch are written.
    pub async fn update_form(&self, id: i32, patch: &FormPatch) -> Result<Form> {
        let row = self
            .shared()
            .await
            .query_opt(
                concat!(
                    "UPDATE form SET title = COALESCE($2, title), description = COALESCE($3, description), \
                     inactive = COALESCE($4, inactive), last_updated = now() WHERE id = $1 RETURNING ",
                    form_columns!()
                ),
                &[&id, &patch.title, &patch.description, &patch.inactive],
            )
            .await?
            .ok_or(Error::FormNotFound)?;
        let questions = self.questions_by_form(id).await?;
        deserialize_form_from_row(&row, questions)
    }

    /// Questions and submissions of the form go along with it.
    pub async fn delete_form(&self, id: i32) -> Result<()> {
        match self.shared().await.execute("DELETE FROM form WHERE id = $1", &[&id]).await? {
            1 => Ok(()),
            0 => Err(Error::FormNotFound),
            _ => Err(Error::Fatal),
        }
    }
}
