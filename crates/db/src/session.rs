use crate::{error::Result, Database};
use model::Uuid;

impl Database {
    /// Resolves the account behind an unexpired session.
    pub async fn get_session(&self, sid: Uuid) -> Result<Option<i32>> {
        let row = self
            .shared()
            .await
            .query_opt("SELECT account FROM session WHERE id = $1 AND expires > now()", &[&sid])
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("account")?),
            None => None,
        })
    }
}
