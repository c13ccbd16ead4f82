use crate::{error::Result, json, App, Reply};
use hyper::StatusCode;
use model::{NewQuestion, QuestionPatch, Uuid};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Placement {
    id: Uuid,
    order: i32,
}

/// Per-item result of a bulk reorder.
#[derive(Debug, Serialize)]
struct Outcome {
    id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    moved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct Retired {
    id: Uuid,
    retirement: model::Retirement,
}

impl App {
    pub(crate) async fn create_question(&self, new: NewQuestion) -> Result<Reply> {
        let question = self.db.create_question(new).await?;
        json(StatusCode::CREATED, &question)
    }

    pub(crate) async fn get_question(&self, id: Uuid) -> Result<Reply> {
        let question = self.db.get_question(id).await?;
        json(StatusCode::OK, &question)
    }

    pub(crate) async fn questions_by_form(&self, form: i32) -> Result<Reply> {
        let questions = self.db.questions_by_form(form).await?;
        json(StatusCode::OK, &questions)
    }

    pub(crate) async fn update_question(&self, id: Uuid, patch: QuestionPatch) -> Result<Reply> {
        let question = self.db.update_question(id, patch).await?;
        json(StatusCode::OK, &question)
    }

    /// Each placement settles on its own. The reply lists every outcome.
    pub(crate) async fn reorder(&self, placements: Vec<Placement>) -> Result<Reply> {
        let pairs: Vec<_> = placements.into_iter().map(|Placement { id, order }| (id, order)).collect();
        let outcomes: Vec<_> = self
            .db
            .reorder(&pairs)
            .await
            .into_iter()
            .map(|(id, result)| match result {
                Ok(moved) => Outcome { id, moved: Some(moved), message: None },
                Err(err) => Outcome { id, moved: None, message: Some(err.to_string()) },
            })
            .collect();
        json(StatusCode::OK, &outcomes)
    }

    pub(crate) async fn delete_question(&self, id: Uuid) -> Result<Reply> {
        let retirement = self.db.delete_question(id).await?;
        json(StatusCode::OK, &Retired { id, retirement })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placements_deserialize_from_pairs() {
        let id = Uuid::from_u128(3);
        let body = format!(r#"[{{"id":"{id}","order":2}}]"#);
        let placements: Vec<Placement> = serde_json::from_str(&body).unwrap();
        assert_eq!(placements[0].id, id);
        assert_eq!(placements[0].order, 2);
    }

    #[test]
    fn outcomes_omit_absent_fields() {
        let id = Uuid::nil();
        let ok = serde_json::to_value(Outcome { id, moved: Some(true), message: None }).unwrap();
        assert_eq!(ok, serde_json::json!({ "id": id, "moved": true }));
        let err = serde_json::to_value(Outcome { id, moved: None, message: Some("Question not found.".into()) }).unwrap();
        assert_eq!(err, serde_json::json!({ "id": id, "message": "Question not found." }));
    }
}
