use crate::{
    error::{Error, Result},
    json, read_json,
    upload::{self, Received},
    App, Reply,
};
use db::TryStreamExt;
use hyper::{body::Incoming, header::CONTENT_TYPE, HeaderMap, StatusCode};
use model::{submission::Value, Question, Submission, Uuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON rendition of a submission without files.
#[derive(Debug, Deserialize)]
struct AnswersBody {
    #[serde(default)]
    answers: BTreeMap<String, Value>,
}

impl AnswersBody {
    /// Keys that are not question ids cannot match any question, so they are dropped here.
    fn into_received(self) -> Received {
        let answers = self.answers.into_iter().filter_map(|(key, value)| Some((Uuid::parse_str(&key).ok()?, value)));
        Received { answers: answers.collect(), files: BTreeMap::new() }
    }
}

#[derive(Serialize)]
struct SubmissionView {
    #[serde(flatten)]
    submission: Submission,
    questions: Vec<Question>,
}

impl App {
    pub(crate) async fn create_submission(&self, form: i32, headers: &HeaderMap, body: Incoming) -> Result<Reply> {
        let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or_default();
        let received = if content_type.starts_with("multipart/form-data") {
            let boundary = multer::parse_boundary(content_type)?;
            let uploads = self.db.file_questions_by_form(form).await?;
            upload::receive(body, boundary, &uploads, &self.uploads).await?
        } else {
            read_json::<AnswersBody>(body).await?.into_received()
        };

        let paths = received.paths();
        match self.db.create_submission(form, received.answers, received.files).await {
            Ok(submission) => json(StatusCode::CREATED, &submission),
            Err(err) => {
                upload::discard(&paths).await;
                Err(Error::from(err))
            }
        }
    }

    pub(crate) async fn get_submission(&self, id: i32) -> Result<Reply> {
        let (submission, questions) = self.db.get_submission(id).await?;
        json(StatusCode::OK, &SubmissionView { submission, questions })
    }

    pub(crate) async fn submissions_by_form(&self, form: i32) -> Result<Reply> {
        // Surface an unknown form as such rather than an empty listing.
        self.db.get_form(form).await?;
        let submissions: Vec<Submission> = self.db.submissions_by_form(form).await?.try_collect().await?;
        json(StatusCode::OK, &submissions)
    }
}
