//! Reconciles a raw answer payload against the question schema of a form.

use crate::question::{Question, QuestionType};
use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec::Vec,
};
use chrono::{DateTime, Utc};
use core::fmt::{self, Display};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw textual answer as it arrives from the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

/// Metadata of an upload that file reception has already written to storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
    pub path: String,
}

/// A validated answer, shaped by the type of the question it answers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Free text, or a single selection submitted as a scalar.
    Text(String),
    /// Selections drawn from the question's own choices.
    Choices(Vec<String>),
    Files(Vec<FileDescriptor>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i32,
    pub form_id: i32,
    pub answers: BTreeMap<Uuid, Answer>,
    pub created_on: DateTime<Utc>,
}

/// Output of a successful validation: the answers to persist and the questions to flag as
/// answered, in form order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validated {
    pub answers: BTreeMap<Uuid, Answer>,
    pub answered: Vec<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    NoQuestions,
    EmptyPayload,
    RequiredFieldMissing(Uuid),
    MultipleNotAllowed(Uuid),
    /// Covers both a value outside the question's choices and a repeated value.
    InvalidChoice { question: Uuid, value: String, allowed: Vec<String> },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQuestions => f.write_str("There are no questions in this form."),
            Self::EmptyPayload => f.write_str("The submitted form is empty."),
            Self::RequiredFieldMissing(id) => write!(f, "Question '{id}' is required."),
            Self::MultipleNotAllowed(id) => write!(f, "Question '{id}' does not allow multiple values."),
            Self::InvalidChoice { question, value, allowed } => {
                write!(f, "Question '{question}' does not allow the option '{value}'. It only allows the choices: {{")?;
                for (i, choice) in allowed.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(choice)?;
                }
                f.write_str("}. Be careful of duplicates.")
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, ValidationError>;

/// Validates a payload against every question of a form. Archived questions are skipped and
/// never required. Entries keyed by anything other than a live question are dropped.
///
/// Nothing is returned unless every question passes.
pub fn validate(
    questions: &[Question],
    mut answers: BTreeMap<Uuid, Value>,
    mut files: BTreeMap<Uuid, Vec<FileDescriptor>>,
) -> Result<Validated> {
    if questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }

    if answers.is_empty() && files.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }

    let mut validated = Validated::default();
    for question in questions.iter().filter(|q| !q.deleted) {
        let answer = if question.kind == QuestionType::FileInput {
            files.remove(&question.id).map(Answer::Files)
        } else {
            answers.remove(&question.id).map(|value| check_value(question, value)).transpose()?
        };

        let Some(answer) = answer else {
            if question.required {
                return Err(ValidationError::RequiredFieldMissing(question.id));
            }
            continue;
        };

        validated.answers.insert(question.id, answer);
        validated.answered.push(question.id);
    }

    Ok(validated)
}

fn check_value(question: &Question, value: Value) -> Result<Answer> {
    let allowed = question.choices();
    match value {
        Value::List(values) => {
            if !question.is_multiple() && values.len() > 1 {
                return Err(ValidationError::MultipleNotAllowed(question.id));
            }

            let mut seen = BTreeSet::new();
            for value in &values {
                if !allowed.contains(value) || !seen.insert(value.as_str()) {
                    return Err(invalid_choice(question, value));
                }
            }

            Ok(Answer::Choices(values))
        }
        Value::Text(text) => {
            if question.choices.is_some() && !allowed.contains(&text) {
                return Err(invalid_choice(question, &text));
            }
            Ok(Answer::Text(text))
        }
    }
}

fn invalid_choice(question: &Question, value: &str) -> ValidationError {
    ValidationError::InvalidChoice { question: question.id, value: value.into(), allowed: question.choices().to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{tests::question, MimeType};
    use alloc::{string::ToString, vec};

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    fn list(values: &[&str]) -> Value {
        Value::List(values.iter().map(|v| v.to_string()).collect())
    }

    fn fruit(order: i32, multiple: bool) -> Question {
        let mut q = question(QuestionType::Checkbox, order);
        q.choices = Some(vec!["Apple".to_string(), "Banana".to_string()]);
        q.multiple = Some(multiple);
        q
    }

    fn upload(order: i32) -> Question {
        let mut q = question(QuestionType::FileInput, order);
        q.file_max_count = Some(2);
        q.mime_types = Some(vec![MimeType::Pdf]);
        q
    }

    fn resume() -> FileDescriptor {
        FileDescriptor {
            original_name: "resume.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            size: 2048,
            path: "files/1700000000000-resume.pdf".to_string(),
        }
    }

    fn answers(entries: &[(&Question, Value)]) -> BTreeMap<Uuid, Value> {
        entries.iter().map(|(q, v)| (q.id, v.clone())).collect()
    }

    #[test]
    fn form_without_questions_is_rejected() {
        let payload = BTreeMap::from([(Uuid::from_u128(1), text("hi"))]);
        assert_eq!(validate(&[], payload, BTreeMap::new()), Err(ValidationError::NoQuestions));
    }

    #[test]
    fn empty_payload_is_rejected() {
        let questions = [question(QuestionType::TextInput, 1)];
        assert_eq!(validate(&questions, BTreeMap::new(), BTreeMap::new()), Err(ValidationError::EmptyPayload));
    }

    #[test]
    fn missing_required_question_is_named() {
        let name = question(QuestionType::TextInput, 1);
        let mut email = question(QuestionType::TextInput, 2);
        email.required = true;
        let payload = answers(&[(&name, text("Ada"))]);
        let err = validate(&[name, email.clone()], payload, BTreeMap::new()).unwrap_err();
        assert_eq!(err, ValidationError::RequiredFieldMissing(email.id));
    }

    #[test]
    fn optional_questions_may_be_skipped() {
        let name = question(QuestionType::TextInput, 1);
        let note = question(QuestionType::TextArea, 2);
        let payload = answers(&[(&name, text("Ada"))]);
        let validated = validate(&[name.clone(), note], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answered, [name.id]);
        assert_eq!(validated.answers.get(&name.id), Some(&Answer::Text("Ada".to_string())));
    }

    #[test]
    fn archived_required_question_is_never_missing() {
        let name = question(QuestionType::TextInput, 1);
        let mut old = question(QuestionType::TextInput, 2);
        old.required = true;
        old.deleted = true;
        let payload = answers(&[(&name, text("Ada")), (&old, text("stale"))]);
        let validated = validate(&[name.clone(), old.clone()], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answered, [name.id]);
        assert!(!validated.answers.contains_key(&old.id));
    }

    #[test]
    fn non_multiple_question_rejects_two_values() {
        let q = fruit(1, false);
        let payload = answers(&[(&q, list(&["Apple", "Banana"]))]);
        assert_eq!(validate(&[q.clone()], payload, BTreeMap::new()), Err(ValidationError::MultipleNotAllowed(q.id)));
    }

    #[test]
    fn non_multiple_question_accepts_single_element_list() {
        let q = fruit(1, false);
        let payload = answers(&[(&q, list(&["Banana"]))]);
        let validated = validate(&[q.clone()], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answers[&q.id], Answer::Choices(vec!["Banana".to_string()]));
    }

    #[test]
    fn duplicate_selection_is_invalid() {
        let q = fruit(1, true);
        let payload = answers(&[(&q, list(&["Apple", "Apple"]))]);
        let err = validate(&[q.clone()], payload, BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidChoice {
                question: q.id,
                value: "Apple".to_string(),
                allowed: vec!["Apple".to_string(), "Banana".to_string()],
            }
        );
    }

    #[test]
    fn selection_outside_choices_is_invalid() {
        let q = fruit(1, true);
        let payload = answers(&[(&q, list(&["Apple", "Cherry"]))]);
        let err = validate(&[q.clone()], payload, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChoice { value, .. } if value == "Cherry"));
    }

    #[test]
    fn distinct_valid_selections_pass() {
        let q = fruit(1, true);
        let payload = answers(&[(&q, list(&["Apple", "Banana"]))]);
        let validated = validate(&[q.clone()], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answers[&q.id], Answer::Choices(vec!["Apple".to_string(), "Banana".to_string()]));
    }

    #[test]
    fn choices_are_scoped_to_their_own_question() {
        let fruits = fruit(1, true);
        let mut colours = question(QuestionType::Dropdown, 2);
        colours.choices = Some(vec!["Red".to_string(), "Cherry".to_string()]);
        colours.multiple = Some(true);

        // "Cherry" belongs to another question of the same form, which must not make it valid here.
        let payload = answers(&[(&fruits, list(&["Cherry"]))]);
        let err = validate(&[fruits.clone(), colours], payload, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChoice { question, .. } if question == fruits.id));
    }

    #[test]
    fn scalar_must_be_one_of_the_choices() {
        let mut q = question(QuestionType::Radio, 1);
        q.choices = Some(vec!["Yes".to_string(), "No".to_string()]);
        let payload = answers(&[(&q, text("Maybe"))]);
        assert!(matches!(
            validate(&[q.clone()], payload, BTreeMap::new()),
            Err(ValidationError::InvalidChoice { .. })
        ));

        let payload = answers(&[(&q, text("No"))]);
        let validated = validate(&[q.clone()], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answers[&q.id], Answer::Text("No".to_string()));
    }

    #[test]
    fn list_for_free_text_question_is_invalid() {
        let q = question(QuestionType::TextInput, 1);
        let payload = answers(&[(&q, list(&["a"]))]);
        assert!(matches!(
            validate(&[q], payload, BTreeMap::new()),
            Err(ValidationError::InvalidChoice { allowed, .. }) if allowed.is_empty()
        ));
    }

    #[test]
    fn files_pass_through_unchanged() {
        let mut q = upload(1);
        q.required = true;
        let files = BTreeMap::from([(q.id, vec![resume()])]);
        let validated = validate(&[q.clone()], BTreeMap::new(), files).unwrap();
        assert_eq!(validated.answers[&q.id], Answer::Files(vec![resume()]));
        assert_eq!(validated.answered, [q.id]);
    }

    #[test]
    fn required_upload_needs_a_file_entry() {
        let mut q = upload(1);
        q.required = true;
        let other = question(QuestionType::TextInput, 2);
        let payload = answers(&[(&other, text("hello")), (&q, text("not a file"))]);
        assert_eq!(
            validate(&[q.clone(), other], payload, BTreeMap::new()),
            Err(ValidationError::RequiredFieldMissing(q.id))
        );
    }

    #[test]
    fn one_failure_discards_everything() {
        let name = question(QuestionType::TextInput, 1);
        let choice = fruit(2, false);
        let payload = answers(&[(&name, text("Ada")), (&choice, list(&["Apple", "Banana"]))]);
        let result = validate(&[name, choice], payload, BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let name = question(QuestionType::TextInput, 1);
        let mut payload = answers(&[(&name, text("Ada"))]);
        payload.insert(Uuid::from_u128(999), text("stray"));
        let validated = validate(&[name.clone()], payload, BTreeMap::new()).unwrap();
        assert_eq!(validated.answers.len(), 1);
        assert!(validated.answers.contains_key(&name.id));
    }

    #[test]
    fn answers_serialize_in_stored_shape() {
        let json = serde_json::to_string(&Answer::Choices(vec!["A".to_string()])).unwrap();
        assert_eq!(json, r#"["A"]"#);
        let json = serde_json::to_string(&Answer::Text("A".to_string())).unwrap();
        assert_eq!(json, r#""A""#);
        let files: Answer = serde_json::from_str(
            r#"[{"originalName":"a.txt","mimetype":"text/plain","size":3,"path":"files/1-a.txt"}]"#,
        )
        .unwrap();
        assert!(matches!(files, Answer::Files(f) if f[0].size == 3));
    }

    #[test]
    fn invalid_choice_message_lists_choices() {
        let err = ValidationError::InvalidChoice {
            question: Uuid::nil(),
            value: "Cherry".to_string(),
            allowed: vec!["Apple".to_string(), "Banana".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("'Cherry'"));
        assert!(message.contains("{Apple, Banana}"));
    }
}
