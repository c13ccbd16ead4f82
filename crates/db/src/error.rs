use core::fmt::{self, Display};
use model::{rules::SchemaError, submission::ValidationError};
use tokio_postgres::error::SqlState;

#[derive(Debug)]
pub enum Error {
    FormNotFound,
    QuestionNotFound,
    SubmissionNotFound,
    /// Another form already uses this title.
    DuplicateTitle,
    /// A live question of the same form already holds this order.
    DuplicateOrder,
    /// The question attributes do not fit the question type.
    Schema(SchemaError),
    /// The submission does not fit the form's questions.
    Rejected(ValidationError),
    /// Unrecoverable error.
    Fatal,
}

impl Error {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::FormNotFound | Self::QuestionNotFound | Self::SubmissionNotFound)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormNotFound => f.write_str("Form not found."),
            Self::QuestionNotFound => f.write_str("Question not found."),
            Self::SubmissionNotFound => f.write_str("Submission not found."),
            Self::DuplicateTitle => f.write_str("A form with this title already exists."),
            Self::DuplicateOrder => f.write_str("Another question of this form already holds this order."),
            Self::Schema(err) => Display::fmt(err, f),
            Self::Rejected(err) => Display::fmt(err, f),
            Self::Fatal => f.write_str("We encountered an unexpected database error on our end."),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Rejected(err)
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db) = err.as_db_error() {
            match (db.code(), db.constraint()) {
                (&SqlState::UNIQUE_VIOLATION, Some("form_title_key")) => return Self::DuplicateTitle,
                (&SqlState::EXCLUSION_VIOLATION, Some("question_position_excl")) => return Self::DuplicateOrder,
                (&SqlState::FOREIGN_KEY_VIOLATION, Some("question_form_id_fkey" | "submission_form_id_fkey")) => {
                    return Self::FormNotFound
                }
                _ => (),
            }
        }

        log::error!("unexpected database error: {err}");
        Self::Fatal
    }
}

pub type Result<T> = core::result::Result<T, Error>;
