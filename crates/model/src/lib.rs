#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod form;
pub mod order;
pub mod question;
pub mod rules;
pub mod submission;

pub use form::{Form, FormPatch, FormSummary, NewForm};
pub use question::{MimeType, NewQuestion, Question, QuestionPatch, QuestionType, Retirement};
pub use submission::{Answer, FileDescriptor, Submission, Validated, Value};
pub use uuid::Uuid;
