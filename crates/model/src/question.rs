use crate::rules::{self, Attributes, SchemaError};
use alloc::{string::String, vec::Vec};
use core::fmt::{self, Display};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of input a question may render as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    TextArea,
    TextInput,
    Checkbox,
    Radio,
    Dropdown,
    FileInput,
}

impl QuestionType {
    pub const ALL: [Self; 6] =
        [Self::TextArea, Self::TextInput, Self::Checkbox, Self::Radio, Self::Dropdown, Self::FileInput];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextArea => "TextArea",
            Self::TextInput => "TextInput",
            Self::Checkbox => "Checkbox",
            Self::Radio => "Radio",
            Self::Dropdown => "Dropdown",
            Self::FileInput => "FileInput",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == text)
    }
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content types an upload question may accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "application/msword")]
    Doc,
    /// Stored truncated: the full `wordprocessingml.document` name does not fit an enum label.
    #[serde(rename = "application/vnd.openxmlformats-officedocument")]
    Docx,
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    Txt,
    #[serde(rename = "any")]
    Any,
}

impl MimeType {
    const DOCX_FULL: &'static str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const ALL: [Self; 5] = [Self::Doc, Self::Docx, Self::Pdf, Self::Txt, Self::Any];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doc => "application/msword",
            Self::Docx => "application/vnd.openxmlformats-officedocument",
            Self::Pdf => "application/pdf",
            Self::Txt => "text/plain",
            Self::Any => "any",
        }
    }

    /// Parses a stored label.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mime| mime.as_str() == label)
    }

    /// Resolves the stored label of an uploaded file's declared content type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence == Self::DOCX_FULL {
            return Some(Self::Docx);
        }
        Self::parse(essence).filter(|mime| *mime != Self::Any)
    }
}

/// What happens to a question once an author removes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Retirement {
    /// Nobody answered it yet, so the row itself goes away.
    Deleted,
    /// Submissions reference it, so the row stays behind a `deleted` flag.
    Archived,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub form_id: i32,
    pub title: String,
    pub label: Option<String>,
    pub order: i32,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    pub choices: Option<Vec<String>>,
    pub multiple: Option<bool>,
    pub file_max_count: Option<i32>,
    pub mime_types: Option<Vec<MimeType>>,
    /// Archived questions keep their row (and their stale order) for old submissions.
    pub deleted: bool,
    /// Set once any submission has referenced this question.
    pub answered: bool,
}

impl Question {
    pub const fn is_multiple(&self) -> bool {
        matches!(self.multiple, Some(true))
    }

    pub fn choices(&self) -> &[String] {
        self.choices.as_deref().unwrap_or_default()
    }

    /// Whether an upload of the given content type may be stored for this question.
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let Some(allowed) = self.mime_types.as_deref() else {
            return false;
        };
        if allowed.contains(&MimeType::Any) {
            return true;
        }
        MimeType::from_content_type(content_type).is_some_and(|mime| allowed.contains(&mime))
    }

    /// Maximum number of files a single submission may attach to this question.
    pub fn file_limit(&self) -> usize {
        self.file_max_count.and_then(|count| usize::try_from(count).ok()).unwrap_or_default()
    }

    /// The removal transition available from the current state. Archived questions cannot
    /// be retired a second time.
    pub const fn retire(&self) -> Option<Retirement> {
        if self.deleted {
            None
        } else if self.answered {
            Some(Retirement::Archived)
        } else {
            Some(Retirement::Deleted)
        }
    }

    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            choices: self.choices.as_deref(),
            multiple: self.multiple,
            file_max_count: self.file_max_count,
            mime_types: self.mime_types.as_deref(),
        }
    }

    /// Merges a patch onto a copy of this question and checks the result against the type
    /// rules. The type itself never changes.
    pub fn patched(&self, patch: QuestionPatch) -> Result<Self, SchemaError> {
        rules::check_present(self.kind, &patch.attributes())?;

        let QuestionPatch { title, label, order, required, choices, multiple, file_max_count, mime_types } = patch;
        let mut next = self.clone();
        if let Some(title) = title {
            next.title = title;
        }
        if let Some(label) = label {
            next.label = Some(label);
        }
        if let Some(order) = order {
            next.order = order;
        }
        if let Some(required) = required {
            next.required = required;
        }
        if choices.is_some() {
            next.choices = choices;
        }
        if multiple.is_some() {
            next.multiple = multiple;
        }
        if file_max_count.is_some() {
            next.file_max_count = file_max_count;
        }
        if mime_types.is_some() {
            next.mime_types = mime_types;
        }

        rules::check(next.kind, next.order, &next.attributes())?;
        Ok(next)
    }
}

/// Author-supplied schema for a new question.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewQuestion {
    pub form_id: i32,
    pub title: String,
    #[serde(default)]
    pub label: Option<String>,
    pub order: i32,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub multiple: Option<bool>,
    #[serde(default)]
    pub file_max_count: Option<i32>,
    #[serde(default)]
    pub mime_types: Option<Vec<MimeType>>,
}

impl NewQuestion {
    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            choices: self.choices.as_deref(),
            multiple: self.multiple,
            file_max_count: self.file_max_count,
            mime_types: self.mime_types.as_deref(),
        }
    }

    pub fn check(&self) -> Result<(), SchemaError> {
        rules::check(self.kind, self.order, &self.attributes())
    }

    pub fn into_question(self, id: Uuid) -> Question {
        let Self { form_id, title, label, order, kind, required, choices, multiple, file_max_count, mime_types } = self;
        Question {
            id,
            form_id,
            title,
            label,
            order,
            kind,
            required,
            choices,
            multiple,
            file_max_count,
            mime_types,
            deleted: false,
            answered: false,
        }
    }
}

/// Partial update of a question. Absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionPatch {
    pub title: Option<String>,
    pub label: Option<String>,
    pub order: Option<i32>,
    pub required: Option<bool>,
    pub choices: Option<Vec<String>>,
    pub multiple: Option<bool>,
    pub file_max_count: Option<i32>,
    pub mime_types: Option<Vec<MimeType>>,
}

impl QuestionPatch {
    pub fn attributes(&self) -> Attributes<'_> {
        Attributes {
            choices: self.choices.as_deref(),
            multiple: self.multiple,
            file_max_count: self.file_max_count,
            mime_types: self.mime_types.as_deref(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::{string::ToString, vec};

    pub(crate) fn question(kind: QuestionType, order: i32) -> Question {
        Question {
            id: Uuid::from_u128(order as u128),
            form_id: 1,
            title: "Question".to_string(),
            label: None,
            order,
            kind,
            required: false,
            choices: None,
            multiple: None,
            file_max_count: None,
            mime_types: None,
            deleted: false,
            answered: false,
        }
    }

    #[test]
    fn retirement_follows_answered_flag() {
        let mut q = question(QuestionType::TextInput, 1);
        assert_eq!(q.retire(), Some(Retirement::Deleted));
        q.answered = true;
        assert_eq!(q.retire(), Some(Retirement::Archived));
        q.deleted = true;
        assert_eq!(q.retire(), None);
    }

    #[test]
    fn docx_content_type_maps_to_truncated_label() {
        let full = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        assert_eq!(MimeType::from_content_type(full), Some(MimeType::Docx));
        assert_eq!(MimeType::from_content_type("text/plain; charset=utf-8"), Some(MimeType::Txt));
        assert_eq!(MimeType::from_content_type("image/png"), None);
        assert_eq!(MimeType::from_content_type("any"), None);
    }

    #[test]
    fn upload_question_checks_content_type() {
        let mut q = question(QuestionType::FileInput, 1);
        q.file_max_count = Some(2);
        q.mime_types = Some(vec![MimeType::Pdf]);
        assert!(q.accepts_content_type("application/pdf"));
        assert!(!q.accepts_content_type("text/plain"));

        q.mime_types = Some(vec![MimeType::Any]);
        assert!(q.accepts_content_type("image/png"));
        assert_eq!(q.file_limit(), 2);
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let mut q = question(QuestionType::Checkbox, 3);
        q.choices = Some(vec!["Apple".to_string(), "Banana".to_string()]);
        let patch = QuestionPatch { title: Some("Fruit".to_string()), multiple: Some(true), ..Default::default() };
        let next = q.patched(patch).unwrap();
        assert_eq!(next.title, "Fruit");
        assert_eq!(next.order, 3);
        assert!(next.is_multiple());
        assert_eq!(next.choices(), ["Apple", "Banana"]);
    }

    #[test]
    fn patch_rejects_attributes_foreign_to_type() {
        let q = question(QuestionType::TextArea, 1);
        let patch = QuestionPatch { choices: Some(vec!["A".to_string()]), ..Default::default() };
        assert!(matches!(q.patched(patch), Err(SchemaError::Unexpected { .. })));

        let patch = QuestionPatch { multiple: Some(true), ..Default::default() };
        assert!(matches!(q.patched(patch), Err(SchemaError::Unexpected { .. })));
    }

    #[test]
    fn new_question_deserializes_original_field_names() {
        let json = r#"{
            "formId": 4,
            "title": "Resume",
            "order": 2,
            "type": "FileInput",
            "required": true,
            "fileMaxCount": 1,
            "mimeTypes": ["application/pdf", "any"]
        }"#;
        let new: NewQuestion = serde_json::from_str(json).unwrap();
        assert_eq!(new.kind, QuestionType::FileInput);
        assert_eq!(new.mime_types.as_deref(), Some([MimeType::Pdf, MimeType::Any].as_slice()));
        assert!(new.check().is_ok());

        let unknown = r#"{"formId":1,"title":"x","order":1,"type":"TextInput","required":false,"extra":1}"#;
        assert!(serde_json::from_str::<NewQuestion>(unknown).is_err());
    }
}
