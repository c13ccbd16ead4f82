//! Per-type table of which optional question attributes are legal or mandatory. Both
//! question creation and question updates are checked against the same table.

use crate::question::{MimeType, QuestionType};
use alloc::string::String;
use core::fmt::{self, Display};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeRules {
    pub allows_choices: bool,
    pub requires_choices: bool,
    pub allows_multiple: bool,
    /// File attributes are legal exactly when they are mandatory.
    pub requires_file_max_count: bool,
    pub requires_mime_types: bool,
}

const TEXT: TypeRules = TypeRules {
    allows_choices: false,
    requires_choices: false,
    allows_multiple: false,
    requires_file_max_count: false,
    requires_mime_types: false,
};

const SINGLE_SELECT: TypeRules = TypeRules { allows_choices: true, requires_choices: true, ..TEXT };

const MULTI_SELECT: TypeRules = TypeRules { allows_multiple: true, ..SINGLE_SELECT };

const FILE: TypeRules =
    TypeRules { allows_multiple: true, requires_file_max_count: true, requires_mime_types: true, ..TEXT };

impl QuestionType {
    pub const fn rules(self) -> &'static TypeRules {
        match self {
            Self::TextArea | Self::TextInput => &TEXT,
            Self::Radio => &SINGLE_SELECT,
            Self::Checkbox | Self::Dropdown => &MULTI_SELECT,
            Self::FileInput => &FILE,
        }
    }
}

/// Borrowed view over the type-dependent attributes of a question or a question patch.
#[derive(Clone, Copy, Debug, Default)]
pub struct Attributes<'a> {
    pub choices: Option<&'a [String]>,
    pub multiple: Option<bool>,
    pub file_max_count: Option<i32>,
    pub mime_types: Option<&'a [MimeType]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Choices,
    Multiple,
    FileMaxCount,
    MimeTypes,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Choices => "choices",
            Self::Multiple => "multiple",
            Self::FileMaxCount => "fileMaxCount",
            Self::MimeTypes => "mimeTypes",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// The attribute was supplied but means nothing for this type.
    Unexpected { field: Field, kind: QuestionType },
    /// The attribute is mandatory for this type.
    Missing { field: Field, kind: QuestionType },
    /// Exactly one choice cannot be combined with multiple selections.
    SingleChoiceMultiple,
    EmptyChoices,
    DuplicateChoice(String),
    NonPositiveOrder(i32),
    NonPositiveFileMaxCount(i32),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected { field, kind } => {
                write!(f, "'{}' property was found but is not appropriate for a {kind} field.", field.as_str())
            }
            Self::Missing { field, kind } => {
                write!(f, "'{}' property was not found but is required for a {kind} field.", field.as_str())
            }
            Self::SingleChoiceMultiple => {
                f.write_str("There cannot be only one choice and multiple allowable selections.")
            }
            Self::EmptyChoices => f.write_str("'choices' must contain at least one option."),
            Self::DuplicateChoice(choice) => write!(f, "The choice '{choice}' appears more than once."),
            Self::NonPositiveOrder(order) => write!(f, "The order {order} must be a positive integer."),
            Self::NonPositiveFileMaxCount(count) => {
                write!(f, "The file limit {count} must be a positive integer.")
            }
        }
    }
}

/// Rejects supplied attributes that the type does not allow. Absent attributes are fine, which
/// is what a partial update needs.
pub fn check_present(kind: QuestionType, attrs: &Attributes<'_>) -> Result<(), SchemaError> {
    let rules = kind.rules();
    let offending = if attrs.choices.is_some() && !rules.allows_choices {
        Some(Field::Choices)
    } else if attrs.multiple.is_some() && !rules.allows_multiple {
        Some(Field::Multiple)
    } else if attrs.file_max_count.is_some() && !rules.requires_file_max_count {
        Some(Field::FileMaxCount)
    } else if attrs.mime_types.is_some() && !rules.requires_mime_types {
        Some(Field::MimeTypes)
    } else {
        None
    };

    match offending {
        Some(field) => Err(SchemaError::Unexpected { field, kind }),
        None => Ok(()),
    }
}

/// Full check of a complete question schema.
pub fn check(kind: QuestionType, order: i32, attrs: &Attributes<'_>) -> Result<(), SchemaError> {
    if order < 1 {
        return Err(SchemaError::NonPositiveOrder(order));
    }

    check_present(kind, attrs)?;

    let rules = kind.rules();
    let missing = if rules.requires_choices && attrs.choices.is_none() {
        Some(Field::Choices)
    } else if rules.requires_file_max_count && attrs.file_max_count.is_none() {
        Some(Field::FileMaxCount)
    } else if rules.requires_mime_types && attrs.mime_types.is_none() {
        Some(Field::MimeTypes)
    } else {
        None
    };
    if let Some(field) = missing {
        return Err(SchemaError::Missing { field, kind });
    }

    if let Some(choices) = attrs.choices {
        if choices.is_empty() {
            return Err(SchemaError::EmptyChoices);
        }
        for (i, choice) in choices.iter().enumerate() {
            if choices[..i].contains(choice) {
                return Err(SchemaError::DuplicateChoice(choice.clone()));
            }
        }
        if choices.len() == 1 && attrs.multiple == Some(true) {
            return Err(SchemaError::SingleChoiceMultiple);
        }
    }

    match attrs.file_max_count {
        Some(count) if count < 1 => Err(SchemaError::NonPositiveFileMaxCount(count)),
        _ => Ok(()),
    }
}
