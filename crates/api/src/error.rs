use core::fmt::{self, Display};
use hyper::StatusCode;
use model::Uuid;

#[derive(Debug)]
pub enum Error {
    /// No route matches the method and path.
    NoRoute,
    /// Missing, malformed, or expired session cookie.
    Unauthorized,
    /// The path or query carries a malformed identifier.
    BadParams,
    /// The request body could not be read or parsed.
    BadBody,
    /// A file was sent under a field that is not an upload question of the form.
    UnexpectedFile(String),
    MimeTypeNotAllowed { question: Uuid, mimetype: String },
    TooManyFiles { question: Uuid, limit: usize },
    Multipart(multer::Error),
    Db(db::error::Error),
    /// Unrecoverable error.
    Fatal,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        use db::error::Error as Db;
        match self {
            Self::NoRoute => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadParams
            | Self::BadBody
            | Self::UnexpectedFile(_)
            | Self::MimeTypeNotAllowed { .. }
            | Self::TooManyFiles { .. }
            | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Db(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Db(Db::DuplicateTitle) => StatusCode::CONFLICT,
            Self::Db(Db::DuplicateOrder | Db::Schema(_) | Db::Rejected(_)) => StatusCode::BAD_REQUEST,
            Self::Db(_) | Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoute => f.write_str("Resource not found."),
            Self::Unauthorized => f.write_str("A valid session is required."),
            Self::BadParams => f.write_str("Malformed request parameters."),
            Self::BadBody => f.write_str("Malformed request body."),
            Self::UnexpectedFile(field) => write!(f, "Field '{field}' does not accept files."),
            Self::MimeTypeNotAllowed { question, mimetype } => {
                write!(f, "Question '{question}' does not accept files of type '{mimetype}'.")
            }
            Self::TooManyFiles { question, limit } => write!(f, "Question '{question}' accepts at most {limit} files."),
            Self::Multipart(err) => write!(f, "Malformed multipart body: {err}"),
            Self::Db(err) => Display::fmt(err, f),
            Self::Fatal => f.write_str("Oops! We have encountered an unrecoverable error on our end."),
        }
    }
}

impl From<db::error::Error> for Error {
    fn from(err: db::error::Error) -> Self {
        Self::Db(err)
    }
}

impl From<multer::Error> for Error {
    fn from(err: multer::Error) -> Self {
        Self::Multipart(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        log::error!("file storage failure: {err}");
        Self::Fatal
    }
}

pub type Result<T> = core::result::Result<T, Error>;
