//! Error types and result definitions for dedup cache operations.
//!
//! Provides an error system with classification and captured diagnostic metadata
//! for cache and remote store operations. [`DedupError`] carries an [`ErrorKind`],
//! a static description, optional dynamic detail, and the originating callsite.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::config::ValidationError;

/// Convenient result type for dedup operations using [`DedupError`] as the error type.
pub type DedupResult<T> = Result<T, DedupError>;

/// Main error type for dedup cache operations.
///
/// [`DedupError`] captures rich diagnostic information at the callsite while keeping
/// construction ergonomic through tuple `From` impls and the [`crate::dedup_error!`]
/// and [`crate::bail!`] macros.
#[derive(Debug, Clone)]
pub struct DedupError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Specific categories of errors that can occur during dedup cache operations.
///
/// Error kinds are organized by functional area and failure mode to enable
/// appropriate handling strategies in callers.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Remote store errors
    /// A fetched page lacks the format sentinel; the derived key is in use by
    /// something else or the cache was never initialized.
    InvalidStoreKey,
    /// The reassembled cache blob failed to decode or parse.
    CacheCorruption,
    /// A page read or write failed at the transport level.
    TransportError,

    // Configuration errors
    /// Malformed configuration such as a zero chunk size; fails before any I/O.
    InvalidArgument,

    // Data & encoding errors
    ConversionError,
    InvalidData,
    SerializationError,
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl DedupError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the
    /// modified instance.
    ///
    /// The stored source is preserved across clones and exposed via
    /// [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`DedupError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        DedupError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for DedupError {
    fn eq(&self, other: &DedupError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for DedupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        write_detail(self.detail.as_deref(), f, 1)?;
        write_backtrace(self.backtrace.as_ref(), f, 1)?;

        Ok(())
    }
}

impl error::Error for DedupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates a [`DedupError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for DedupError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> DedupError {
        DedupError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`DedupError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for DedupError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> DedupError {
        DedupError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`serde_json::Error`] to [`DedupError`] with the appropriate error kind.
///
/// Maps to [`ErrorKind::SerializationError`] or [`ErrorKind::DeserializationError`]
/// based on error classification.
impl From<serde_json::Error> for DedupError {
    #[track_caller]
    fn from(err: serde_json::Error) -> DedupError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => {
                (ErrorKind::SerializationError, "JSON I/O operation failed")
            }
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        DedupError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::str::Utf8Error`] to [`DedupError`] with [`ErrorKind::ConversionError`].
impl From<std::str::Utf8Error> for DedupError {
    #[track_caller]
    fn from(err: std::str::Utf8Error) -> DedupError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DedupError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("UTF-8 conversion failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::num::ParseIntError`] to [`DedupError`] with [`ErrorKind::ConversionError`].
impl From<std::num::ParseIntError> for DedupError {
    #[track_caller]
    fn from(err: std::num::ParseIntError) -> DedupError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DedupError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Integer parsing failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`reqwest::Error`] to [`DedupError`] with [`ErrorKind::TransportError`].
impl From<reqwest::Error> for DedupError {
    #[track_caller]
    fn from(err: reqwest::Error) -> DedupError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DedupError::from_components(
            ErrorKind::TransportError,
            Cow::Borrowed("Remote store request failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts a config [`ValidationError`] to [`DedupError`] with [`ErrorKind::InvalidArgument`].
impl From<ValidationError> for DedupError {
    #[track_caller]
    fn from(err: ValidationError) -> DedupError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DedupError::from_components(
            ErrorKind::InvalidArgument,
            Cow::Borrowed("Invalid configuration"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
