//! Error types and result definitions for ingestion operations.
//!
//! [`EtlError`] carries a classified [`ErrorKind`], a static description, optional dynamic
//! detail, an optional source error, the callsite location and a captured backtrace. Errors of
//! several workers can be aggregated into a single value.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use ingest_config::LoadConfigError;
use ingest_config::shared::ValidationError;

/// Result type for ingestion operations using [`EtlError`] as the error type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Detailed payload stored for single [`EtlError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for ingestion operations.
#[derive(Debug, Clone)]
pub struct EtlError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Errors of several workers failing together.
    Many {
        errors: Vec<EtlError>,
        location: &'static Location<'static>,
    },
}

/// Classification of the failures that can occur while ingesting a table.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,

    // Resource Errors
    SourceResourceNotFound,
    StreamNotEnabled,

    // Collaborator Errors
    ScanFailed,
    StreamFailed,
    SinkFailed,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,

    // Serialization Errors
    SerializationError,

    // State & Workflow Errors
    InvalidState,
    IngestionWorkerPanic,
    SinkWorkerPanic,

    // Unknown / Uncategorized
    Unknown,
}

/// Coarse grouping of [`ErrorKind`]s by how an operator reacts to them.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum ErrorCategory {
    /// The configuration is invalid and must be changed before retrying.
    Configuration,
    /// A table or stream is missing or not ready yet.
    ResourceUnavailable,
    /// The pipeline failed while running.
    FatalRuntime,
}

impl ErrorKind {
    /// Returns the [`ErrorCategory`] of this kind.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::ConfigError => ErrorCategory::Configuration,
            ErrorKind::SourceResourceNotFound | ErrorKind::StreamNotEnabled => {
                ErrorCategory::ResourceUnavailable
            }
            ErrorKind::ScanFailed
            | ErrorKind::StreamFailed
            | ErrorKind::SinkFailed
            | ErrorKind::ConversionError
            | ErrorKind::InvalidData
            | ErrorKind::SerializationError
            | ErrorKind::InvalidState
            | ErrorKind::IngestionWorkerPanic
            | ErrorKind::SinkWorkerPanic
            | ErrorKind::Unknown => ErrorCategory::FatalRuntime,
        }
    }
}

impl EtlError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if there are none.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattened.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the [`ErrorCategory`] of [`EtlError::kind`].
    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }

    /// Returns the static description of this error.
    ///
    /// For aggregated errors, returns the description of the first error.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { ref errors, .. } => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For aggregated errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error.
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

/// Errors are equal when they carry the same kinds, in the same order.
impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.kinds() == other.kinds()
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(f, "{}: {}", payload.kind, payload.description)?;
                if let Some(detail) = &payload.detail {
                    write!(f, ": {detail}")?;
                }
                write!(f, " (at {})", payload.location)?;

                if let Some(source) = &payload.source {
                    write!(f, "\n  caused by: {source}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                write!(f, "{} errors (at {location})", errors.len())?;
                for error in errors {
                    for (index, line) in error.to_string().lines().enumerate() {
                        let bullet = if index == 0 { "- " } else { "  " };
                        write!(f, "\n  {bullet}{line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_deref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors. A single error is returned as is, without wrapping.
impl<E> From<Vec<E>> for EtlError
where
    E: Into<EtlError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> EtlError {
        let location = Location::caller();

        let mut errors: Vec<EtlError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        EtlError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<bigdecimal::ParseBigDecimalError> for EtlError {
    #[track_caller]
    fn from(err: bigdecimal::ParseBigDecimalError) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Number parsing failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<ValidationError> for EtlError {
    #[track_caller]
    fn from(err: ValidationError) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid pipeline configuration"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<LoadConfigError> for EtlError {
    #[track_caller]
    fn from(err: LoadConfigError) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Configuration loading failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
