use std::error::Error as StdError;
use std::result::Result as StdResult;

/// A specialized `Result` type for cppdb.
pub type Result<T> = StdResult<T, Error>;

/// Convenience alias for boxed backend error sources.
pub type BoxDynError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all the ways a method can fail within cppdb.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error occurred while parsing a connection string.
    #[error("error occurred while parsing a connection string: {0}")]
    Configuration(String),

    /// A driver module could not be loaded or resolved.
    #[error("failed to load driver `{driver}`: {message}")]
    DriverLoad { driver: String, message: String },

    /// Error returned from the database engine.
    #[error("error returned from database: {0}")]
    Database(#[source] BoxDynError),

    /// Data cannot be converted to the requested type or is out of range.
    #[error("can't convert data to the requested type")]
    ValueConversion,

    /// A typed fetch was called on a column holding `NULL`.
    #[error("unexpected null; try fetching the value as an `Option`")]
    NullValue,

    /// A fetch was attempted before `next()` succeeded or after it
    /// returned `false`.
    #[error("attempt to fetch a row before `next()` or past the end of the result")]
    EmptyRow,

    /// Column index was out of bounds.
    #[error("column index out of bounds: the len is {len}, but the index is {index}")]
    ColumnIndexOutOfBounds { index: usize, len: usize },

    /// No column found for the given name.
    #[error("no column found for name: {0}")]
    ColumnNotFound(String),

    /// Bind index out of range for the prepared statement.
    #[error("placeholder index out of bounds: the statement has {len} placeholders, but the index is {index}")]
    InvalidPlaceholder { index: usize, len: usize },

    /// A single-row fetch was invoked against a result with more rows.
    ///
    /// Raised by single-row convenience layers built on top of
    /// [`backend::Rows`](crate::backend::Rows); never by this crate itself.
    #[error("query returned more than one row where a single row was expected")]
    MultipleRows,

    /// The operation is not supported by the active engine.
    ///
    /// A capability signal, not a bug: callers probing for optional
    /// functionality (string escaping, named sequences) should treat this
    /// as "feature absent".
    #[error("operation is not supported by the backend: {0}")]
    NotSupported(&'static str),

    /// An operation was invoked on an empty handle.
    #[error("attempt to access an empty object")]
    EmptyHandle,
}

impl Error {
    /// Wrap an engine error.
    pub fn database(error: impl StdError + Send + Sync + 'static) -> Self {
        Error::Database(Box::new(error))
    }

    #[inline]
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    #[inline]
    pub(crate) fn driver_load(driver: &str, message: impl Into<String>) -> Self {
        Error::DriverLoad {
            driver: driver.to_owned(),
            message: message.into(),
        }
    }
}
