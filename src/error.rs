use core::fmt::Display;

pub type Result<T> = core::result::Result<T, Error>;

/// Prefix an error message with the `file:line` it was raised from.
#[macro_export]
macro_rules! fmt_err {
    ($($arg:tt)*) => {
        format!("{}:{} {}", file!(), line!(), format!($($arg)*))
    };
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    // binding columns/tables of one statement
    Bind(String),
    // static statement checks before routing
    Validate(String),
    TableExists(String),
    NoSuchTable(String),
    IndexExists(String),
    NoSuchIndex(String),
    // route result breaks a structural invariant
    Route(String),
    // schema / federation / rule synchronization
    MetaData(String),
    DataSource(String),
    Persist(String),
    Config(String),
    Internal(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bind(err)
            | Self::Validate(err)
            | Self::TableExists(err)
            | Self::NoSuchTable(err)
            | Self::IndexExists(err)
            | Self::NoSuchIndex(err)
            | Self::Route(err)
            | Self::MetaData(err)
            | Self::DataSource(err)
            | Self::Persist(err)
            | Self::Config(err)
            | Self::Internal(err) => {
                write!(f, "{}", err)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Persist(fmt_err!("serde_json: {err}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Config(fmt_err!("io: {err}"))
    }
}
