pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	/// A collaborator broke its contract. Fatal for the request.
	#[error("Invariant violated: {message}")]
	Invariant { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<bounty_storage::Error> for Error {
	fn from(err: bounty_storage::Error) -> Self {
		match err {
			bounty_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			bounty_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			bounty_storage::Error::NotFound(message) => Self::NotFound { message },
			bounty_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<bounty_providers::Error> for Error {
	fn from(err: bounty_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
