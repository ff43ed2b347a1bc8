pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(String),
	#[error(transparent)]
	Storage(#[from] bounty_storage::Error),
	#[error(transparent)]
	Service(#[from] bounty_service::Error),
}
