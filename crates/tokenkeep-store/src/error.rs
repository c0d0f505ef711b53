/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("storage i/o failed: {0}")]
    Io(#[source] std::io::Error),

    /// The backing medium holds something that isn't a key-value map.
    #[error("storage is corrupt: {0}")]
    Corrupt(String),
}
