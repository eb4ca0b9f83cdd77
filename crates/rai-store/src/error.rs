#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("atomic commit failed: {0}")]
    Commit(String),
    #[error("corrupt record in `{table}`: {reason}")]
    Corrupt { table: &'static str, reason: String },
    #[error("config version {0} is not recognised by this build")]
    UnknownConfigVersion(u32),
}
