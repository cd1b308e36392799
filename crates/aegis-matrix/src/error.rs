/// Errors produced by the Matrix adapter.
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("matrix-sdk error: {0}")]
    Sdk(#[from] matrix_sdk::Error),

    #[error("matrix client builder error: {0}")]
    ClientBuild(#[from] matrix_sdk::ClientBuildError),

    #[error("no homeserver/credentials configured for matrix ingress")]
    NoCredentials,

    #[error("room not found or not joined: {0}")]
    RoomNotFound(String),

    #[error("attachment decryption failed: {0}")]
    DecryptionFailed(String),
}
