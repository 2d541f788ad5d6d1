#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed similarity data in {path}: {reason}")]
    DataFormat { path: String, reason: String },

    #[error("no assets matched the export selector")]
    NoAssets,

    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn data_format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
