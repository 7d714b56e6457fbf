use cfn_uploader_core::file_spec::SpecError;

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("{0} is required")]
    MissingProperty(&'static str),
    #[error("invalid ResourceProperties: {0}")]
    InvalidProperties(#[from] serde_json::Error),
    #[error("unsupported request type; expected Create, Update or Delete")]
    UnsupportedRequestType,
    #[error("invalid file spec: {0}")]
    InvalidFileSpec(#[from] SpecError),
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("failed to read s3://{region}/{bucket}/{key}: {message}")]
    SourceObject {
        region: String,
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to upload {bucket}/{key}: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to stage archive in scratch directory: {0}")]
    Scratch(#[from] std::io::Error),
}
