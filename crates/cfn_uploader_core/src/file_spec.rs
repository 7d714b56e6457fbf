use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

pub const HTTP_PREFIX: &str = "http://";
pub const HTTPS_PREFIX: &str = "https://";
pub const S3_PREFIX: &str = "s3://";
pub const PLAIN_PREFIX: &str = "plain://";

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecError {
    message: String,
}

impl SpecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SpecError {}

/// One `<destinationPath>:<payloadSpec>` declaration from the `Files` list.
///
/// The payload half stays unparsed; interpreting it belongs to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub raw: String,
    pub path: String,
    pub payload: String,
}

impl FileSpec {
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let Some((path, payload)) = raw.split_once(':') else {
            return Err(SpecError::new(format!(
                "file spec '{raw}' must have the form <path>:<payload>"
            )));
        };

        if path.is_empty() {
            return Err(SpecError::new(format!(
                "file spec '{raw}' has an empty destination path"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            path: path.to_string(),
            payload: payload.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSpec {
    Http(String),
    S3 {
        region: String,
        bucket: String,
        key: String,
    },
    Plain(String),
    Base64(String),
}

impl PayloadSpec {
    pub fn parse(payload: &str) -> Result<Self, SpecError> {
        if payload.starts_with(HTTP_PREFIX) || payload.starts_with(HTTPS_PREFIX) {
            return Ok(Self::Http(payload.to_string()));
        }

        if let Some(location) = payload.strip_prefix(S3_PREFIX) {
            return parse_s3_location(location);
        }

        if let Some(text) = payload.strip_prefix(PLAIN_PREFIX) {
            return Ok(Self::Plain(text.to_string()));
        }

        Ok(Self::Base64(payload.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::S3 { .. } => "s3",
            Self::Plain(_) => "plain",
            Self::Base64(_) => "base64",
        }
    }
}

fn parse_s3_location(location: &str) -> Result<PayloadSpec, SpecError> {
    let mut parts = location.splitn(3, '/');
    let region = parts.next().unwrap_or_default();
    let bucket = parts.next().unwrap_or_default();
    let key = parts.next().unwrap_or_default();

    if region.is_empty() || bucket.is_empty() || key.is_empty() {
        return Err(SpecError::new(format!(
            "s3 payload '{S3_PREFIX}{location}' must have the form {S3_PREFIX}<region>/<bucket>/<key>"
        )));
    }

    Ok(PayloadSpec::S3 {
        region: region.to_string(),
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

/// Decodes base64 the forgiving way: characters outside the standard
/// alphabet are skipped, input ends at the first `=`, and a dangling single
/// symbol is dropped. Never fails; junk input yields junk bytes.
pub fn decode_base64_lenient(input: &str) -> Vec<u8> {
    let mut symbols: String = input
        .chars()
        .take_while(|symbol| *symbol != '=')
        .filter(|symbol| symbol.is_ascii_alphanumeric() || *symbol == '+' || *symbol == '/')
        .collect();
    if symbols.len() % 4 == 1 {
        symbols.pop();
    }

    LENIENT_BASE64.decode(symbols).unwrap_or_default()
}
