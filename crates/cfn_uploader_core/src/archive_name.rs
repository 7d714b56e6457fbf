use rand::Rng;
use sha2::{Digest, Sha256};

pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const RANDOM_SUFFIX_LEN: usize = 24;

/// Name for a packaged archive: a content hash over the raw file specs
/// followed by a random suffix, so identical content never collides across
/// concurrent invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub content_hash: String,
    pub suffix: String,
}

impl ArchiveName {
    pub fn generate<S: AsRef<str>>(file_specs: &[S], rng: &mut impl Rng) -> Self {
        Self {
            content_hash: content_hash(file_specs),
            suffix: random_suffix(rng),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}{}{ARCHIVE_EXTENSION}", self.content_hash, self.suffix)
    }
}

impl std::fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Digest of one raw `<path>:<payload>` string, path included.
pub fn file_spec_digest(file_spec: &str) -> String {
    hex_digest(file_spec.as_bytes())
}

pub fn content_hash<S: AsRef<str>>(file_specs: &[S]) -> String {
    let joined: String = file_specs
        .iter()
        .map(|spec| file_spec_digest(spec.as_ref()))
        .collect();
    hex_digest(joined.as_bytes())
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn random_suffix(rng: &mut impl Rng) -> String {
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
        .collect()
}
