use serde_json::json;

use crate::adapters::http_fetch::HttpFetcher;
use crate::adapters::object_store::ObjectStore;
use crate::config::ResolutionFailureMode;
use crate::error::MaterializeError;
use crate::logging::log_warn;
use crate::runtime::file_spec::{decode_base64_lenient, PayloadSpec};

const COMPONENT: &str = "payload_resolver";

/// Turns the payload half of a file spec into bytes.
pub struct PayloadResolver<'a> {
    object_store: &'a dyn ObjectStore,
    http: &'a dyn HttpFetcher,
    failure_mode: ResolutionFailureMode,
}

impl<'a> PayloadResolver<'a> {
    pub fn new(
        object_store: &'a dyn ObjectStore,
        http: &'a dyn HttpFetcher,
        failure_mode: ResolutionFailureMode,
    ) -> Self {
        Self {
            object_store,
            http,
            failure_mode,
        }
    }

    /// Parsing and fetching share one failure boundary; in
    /// [`ResolutionFailureMode::Substitute`] the error text becomes the content.
    pub fn resolve(&self, payload: &str) -> Result<Vec<u8>, MaterializeError> {
        match self.try_resolve(payload) {
            Ok(content) => Ok(content),
            Err(error) => match self.failure_mode {
                ResolutionFailureMode::Propagate => Err(error),
                ResolutionFailureMode::Substitute => {
                    let message = error.to_string();
                    log_warn(
                        COMPONENT,
                        "payload_substituted",
                        json!({ "error": message.clone() }),
                    );
                    Ok(message.into_bytes())
                }
            },
        }
    }

    fn try_resolve(&self, payload: &str) -> Result<Vec<u8>, MaterializeError> {
        match PayloadSpec::parse(payload)? {
            PayloadSpec::Http(url) => {
                self.http
                    .get(&url)
                    .map_err(|message| MaterializeError::Fetch {
                        url: url.clone(),
                        message,
                    })
            }
            PayloadSpec::S3 {
                region,
                bucket,
                key,
            } => self
                .object_store
                .get_object(&region, &bucket, &key)
                .map_err(|message| MaterializeError::SourceObject {
                    region: region.clone(),
                    bucket: bucket.clone(),
                    key: key.clone(),
                    message,
                }),
            PayloadSpec::Plain(text) => Ok(text.into_bytes()),
            PayloadSpec::Base64(encoded) => Ok(decode_base64_lenient(&encoded)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;

    struct SourceStore {
        objects: HashMap<(String, String, String), Vec<u8>>,
        reads: Mutex<Vec<String>>,
    }

    impl SourceStore {
        fn with_object(region: &str, bucket: &str, key: &str, body: &[u8]) -> Self {
            Self {
                objects: HashMap::from([(
                    (region.to_string(), bucket.to_string(), key.to_string()),
                    body.to_vec(),
                )]),
                reads: Mutex::new(Vec::new()),
            }
        }

        fn reads(&self) -> Vec<String> {
            self.reads.lock().expect("poisoned mutex").clone()
        }
    }

    impl ObjectStore for SourceStore {
        fn get_object(&self, region: &str, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
            self.reads
                .lock()
                .expect("poisoned mutex")
                .push(format!("{region}/{bucket}/{key}"));
            self.objects
                .get(&(region.to_string(), bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| "NoSuchKey".to_string())
        }

        fn put_object(&self, _: &str, _: &str, _: &str, _: &[u8]) -> Result<(), String> {
            Err("read-only store".to_string())
        }

        fn upload_file(&self, _: &str, _: &str, _: &str, _: &Path) -> Result<(), String> {
            Err("read-only store".to_string())
        }
    }

    struct StaticFetcher {
        body: Result<Vec<u8>, String>,
    }

    impl HttpFetcher for StaticFetcher {
        fn get(&self, _url: &str) -> Result<Vec<u8>, String> {
            self.body.clone()
        }
    }

    fn empty_store() -> SourceStore {
        SourceStore::with_object("none", "none", "none", b"")
    }

    fn ok_fetcher(body: &[u8]) -> StaticFetcher {
        StaticFetcher {
            body: Ok(body.to_vec()),
        }
    }

    #[test]
    fn plain_payload_resolves_verbatim() {
        let store = empty_store();
        let fetcher = ok_fetcher(b"");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        assert_eq!(resolver.resolve("plain://hello").expect("resolve"), b"hello");
    }

    #[test]
    fn bare_payload_resolves_as_base64() {
        let store = empty_store();
        let fetcher = ok_fetcher(b"");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        assert_eq!(resolver.resolve("aGk=").expect("resolve"), b"hi");
    }

    #[test]
    fn http_payload_returns_body() {
        let store = empty_store();
        let fetcher = ok_fetcher(b"<html></html>");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        assert_eq!(
            resolver
                .resolve("https://example.com/index.html")
                .expect("resolve"),
            b"<html></html>"
        );
    }

    #[test]
    fn s3_payload_reads_from_source_region() {
        let store = SourceStore::with_object("us-east-1", "src", "nested/key.txt", b"object");
        let fetcher = ok_fetcher(b"");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        assert_eq!(
            resolver
                .resolve("s3://us-east-1/src/nested/key.txt")
                .expect("resolve"),
            b"object"
        );
        assert_eq!(store.reads(), vec!["us-east-1/src/nested/key.txt"]);
    }

    #[test]
    fn http_failure_propagates_by_default() {
        let store = empty_store();
        let fetcher = StaticFetcher {
            body: Err("connection refused".to_string()),
        };
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        let error = resolver
            .resolve("http://unreachable.invalid/a")
            .expect_err("fetch should fail");
        assert!(matches!(error, MaterializeError::Fetch { .. }));
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn substitute_mode_writes_error_text_as_content() {
        let store = empty_store();
        let fetcher = StaticFetcher {
            body: Err("connection refused".to_string()),
        };
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Substitute);

        let content = resolver
            .resolve("http://unreachable.invalid/a")
            .expect("substitute mode should not fail");
        let text = String::from_utf8(content).expect("error text is utf-8");
        assert_eq!(
            text,
            "failed to fetch http://unreachable.invalid/a: connection refused"
        );
    }

    #[test]
    fn substitute_mode_covers_missing_source_objects() {
        let store = empty_store();
        let fetcher = ok_fetcher(b"");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Substitute);

        let content = resolver
            .resolve("s3://eu-west-1/src/missing")
            .expect("substitute mode should not fail");
        assert!(String::from_utf8_lossy(&content).contains("NoSuchKey"));
    }

    #[test]
    fn malformed_s3_location_is_an_error() {
        let store = empty_store();
        let fetcher = ok_fetcher(b"");
        let resolver = PayloadResolver::new(&store, &fetcher, ResolutionFailureMode::Propagate);

        let error = resolver
            .resolve("s3://eu-west-1")
            .expect_err("location should fail");
        assert!(matches!(error, MaterializeError::InvalidFileSpec(_)));
        assert!(store.reads().is_empty());
    }
}
