use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use cfn_uploader_lambda::adapters::http_fetch::HttpFetcher;
use cfn_uploader_lambda::adapters::object_store::ObjectStore;
use cfn_uploader_lambda::adapters::responder::LifecycleResponder;
use cfn_uploader_lambda::config::HandlerConfig;
use cfn_uploader_lambda::handlers::lifecycle::{
    handle_lifecycle_event, report_undecodable_event, Collaborators,
};
use cfn_uploader_lambda::runtime::contract::{
    CfnResponse, InvocationContext, LifecycleEvent, ResponseEnvelope,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct S3ObjectStore {
    sdk_config: aws_config::SdkConfig,
    clients: Mutex<HashMap<String, aws_sdk_s3::Client>>,
}

impl S3ObjectStore {
    fn new(sdk_config: aws_config::SdkConfig) -> Self {
        Self {
            sdk_config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, region: &str) -> Result<aws_sdk_s3::Client, String> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| "s3 client cache is poisoned".to_string())?;
        let client = clients.entry(region.to_string()).or_insert_with(|| {
            let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                .region(Region::new(region.to_string()))
                .build();
            aws_sdk_s3::Client::from_conf(config)
        });
        Ok(client.clone())
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, region: &str, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        let object_key = key.to_string();

        tokio::runtime::Handle::current().block_on(async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(object_key)
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "failed to read object from s3: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            output
                .body
                .collect()
                .await
                .map(|data| data.into_bytes().to_vec())
                .map_err(|error| format!("failed to read s3 object body: {error}"))
        })
    }

    fn put_object(
        &self,
        region: &str,
        bucket: &str,
        key: &str,
        body: &[u8],
    ) -> Result<(), String> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();

        tokio::runtime::Handle::current().block_on(async move {
            client
                .put_object()
                .bucket(bucket)
                .key(object_key)
                .body(ByteStream::from(body_bytes))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "failed to write object to s3: {}",
                        DisplayErrorContext(&error)
                    )
                })
        })
    }

    fn upload_file(
        &self,
        region: &str,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), String> {
        let client = self.client(region)?;
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let path = path.to_path_buf();

        tokio::runtime::Handle::current().block_on(async move {
            let body = ByteStream::from_path(&path).await.map_err(|error| {
                format!("failed to open staged file {}: {error}", path.display())
            })?;
            client
                .put_object()
                .bucket(bucket)
                .key(object_key)
                .content_type("application/zip")
                .body(body)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "failed to upload file to s3: {}",
                        DisplayErrorContext(&error)
                    )
                })
        })
    }
}

struct ReqwestFetcher {
    client: reqwest::Client,
}

impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        let client = self.client.clone();
        let url = url.to_string();

        tokio::runtime::Handle::current().block_on(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|error| format!("http request failed: {error}"))?;
            response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(|error| format!("failed to read http body: {error}"))
        })
    }
}

/// Delivers the cfn-response `PUT` to the pre-signed `ResponseURL`.
struct CfnResponder {
    client: reqwest::Client,
}

impl LifecycleResponder for CfnResponder {
    fn send_response(&self, response: &CfnResponse) -> Result<(), String> {
        let body = serde_json::to_vec(&response.body)
            .map_err(|error| format!("failed to serialize cfn response: {error}"))?;
        let client = self.client.clone();
        let response_url = response.response_url.clone();

        tokio::runtime::Handle::current().block_on(async move {
            client
                .put(&response_url)
                .header(reqwest::header::CONTENT_TYPE, "")
                .body(body)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map(|_| ())
                .map_err(|error| format!("cfn response PUT failed: {error}"))
        })
    }
}

struct RuntimeDependencies {
    config: HandlerConfig,
    object_store: S3ObjectStore,
    fetcher: ReqwestFetcher,
    responder: CfnResponder,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    let invocation = InvocationContext {
        request_id: context.request_id.clone(),
        log_stream_name: context.env_config.log_stream.clone(),
    };

    let lifecycle_event = match decode_lifecycle_event(&payload) {
        Ok(event) => event,
        Err(error) => {
            let envelope = tokio::task::block_in_place(|| {
                report_undecodable_event(
                    &payload,
                    &error.to_string(),
                    &invocation,
                    &deps.config,
                    &deps.responder,
                )
            })
            .map_err(Error::from)?;
            return serialize_envelope(envelope);
        }
    };

    let collaborators = Collaborators {
        object_store: &deps.object_store,
        http: &deps.fetcher,
        responder: &deps.responder,
    };
    let envelope = tokio::task::block_in_place(|| {
        handle_lifecycle_event(&lifecycle_event, &invocation, &deps.config, &collaborators)
    })
    .map_err(Error::from)?;

    serialize_envelope(envelope)
}

fn serialize_envelope(envelope: ResponseEnvelope) -> Result<Value, Error> {
    serde_json::to_value(envelope)
        .map_err(|error| Error::from(format!("failed to serialize response envelope: {error}")))
}

fn decode_lifecycle_event(payload: &Value) -> Result<LifecycleEvent, Error> {
    if !payload.is_object() {
        return Err(Error::from("lifecycle event must be a JSON object"));
    }
    serde_json::from_value(payload.clone())
        .map_err(|error| Error::from(format!("invalid lifecycle event: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::tracing::init_default_subscriber();

    let config = HandlerConfig::from_env().map_err(Error::from)?;
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| Error::from(format!("failed to build http client: {error}")))?;

    let deps = RuntimeDependencies {
        config,
        object_store: S3ObjectStore::new(sdk_config),
        fetcher: ReqwestFetcher {
            client: http_client.clone(),
        },
        responder: CfnResponder {
            client: http_client,
        },
    };

    lambda_runtime::run(service_fn(|event| handle_request(event, &deps))).await
}
