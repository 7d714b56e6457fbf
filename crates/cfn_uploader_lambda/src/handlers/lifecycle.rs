use std::error::Error as StdError;
use std::time::Instant;

use serde_json::{json, Value};

use crate::adapters::http_fetch::HttpFetcher;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::responder::LifecycleResponder;
use crate::archive::{stage_archive, ArchiveBuilder};
use crate::config::HandlerConfig;
use crate::error::MaterializeError;
use crate::logging::{log_error, log_info, log_warn};
use crate::resolver::PayloadResolver;
use crate::runtime::archive_name::ArchiveName;
use crate::runtime::contract::{
    build_cfn_response, build_cfn_response_from_raw, InvocationContext, LifecycleEvent,
    RequestType, ResourceProperties, ResponseEnvelope, ZipMode,
};
use crate::runtime::file_spec::FileSpec;

const COMPONENT: &str = "lifecycle_handler";

pub struct Collaborators<'a> {
    pub object_store: &'a dyn ObjectStore,
    pub http: &'a dyn HttpFetcher,
    pub responder: &'a dyn LifecycleResponder,
}

/// Reconciles one custom-resource event and reports the outcome exactly once.
///
/// Materialization failures become a `FAILED` response after
/// `config.failure_delay`; only a failure to deliver the response itself is
/// returned as an error.
pub fn handle_lifecycle_event(
    event: &LifecycleEvent,
    context: &InvocationContext,
    config: &HandlerConfig,
    collaborators: &Collaborators<'_>,
) -> Result<ResponseEnvelope, String> {
    let started_at = Instant::now();
    log_info(
        COMPONENT,
        "event_received",
        json!({
            "request_type": event.request_type,
            "request_id": event.request_id.clone(),
            "aws_request_id": context.request_id.clone(),
            "stack_id": event.stack_id.clone(),
            "logical_resource_id": event.logical_resource_id.clone(),
            "resource_properties": event.resource_properties.clone(),
        }),
    );

    let envelope = match event.request_type {
        RequestType::Delete => {
            log_info(
                COMPONENT,
                "delete_ignored",
                json!({ "logical_resource_id": event.logical_resource_id.clone() }),
            );
            ResponseEnvelope::success()
        }
        RequestType::Create | RequestType::Update | RequestType::Unsupported => {
            match materialize(event, config, collaborators) {
                Ok(message) => ResponseEnvelope::success_with_message(message),
                Err(error) => {
                    log_error(
                        COMPONENT,
                        "materialize_failed",
                        json!({
                            "request_id": event.request_id.clone(),
                            "error": error.to_string(),
                            "error_chain": error_chain(&error),
                            "failure_delay_ms": config.failure_delay.as_millis(),
                        }),
                    );
                    std::thread::sleep(config.failure_delay);
                    ResponseEnvelope::failed(error.to_string())
                }
            }
        }
    };

    let response = build_cfn_response(event, context, &envelope);
    collaborators
        .responder
        .send_response(&response)
        .map_err(|error| format!("failed to send lifecycle response: {error}"))?;

    log_info(
        COMPONENT,
        "response_sent",
        json!({
            "request_id": event.request_id.clone(),
            "status": envelope.status.as_str(),
            "duration_ms": started_at.elapsed().as_millis(),
            "data": envelope.data.clone(),
        }),
    );
    Ok(envelope)
}

/// Answers a payload that could not be decoded into a `LifecycleEvent`.
///
/// A `FAILED` response is sent when the raw payload still carries a
/// `ResponseURL`; without one there is nobody to answer and the decode error
/// is returned.
pub fn report_undecodable_event(
    raw: &Value,
    decode_error: &str,
    context: &InvocationContext,
    config: &HandlerConfig,
    responder: &dyn LifecycleResponder,
) -> Result<ResponseEnvelope, String> {
    log_error(
        COMPONENT,
        "event_undecodable",
        json!({
            "aws_request_id": context.request_id.clone(),
            "error": decode_error,
            "failure_delay_ms": config.failure_delay.as_millis(),
        }),
    );

    let envelope = ResponseEnvelope::failed(decode_error);
    let Some(response) = build_cfn_response_from_raw(raw, context, &envelope) else {
        return Err(format!("{decode_error} (no ResponseURL to report to)"));
    };

    std::thread::sleep(config.failure_delay);
    responder
        .send_response(&response)
        .map_err(|error| format!("failed to send lifecycle response: {error}"))?;

    log_info(
        COMPONENT,
        "response_sent",
        json!({
            "request_id": response.body.request_id.clone(),
            "status": envelope.status.as_str(),
        }),
    );
    Ok(envelope)
}

fn materialize(
    event: &LifecycleEvent,
    config: &HandlerConfig,
    collaborators: &Collaborators<'_>,
) -> Result<String, MaterializeError> {
    if event.request_type == RequestType::Unsupported {
        return Err(MaterializeError::UnsupportedRequestType);
    }

    let properties = event.properties()?;
    let bucket = properties
        .upload_bucket()
        .ok_or(MaterializeError::MissingProperty("UploadBucket"))?;
    let region = properties
        .aws_region()
        .ok_or(MaterializeError::MissingProperty("AWSRegion"))?;
    let files = properties
        .files()
        .ok_or(MaterializeError::MissingProperty("Files"))?;

    let resolver = PayloadResolver::new(
        collaborators.object_store,
        collaborators.http,
        config.resolution_failure,
    );
    let target = UploadTarget { region, bucket };

    match properties.zip_mode() {
        ZipMode::Archive => upload_archive(
            &properties,
            files,
            &target,
            &resolver,
            config,
            collaborators.object_store,
        ),
        ZipMode::Individual => upload_individually(
            &properties,
            files,
            &target,
            &resolver,
            collaborators.object_store,
        ),
    }
}

struct UploadTarget<'a> {
    region: &'a str,
    bucket: &'a str,
}

fn upload_archive(
    properties: &ResourceProperties,
    files: &[String],
    target: &UploadTarget<'_>,
    resolver: &PayloadResolver<'_>,
    config: &HandlerConfig,
    object_store: &dyn ObjectStore,
) -> Result<String, MaterializeError> {
    let archive_name = ArchiveName::generate(files, &mut rand::thread_rng());

    let mut builder = ArchiveBuilder::new();
    for raw in files {
        let file = FileSpec::parse(raw)?;
        let content = resolver.resolve(&file.payload)?;
        log_file_resolved(&file, content.len());
        builder.add_entry(&file.path, &content)?;
    }
    let entries = builder.entries();
    let bytes = builder.finish()?;

    let staged = stage_archive(&config.scratch_dir, &archive_name, &bytes)?;
    let key = properties
        .s3_key()
        .map(str::to_string)
        .unwrap_or_else(|| archive_name.file_name());

    object_store
        .upload_file(target.region, target.bucket, &key, staged.path())
        .map_err(|message| MaterializeError::Upload {
            bucket: target.bucket.to_string(),
            key: key.clone(),
            message,
        })?;

    log_info(
        COMPONENT,
        "archive_uploaded",
        json!({
            "bucket": target.bucket,
            "key": key.clone(),
            "content_hash": archive_name.content_hash,
            "entries": entries,
            "bytes": bytes.len(),
        }),
    );
    Ok(format!("{}/{key}", target.bucket))
}

fn upload_individually(
    properties: &ResourceProperties,
    files: &[String],
    target: &UploadTarget<'_>,
    resolver: &PayloadResolver<'_>,
    object_store: &dyn ObjectStore,
) -> Result<String, MaterializeError> {
    if let Some(s3_key) = properties.s3_key() {
        log_warn(
            COMPONENT,
            "s3_key_ignored",
            json!({
                "s3_key": s3_key,
                "reason": "S3Key only applies when Zip is enabled",
            }),
        );
    }

    for raw in files {
        let file = FileSpec::parse(raw)?;
        let content = resolver.resolve(&file.payload)?;
        log_file_resolved(&file, content.len());

        object_store
            .put_object(target.region, target.bucket, &file.path, &content)
            .map_err(|message| MaterializeError::Upload {
                bucket: target.bucket.to_string(),
                key: file.path.clone(),
                message,
            })?;

        log_info(
            COMPONENT,
            "object_uploaded",
            json!({ "bucket": target.bucket, "key": file.path.clone() }),
        );
    }

    Ok(target.bucket.to_string())
}

fn log_file_resolved(file: &FileSpec, bytes: usize) {
    log_info(
        COMPONENT,
        "file_resolved",
        json!({ "path": file.path.clone(), "bytes": bytes }),
    );
}

fn error_chain(error: &(dyn StdError + 'static)) -> Value {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(Value::from(cause.to_string()));
        source = cause.source();
    }
    Value::Array(chain)
}
