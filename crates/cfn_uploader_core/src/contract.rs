use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ZIP_DISABLED_LITERAL: &str = "false";
pub const LOG_STREAM_REASON_PREFIX: &str = "See the details in CloudWatch Log Stream: ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Unsupported,
}

/// Custom-resource request as delivered by CloudFormation.
///
/// `ResourceProperties` stays as raw JSON until a Create/Update needs it, so a
/// Delete with malformed properties can still be acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleEvent {
    #[serde(rename = "RequestType")]
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
    #[serde(rename = "StackId", default)]
    pub stack_id: String,
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId", default)]
    pub logical_resource_id: String,
    #[serde(
        rename = "PhysicalResourceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub physical_resource_id: Option<String>,
    #[serde(rename = "ResourceProperties", default)]
    pub resource_properties: Value,
}

impl LifecycleEvent {
    pub fn properties(&self) -> Result<ResourceProperties, serde_json::Error> {
        if self.resource_properties.is_null() {
            return Ok(ResourceProperties::default());
        }
        serde_json::from_value(self.resource_properties.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceProperties {
    #[serde(rename = "Files", default)]
    pub files: Option<Vec<String>>,
    #[serde(rename = "UploadBucket", default)]
    pub upload_bucket: Option<String>,
    #[serde(rename = "AWSRegion", default)]
    pub aws_region: Option<String>,
    #[serde(rename = "S3Key", default)]
    pub s3_key: Option<String>,
    #[serde(rename = "Zip", default)]
    pub zip: Option<Value>,
}

impl ResourceProperties {
    pub fn files(&self) -> Option<&[String]> {
        self.files.as_deref()
    }

    pub fn upload_bucket(&self) -> Option<&str> {
        non_blank(self.upload_bucket.as_deref())
    }

    pub fn aws_region(&self) -> Option<&str> {
        non_blank(self.aws_region.as_deref())
    }

    pub fn s3_key(&self) -> Option<&str> {
        non_blank(self.s3_key.as_deref())
    }

    pub fn zip_mode(&self) -> ZipMode {
        ZipMode::from_property(self.zip.as_ref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipMode {
    Archive,
    Individual,
}

impl ZipMode {
    /// Absent, `null`, `true` and every string other than `"false"` select
    /// archive packaging.
    pub fn from_property(raw: Option<&Value>) -> Self {
        match raw {
            Some(Value::Bool(false)) => Self::Individual,
            Some(Value::String(text)) if text == ZIP_DISABLED_LITERAL => Self::Individual,
            _ => Self::Archive,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseData {
    #[serde(rename = "Message")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResponseEnvelope {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            data: None,
            reason: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(ResponseData {
                message: message.into(),
            }),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            data: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CfnResponseBody {
    #[serde(rename = "Status")]
    pub status: ResponseStatus,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "PhysicalResourceId")]
    pub physical_resource_id: String,
    #[serde(rename = "StackId")]
    pub stack_id: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId")]
    pub logical_resource_id: String,
    #[serde(rename = "NoEcho")]
    pub no_echo: bool,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

/// A signed-URL callback ready to be delivered with an HTTP `PUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfnResponse {
    pub response_url: String,
    pub body: CfnResponseBody,
}

pub fn build_cfn_response(
    event: &LifecycleEvent,
    context: &InvocationContext,
    envelope: &ResponseEnvelope,
) -> CfnResponse {
    let log_stream_reason = format!("{LOG_STREAM_REASON_PREFIX}{}", context.log_stream_name);
    let reason = match envelope.reason.as_deref() {
        Some(detail) if !detail.is_empty() => format!("{detail}. {log_stream_reason}"),
        _ => log_stream_reason,
    };

    let physical_resource_id = event
        .physical_resource_id
        .clone()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| context.log_stream_name.clone());

    CfnResponse {
        response_url: event.response_url.clone(),
        body: CfnResponseBody {
            status: envelope.status,
            reason,
            physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: envelope.data.clone(),
        },
    }
}

/// Builds a response for a payload that never decoded into a
/// `LifecycleEvent`. Returns `None` when there is no callback URL to answer.
pub fn build_cfn_response_from_raw(
    raw: &Value,
    context: &InvocationContext,
    envelope: &ResponseEnvelope,
) -> Option<CfnResponse> {
    let text = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);
    let response_url = text("ResponseURL").filter(|url| !url.is_empty())?;

    let event = LifecycleEvent {
        request_type: RequestType::Unsupported,
        response_url,
        stack_id: text("StackId").unwrap_or_default(),
        request_id: text("RequestId").unwrap_or_default(),
        logical_resource_id: text("LogicalResourceId").unwrap_or_default(),
        physical_resource_id: text("PhysicalResourceId"),
        resource_properties: Value::Null,
    };
    Some(build_cfn_response(&event, context, envelope))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_context() -> InvocationContext {
        InvocationContext {
            request_id: "req-1".to_string(),
            log_stream_name: "2026/10/14/[$LATEST]abc".to_string(),
        }
    }

    #[test]
    fn parses_create_event_properties() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://cloudformation-custom-resource-response.example/abc",
            "StackId": "arn:aws:cloudformation:eu-west-1:123:stack/demo/1",
            "RequestId": "r-1",
            "LogicalResourceId": "Files",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:eu-west-1:123:function:uploader",
                "Files": ["index.html:plain://<h1>hi</h1>"],
                "UploadBucket": "artifacts",
                "AWSRegion": "eu-west-1",
                "Zip": "false"
            }
        }))
        .expect("event should parse");

        assert_eq!(event.request_type, RequestType::Create);
        let properties = event.properties().expect("properties should parse");
        assert_eq!(
            properties.files(),
            Some(&["index.html:plain://<h1>hi</h1>".to_string()][..])
        );
        assert_eq!(properties.upload_bucket(), Some("artifacts"));
        assert_eq!(properties.aws_region(), Some("eu-west-1"));
        assert_eq!(properties.s3_key(), None);
        assert_eq!(properties.zip_mode(), ZipMode::Individual);
    }

    #[test]
    fn delete_event_parses_without_properties() {
        let event: LifecycleEvent =
            serde_json::from_value(json!({"RequestType": "Delete"})).expect("event should parse");

        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(
            event.properties().expect("null properties default"),
            ResourceProperties::default()
        );
    }

    #[test]
    fn malformed_properties_only_fail_when_read() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResourceProperties": {"Files": "not-a-list"}
        }))
        .expect("event envelope should parse");

        assert!(event.properties().is_err());
    }

    #[test]
    fn unknown_request_type_is_flagged() {
        let event: LifecycleEvent =
            serde_json::from_value(json!({"RequestType": "Rollback"})).expect("event should parse");
        assert_eq!(event.request_type, RequestType::Unsupported);
    }

    #[test]
    fn blank_bucket_counts_as_missing() {
        let properties = ResourceProperties {
            upload_bucket: Some("  ".to_string()),
            ..ResourceProperties::default()
        };
        assert_eq!(properties.upload_bucket(), None);
    }

    #[test]
    fn zip_mode_defaults_to_archive() {
        assert_eq!(ZipMode::from_property(None), ZipMode::Archive);
        assert_eq!(ZipMode::from_property(Some(&Value::Null)), ZipMode::Archive);
        assert_eq!(ZipMode::from_property(Some(&json!(true))), ZipMode::Archive);
        assert_eq!(ZipMode::from_property(Some(&json!("true"))), ZipMode::Archive);
    }

    #[test]
    fn zip_mode_only_disables_on_false_literal() {
        assert_eq!(
            ZipMode::from_property(Some(&json!(false))),
            ZipMode::Individual
        );
        assert_eq!(
            ZipMode::from_property(Some(&json!("false"))),
            ZipMode::Individual
        );
        assert_eq!(ZipMode::from_property(Some(&json!("False"))), ZipMode::Archive);
        assert_eq!(ZipMode::from_property(Some(&json!("no"))), ZipMode::Archive);
        assert_eq!(ZipMode::from_property(Some(&json!(0))), ZipMode::Archive);
    }

    #[test]
    fn success_response_echoes_request_identity() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://example.invalid/callback",
            "StackId": "stack-1",
            "RequestId": "r-1",
            "LogicalResourceId": "Files"
        }))
        .expect("event should parse");

        let response = build_cfn_response(
            &event,
            &sample_context(),
            &ResponseEnvelope::success_with_message("artifacts/abc.zip"),
        );

        assert_eq!(response.response_url, "https://example.invalid/callback");
        let body = serde_json::to_value(&response.body).expect("body should serialize");
        assert_eq!(
            body,
            json!({
                "Status": "SUCCESS",
                "Reason": "See the details in CloudWatch Log Stream: 2026/10/14/[$LATEST]abc",
                "PhysicalResourceId": "2026/10/14/[$LATEST]abc",
                "StackId": "stack-1",
                "RequestId": "r-1",
                "LogicalResourceId": "Files",
                "NoEcho": false,
                "Data": {"Message": "artifacts/abc.zip"}
            })
        );
    }

    #[test]
    fn failed_response_omits_data_and_keeps_physical_id() {
        let event: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Update",
            "PhysicalResourceId": "existing-id"
        }))
        .expect("event should parse");

        let response = build_cfn_response(
            &event,
            &sample_context(),
            &ResponseEnvelope::failed("UploadBucket is required"),
        );

        assert_eq!(response.body.status, ResponseStatus::Failed);
        assert_eq!(response.body.physical_resource_id, "existing-id");
        assert!(response.body.reason.starts_with("UploadBucket is required. "));
        let body = serde_json::to_value(&response.body).expect("body should serialize");
        assert!(body.get("Data").is_none());
    }

    #[test]
    fn absent_files_stay_distinct_from_empty_list() {
        let absent: ResourceProperties =
            serde_json::from_value(json!({"UploadBucket": "artifacts"})).expect("parse");
        let empty: ResourceProperties =
            serde_json::from_value(json!({"Files": []})).expect("parse");

        assert_eq!(absent.files(), None);
        assert_eq!(empty.files(), Some(&[][..]));
    }

    #[test]
    fn raw_payload_response_echoes_readable_fields() {
        let raw = json!({
            "ResponseURL": "https://example.invalid/callback",
            "StackId": "stack-1",
            "RequestId": "r-1",
            "LogicalResourceId": "Files",
            "PhysicalResourceId": "existing-id",
            "RequestType": 7
        });

        let response = build_cfn_response_from_raw(
            &raw,
            &sample_context(),
            &ResponseEnvelope::failed("invalid lifecycle event"),
        )
        .expect("callback url is present");

        assert_eq!(response.response_url, "https://example.invalid/callback");
        assert_eq!(response.body.status, ResponseStatus::Failed);
        assert_eq!(response.body.stack_id, "stack-1");
        assert_eq!(response.body.request_id, "r-1");
        assert_eq!(response.body.logical_resource_id, "Files");
        assert_eq!(response.body.physical_resource_id, "existing-id");
        assert!(response.body.reason.starts_with("invalid lifecycle event. "));
        assert!(response.body.data.is_none());
    }

    #[test]
    fn raw_payload_without_callback_url_has_no_response() {
        let envelope = ResponseEnvelope::failed("invalid lifecycle event");
        for raw in [json!({"StackId": "s"}), json!({"ResponseURL": ""}), json!("text")] {
            assert!(build_cfn_response_from_raw(&raw, &sample_context(), &envelope).is_none());
        }
    }
}
