use serde_json::Value;

pub fn log_info(component: &str, event: &str, details: Value) {
    tracing::info!(component, event, details = %details, "{event}");
}

pub fn log_warn(component: &str, event: &str, details: Value) {
    tracing::warn!(component, event, details = %details, "{event}");
}

pub fn log_error(component: &str, event: &str, details: Value) {
    tracing::error!(component, event, details = %details, "{event}");
}
