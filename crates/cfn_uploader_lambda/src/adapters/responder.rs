use crate::runtime::contract::CfnResponse;

pub trait LifecycleResponder {
    fn send_response(&self, response: &CfnResponse) -> Result<(), String>;
}
