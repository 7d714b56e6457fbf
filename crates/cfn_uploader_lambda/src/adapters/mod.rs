pub mod http_fetch;
pub mod object_store;
pub mod responder;
