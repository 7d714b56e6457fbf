pub use cfn_uploader_core::{archive_name, contract, file_spec};
