use std::path::Path;

pub trait ObjectStore {
    fn get_object(&self, region: &str, bucket: &str, key: &str) -> Result<Vec<u8>, String>;

    fn put_object(&self, region: &str, bucket: &str, key: &str, body: &[u8])
        -> Result<(), String>;

    fn upload_file(&self, region: &str, bucket: &str, key: &str, path: &Path)
        -> Result<(), String>;
}
