pub trait HttpFetcher {
    /// Returns the response body of a `GET`; non-success statuses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>, String>;
}
