use std::time::Duration;

pub trait ObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String>;

    /// Signs a time-bounded GET. The object is not required to exist.
    fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, String>;
}
