pub mod archive;
pub mod http;
pub mod lookup;
pub mod persist;
pub mod presign;
pub mod publish;
