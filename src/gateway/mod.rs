pub mod local_fs;
pub mod s3;
pub mod sigv4;

pub use local_fs::LocalObjectStore;
pub use s3::S3ObjectStore;
