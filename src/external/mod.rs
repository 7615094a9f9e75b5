pub mod blob;
pub mod s3;
