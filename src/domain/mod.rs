pub mod device;
pub mod push;
pub mod query;
pub mod subscription;
