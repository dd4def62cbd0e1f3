pub mod dispatcher;
pub mod store;
pub mod subscription_store;
pub mod translator;
