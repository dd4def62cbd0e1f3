pub mod device;
pub mod subscription;

pub use device::DeviceRecord;
pub use subscription::SubscriptionRecord;
