pub mod adb;
pub mod traits;

pub use adb::{list_devices, AdbController};
pub use traits::DeviceController;
