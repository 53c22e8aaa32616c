//! 块设备抽象
//!
//! block/device.rs 定义缓存消费的设备接口：整块、同步的读写传输。
//! block/ram.rs 提供一个内存实现，可统计物理 I/O 并注入故障。

mod device;
mod ram;

pub use device::BlockDevice;
pub use ram::RamDisk;
