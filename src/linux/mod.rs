pub mod device;
pub mod dualsense;
pub mod gamepad;
pub mod keyboard;
pub mod mouse;
pub mod pentablet;
pub mod sysfs;
pub mod touch;
pub mod touchscreen;
pub mod trackpad;
pub mod uhid;
pub mod uhid_proto;
pub mod uinput;
