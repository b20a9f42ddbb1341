pub mod config;
pub mod devices;
pub mod info;
pub mod play;
pub mod tone;
