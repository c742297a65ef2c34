pub mod calibration;
pub mod config;
pub mod consts;
pub mod error;
pub mod extract;
pub mod image;
pub mod io;
pub mod session;
pub mod spectrum;
