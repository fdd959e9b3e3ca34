pub mod catalog;
pub mod config;
pub mod geo;
pub mod hours;
pub mod platform;
pub mod protocol;
pub mod storage;
