pub mod config;
pub mod countdown;
pub mod dispatch;
pub mod errors;
pub mod monitor;
pub mod realtime;
pub mod ui;
