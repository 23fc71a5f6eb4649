//! # servobench-server
//!
//! Binds the command protocol to the servo bank:
//! - [`dispatch`] applies decoded commands and builds replies
//! - [`ServoServer`] moves JSON text frames over WebSocket
//! - [`FileSettings`] backs the settings capability with a JSON file on
//!   Linux hosts
//! - [`RunMode`] persists the calibration/working mode across boots
//!
//! [`dispatch`]: dispatch::dispatch

pub mod dispatch;
pub mod mode;
pub mod server;
pub mod storage;

pub use dispatch::{config_report, dispatch, handle_text};
pub use mode::{load_mode, save_mode, RunMode};
pub use server::{ServerConfig, ServoServer};
pub use storage::FileSettings;
