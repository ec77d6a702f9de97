// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod network;
pub mod render;
pub mod runtime;
pub mod session;
pub mod source;
pub mod stats;
pub mod store;
pub mod timer;
pub mod tracker;
pub mod ui;
pub mod util;
