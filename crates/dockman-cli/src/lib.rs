//! Library half of the dockman binary: headless commands and logging setup

pub mod commands;
pub mod logging;
