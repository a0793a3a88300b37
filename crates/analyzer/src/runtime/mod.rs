//! Runtime module: command-line lifecycle: arguments, boot, run.

pub mod boot;
pub mod cli;
pub mod run;
