pub mod config;
pub mod info;
mod inputs;
pub mod preview;
pub mod run;
