//! CLI module - command implementations behind `sfq`

pub mod commands;
