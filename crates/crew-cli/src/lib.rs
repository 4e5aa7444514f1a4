//! Library half of the `crew` binary, so the commands can be tested
//! against an in-process `AppState`.

pub mod commands;
