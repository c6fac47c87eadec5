pub mod auth;
pub mod config;
pub mod domain;
pub mod logging;
pub mod mail;
pub mod session;
pub mod terminal;

#[cfg(test)]
mod testing;
