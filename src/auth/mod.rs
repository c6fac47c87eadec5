pub mod credentials;
pub mod manager;
pub mod oauth;
pub mod secrets;
