pub mod api;
pub mod batch;
pub mod body;
pub mod error;
pub mod store;
pub mod transport;
