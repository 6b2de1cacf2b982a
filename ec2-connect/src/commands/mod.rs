pub mod connect;
pub mod metadata;
pub mod resolve;
