pub mod auth;
pub mod keys;
pub mod status;
pub mod webhook;
