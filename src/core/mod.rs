//! Configuration, domain records and request validation shared by every service.

pub mod config;
pub mod models;
pub mod validate;
