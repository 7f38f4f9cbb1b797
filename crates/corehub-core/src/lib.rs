//! CORE Library
//!
//! Domain models and business operations for the CORE student-services
//! platform: dynamic registration forms, role-scoped access, documents,
//! scheduling and lead conversion.

pub mod access;
pub mod account;
pub mod config;
pub mod document;
pub mod error;
pub mod form;
pub mod lead;
pub mod notify;
pub mod registration;
pub mod schedule;
pub mod service;
mod text;

pub use corehub_redis::RedisPool as DbPool;
pub use error::{CoreError, CoreResult};
