//! Query modules for all CORE collections stored in Redis.

pub mod answers;
pub mod calendar;
pub mod conversions;
pub mod documents;
pub mod followups;
pub mod forms;
pub mod leads;
pub mod registrations;
pub mod schedules;
pub mod services;
pub mod students;
pub mod teammeets;
pub mod users;
