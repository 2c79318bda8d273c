pub mod auth;
pub mod error;
pub mod homepage;
pub mod middleware;
pub mod projects;
pub mod storage;
pub mod uploads;
pub mod users;
