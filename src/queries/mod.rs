//! Store-backed query modules.
//!
//! Each module provides a struct that borrows the shared
//! [`Connection`](crate::connection::Connection) and exposes methods
//! returning `Result<T>` with typed models.

pub mod investments;
pub mod projects;

pub use investments::InvestmentQuery;
pub use projects::{ListProjectsParams, ProjectStore};
