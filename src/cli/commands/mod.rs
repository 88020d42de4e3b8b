//! Command handlers. Each takes the shared [`AppContext`](crate::cli::context::AppContext)
//! and prints through [`output`](crate::cli::output::output).

pub mod collection;
pub mod health;
pub mod search;
