#[macro_use]
pub mod error;

pub mod ast;
pub mod binder;
pub mod catalog;
pub mod config;
pub mod event;
pub mod executor;
pub mod mode;
pub mod persist;
pub mod planner;
pub mod refresher;
pub mod rewrite;
pub mod route;
pub mod rule;
pub mod transaction;
pub mod types;
