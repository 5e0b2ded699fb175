pub mod builder;
pub mod contexts;
pub mod manager;

pub use self::{builder::MetaDataContextsBuilder, contexts::MetaDataContexts, manager::ContextManager};
