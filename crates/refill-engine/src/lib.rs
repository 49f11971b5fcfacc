pub mod agent;
pub mod browser;
pub mod bus;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod popup;
pub mod profiles;
pub mod registry;
pub mod store;

pub use refill_common::protocol;
pub use refill_page::dom::PageFixture;
