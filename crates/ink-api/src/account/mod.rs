pub mod api;

pub use api::account_router;
