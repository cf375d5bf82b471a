pub mod api;

pub use api::entries_router;
