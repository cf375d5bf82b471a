pub mod api;

pub use api::assistant_router;
