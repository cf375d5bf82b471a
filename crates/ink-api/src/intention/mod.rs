pub mod api;

pub use api::intentions_router;
