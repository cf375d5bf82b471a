pub mod api;

pub use api::settings_router;
