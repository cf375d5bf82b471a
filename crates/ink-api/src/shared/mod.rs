pub mod api_common;
pub mod error;
pub mod extract;
pub mod validation;
