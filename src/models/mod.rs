pub mod api;
pub mod rate;
