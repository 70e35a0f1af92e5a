pub mod auth;
pub mod http;
pub mod management_api;

pub use management_api::ManagementApi;
