//! HTTP surface for the account service.

pub mod users_http;

pub use users_http::{build_router, ErrorResponse, IdResponse, ProfileResponse, UpdateUserBody, UsersHttpServer};
