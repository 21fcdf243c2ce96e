/// Middleware module
///
/// The access-control decision and its actix-web adapter.

pub mod access;
mod auth_middleware;

pub use access::{methods, Access, AuthInterceptor, CallContext, Metadata, MethodTable};
pub use auth_middleware::AuthMiddleware;
