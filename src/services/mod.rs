/// Application services
///
/// Stateless orchestrators over the store capabilities. They hold no data of
/// their own; everything durable lives behind the capability traits.

pub mod credentials;
pub mod profile;

pub use credentials::{CredentialService, CredentialSettings, CredentialStores};
pub use profile::ProfileService;
