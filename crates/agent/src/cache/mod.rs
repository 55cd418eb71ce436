pub mod namespaces;
pub mod services;

pub use namespaces::NamespaceListCache;
pub use services::ServiceListCache;
