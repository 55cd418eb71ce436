pub mod apihub;

pub use apihub::{ApihubClient, HttpApihubClient, ACCESS_TOKEN_COOKIE};

#[cfg(test)]
pub use apihub::MockApihubClient;
