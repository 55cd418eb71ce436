/// Identity of the caller a request is executed for. Registry calls made
/// on behalf of a user reuse their token, background work runs as the
/// system context and falls back to the agent's access token.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    user_id: String,
    token: String,
}

impl SecurityContext {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        SecurityContext { user_id: user_id.into(), token: token.into() }
    }

    pub fn system() -> Self {
        SecurityContext { user_id: "system".to_string(), token: String::new() }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_token(&self) -> &str {
        &self.token
    }
}
