/// Registered user. `token` is the opaque bearer credential that owns
/// wallets; neither field changes after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub token: String,
}

impl User {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}
