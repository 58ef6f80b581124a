use rand::{RngCore, rngs::OsRng};

/// Issues fresh opaque identifiers: user bearer tokens and wallet addresses.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self) -> String;
}

/// Decides whether a token grants access to platform statistics.
pub trait AdminAuthority: Send + Sync {
    fn is_admin(&self, token: &str) -> bool;
}

/// `len_bytes` bytes from the OS random source, hex encoded.
#[derive(Debug, Clone, Copy)]
pub struct RandomHexTokens {
    len_bytes: usize,
}

impl RandomHexTokens {
    pub fn new(len_bytes: usize) -> Self {
        Self { len_bytes }
    }
}

impl TokenIssuer for RandomHexTokens {
    fn issue(&self) -> String {
        let mut bytes = vec![0u8; self.len_bytes];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// Single configured admin credential. An empty credential admits nobody.
#[derive(Debug, Clone)]
pub struct StaticAdminToken {
    token: String,
}

impl StaticAdminToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl AdminAuthority for StaticAdminToken {
    fn is_admin(&self, token: &str) -> bool {
        !self.token.is_empty() && self.token == token
    }
}
