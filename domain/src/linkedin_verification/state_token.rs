use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// Length of every generated OAuth state token.
pub const STATE_TOKEN_LEN: usize = 32;

/// Source of OAuth state tokens, injectable so tests can use fixed values.
pub trait StateTokenSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws alphanumeric tokens from the operating system's CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRngStateTokens;

impl StateTokenSource for OsRngStateTokens {
    fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(STATE_TOKEN_LEN)
            .map(char::from)
            .collect()
    }
}
