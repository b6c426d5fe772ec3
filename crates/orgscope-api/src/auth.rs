// Auth token providers
//
// The client never owns a session. Before every request it asks an
// injected `TokenProvider` for the current bearer token; the host
// application decides where that token comes from.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use secrecy::SecretString;

/// Asynchronous source of bearer tokens.
///
/// Returning `None` means "not signed in": the client answers with a
/// `Not authenticated` envelope without touching the network.
pub trait TokenProvider: Send + Sync {
    fn auth_token(&self) -> BoxFuture<'_, Option<SecretString>>;
}

/// A fixed token, e.g. a personal access token from configuration.
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn auth_token(&self) -> BoxFuture<'_, Option<SecretString>> {
        let token = self.0.clone();
        async move { Some(token) }.boxed()
    }
}

/// Always signed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn auth_token(&self) -> BoxFuture<'_, Option<SecretString>> {
        async { None }.boxed()
    }
}

/// Adapts an async closure, typically one that reads the host's session.
pub struct TokenFn<F>(F);

impl<F, Fut> TokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Option<SecretString>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F, Fut> TokenProvider for TokenFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Option<SecretString>> + Send + 'static,
{
    fn auth_token(&self) -> BoxFuture<'_, Option<SecretString>> {
        (self.0)().boxed()
    }
}
