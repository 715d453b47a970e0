use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes HTTP requests; implemented by [`super::BasicClient`] and by
/// test doubles.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
