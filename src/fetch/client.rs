use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes HTTP requests for the upstream data source.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
