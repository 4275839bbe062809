#![allow(dead_code)]

use std::net::SocketAddr;

use satchel_server::{auth::TokenSigner, routes, state::AppState};
use satchel_share::{Fixture, ShareLinks, UserId};
use tokio::net::TcpListener;

pub const TOKEN_SECRET: &str = "test-token-secret";

/// A server on an ephemeral port over an in-memory deployment whose clock
/// only moves when a test advances it.
pub struct TestServer {
    pub url: String,
    pub fixture: Fixture,
    pub client: reqwest::Client,
    tokens: TokenSigner,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        let fixture = Fixture::new()?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let url = format!("http://{addr}");

        let links = ShareLinks::new(format!("{url}/s").parse()?)?;
        let tokens = TokenSigner::new(TOKEN_SECRET);
        let state = AppState::new(fixture.handles.clone(), links, tokens.clone());

        tokio::spawn(async move {
            axum::serve(listener, routes::router(state)).await.ok();
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            url,
            fixture,
            client,
            tokens,
        })
    }

    pub fn token(&self, user: &str) -> String {
        self.tokens.issue(&UserId::new(user))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Upload a text file as `owner`, returning its id
    pub async fn upload(&self, owner: &str, name: &str, body: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .post(self.url("/files"))
            .bearer_auth(self.token(owner))
            .query(&[("name", name)])
            .header("content-type", "text/plain")
            .body(body.to_owned())
            .send()
            .await?
            .error_for_status()?;
        let file: serde_json::Value = response.json().await?;
        Ok(file["id"].as_str().unwrap_or_default().to_owned())
    }

    /// Share `file` as `owner`, returning the share link JSON
    pub async fn share(
        &self,
        owner: &str,
        file: &str,
        duration_days: Option<u32>,
    ) -> anyhow::Result<serde_json::Value> {
        let response = self
            .client
            .post(self.url("/shares"))
            .bearer_auth(self.token(owner))
            .json(&serde_json::json!({ "file": file, "duration_days": duration_days }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
