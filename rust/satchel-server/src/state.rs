use std::{fmt::Debug, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use satchel_common::{Clock, SystemClock};
use satchel_s3_credentials::{Address, Credentials, Minter};
use satchel_share::{
    CapabilityStore, DocumentCapabilityStore, DocumentFiles, FileRegistry, Handles, Library,
    Lifecycle, Resolver, ShareLinks,
};
use satchel_storage::{
    CborEncoder, Collection, DocumentBackend, Encoder, FileSystemBackend, JsonEncoder,
    MemoryBackend, MemoryObjectStore, ObjectStore, S3ObjectStore,
};

use crate::{
    auth::TokenSigner,
    config::{Config, DocumentBackendKind, DocumentEncoding, ObjectBackendKind},
};

/// Request handling limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub request_timeout: Duration,
    pub max_upload: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_upload: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub handles: Handles,
    pub lifecycle: Lifecycle,
    pub library: Library,
    pub resolver: Resolver,
    pub links: ShareLinks,
    pub tokens: TokenSigner,
    pub limits: Limits,
}

impl AppState {
    pub fn new(handles: Handles, links: ShareLinks, tokens: TokenSigner) -> Self {
        Self {
            lifecycle: Lifecycle::new(handles.clone()),
            library: Library::new(handles.clone()),
            resolver: Resolver::new(handles.clone()),
            handles,
            links,
            tokens,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Wire up the backends named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (shares, files) = match config.documents {
            DocumentBackendKind::Memory => {
                document_stores(MemoryBackend::default(), config.encoding)
            }
            DocumentBackendKind::Fs => {
                let backend = FileSystemBackend::new(config.data_dir.join("documents"))
                    .await
                    .with_context(|| {
                        format!("opening data directory {}", config.data_dir.display())
                    })?;
                document_stores(backend, config.encoding)
            }
        };

        let credentials = Credentials::new(
            Address::new(&config.s3_endpoint, &config.s3_region, &config.s3_bucket),
            &config.s3_access_key_id,
            &config.s3_secret_access_key,
        )
        .context("invalid object storage settings")?;
        let minter = Minter::new(credentials, clock.clone())
            .with_ceiling(config.ceiling());

        let objects: Arc<dyn ObjectStore> = match config.objects {
            ObjectBackendKind::Memory => Arc::new(MemoryObjectStore::new(minter)),
            ObjectBackendKind::S3 => Arc::new(S3ObjectStore::new(minter)),
        };

        let links = ShareLinks::new(config.public_url.clone())?;

        let tokens = match &config.token_secret {
            Some(secret) => TokenSigner::new(secret),
            None => {
                tracing::warn!("No token secret configured; issued tokens will not survive a restart");
                TokenSigner::new(satchel_common::random_identifier())
            }
        };

        let handles = Handles {
            shares,
            files,
            objects,
            clock,
        };

        Ok(Self::new(handles, links, tokens).with_limits(Limits {
            request_timeout: config.request_timeout(),
            max_upload: config.max_upload,
        }))
    }
}

type DocumentStores = (Arc<dyn CapabilityStore>, Arc<dyn FileRegistry>);

fn document_stores<B>(backend: B, encoding: DocumentEncoding) -> DocumentStores
where
    B: DocumentBackend + 'static,
{
    match encoding {
        DocumentEncoding::Json => encoded_stores(backend, JsonEncoder),
        DocumentEncoding::Cbor => encoded_stores(backend, CborEncoder),
    }
}

fn encoded_stores<B, E>(backend: B, encoder: E) -> DocumentStores
where
    B: DocumentBackend + 'static,
    E: Encoder + Debug + 'static,
{
    (
        Arc::new(DocumentCapabilityStore::from_collection(
            Collection::with_encoder(backend.clone(), encoder.clone()),
        )),
        Arc::new(DocumentFiles::from_collection(Collection::with_encoder(
            backend, encoder,
        ))),
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use satchel_share::UserId;

    use super::*;

    #[tokio::test]
    async fn it_builds_an_in_memory_deployment_from_defaults() -> anyhow::Result<()> {
        let config = Config::try_parse_from(["satchel", "--token-secret", "s3cret"])?;
        let state = AppState::from_config(&config).await?;

        let alice = UserId::new("alice");
        let token = TokenSigner::new("s3cret").issue(&alice);

        assert_eq!(state.tokens.verify(&token), Ok(alice));
        assert_eq!(state.limits.request_timeout, Duration::from_secs(30));
        Ok(())
    }

    #[tokio::test]
    async fn it_persists_documents_under_the_data_directory() -> anyhow::Result<()> {
        let data = tempfile::tempdir()?;
        let data_dir = data.path().display().to_string();
        let config = Config::try_parse_from([
            "satchel",
            "--documents",
            "fs",
            "--data-dir",
            data_dir.as_str(),
        ])?;
        let state = AppState::from_config(&config).await?;

        let alice = UserId::new("alice");
        let file = state
            .library
            .upload(&alice, "notes.txt", "text/plain", b"hi".to_vec())
            .await?;
        state.lifecycle.create(&alice, &file.id, None).await?;

        assert!(data.path().join("documents").read_dir()?.count() >= 2);
        Ok(())
    }

    #[tokio::test]
    async fn it_reads_back_cbor_records_from_the_data_directory() -> anyhow::Result<()> {
        let data = tempfile::tempdir()?;
        let data_dir = data.path().display().to_string();
        let args = [
            "satchel",
            "--documents",
            "fs",
            "--encoding",
            "cbor",
            "--data-dir",
            data_dir.as_str(),
        ];

        let state = AppState::from_config(&Config::try_parse_from(args)?).await?;
        let alice = UserId::new("alice");
        let file = state
            .library
            .upload(&alice, "notes.txt", "text/plain", b"hi".to_vec())
            .await?;
        let share = state.lifecycle.create(&alice, &file.id, None).await?;

        let reopened = AppState::from_config(&Config::try_parse_from(args)?).await?;
        assert_eq!(reopened.handles.shares.get(share.id()).await?, Some(share));
        assert_eq!(reopened.library.get(&alice, &file.id).await?, file);

        let json = Config::try_parse_from([
            "satchel",
            "--documents",
            "fs",
            "--data-dir",
            data_dir.as_str(),
        ])?;
        let mismatched = AppState::from_config(&json).await?;
        assert!(mismatched.library.list(&alice).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn it_rejects_an_unusable_public_url() {
        let config =
            Config::try_parse_from(["satchel", "--public-url", "mailto:share@example.com"])
                .unwrap();

        assert!(AppState::from_config(&config).await.is_err());
    }
}
