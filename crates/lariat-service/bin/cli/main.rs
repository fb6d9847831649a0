mod cli;

use std::sync::Arc;

use crate::cli::{Command, CLI};
use anyhow::{bail, Context};
use clap::Parser;
use jiff::SignedDuration;
use lariat_cache::MokaLinkCache;
use lariat_core::{Alphabet, Codec, LinkStore, ObfuscatingCodec};
use lariat_generator::RandomCodeGenerator;
use lariat_service::{CreateRequest, ExpirationPolicy, ResolutionService};
use lariat_storage::SqliteLinkStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = CLI::parse();

    let codec: Arc<dyn Codec> = Arc::new(ObfuscatingCodec::new(config.codec_key.as_bytes()));
    let store = SqliteLinkStore::connect(&config.database_url, codec)
        .await
        .with_context(|| format!("open database at {}", config.database_url))?;
    store.migrate().await.context("run migrations")?;

    let service = ResolutionService::new(
        store,
        MokaLinkCache::new(),
        RandomCodeGenerator::new(),
        Alphabet::base62(),
    );

    match config.command {
        Command::Shorten {
            url,
            length,
            expires_in,
        } => {
            let expiration = match expires_in {
                Some(secs) => ExpirationPolicy::AfterDuration(SignedDuration::from_secs(secs)),
                None => ExpirationPolicy::Never,
            };
            let created = service
                .create(CreateRequest {
                    original_url: url,
                    code_length: length,
                    expiration,
                })
                .await?;
            println!("{}", created.short_code);
        }
        Command::Resolve { code, metadata } => {
            service.warm_cache().await?;
            let url = service.resolve(&code, &metadata).await?;
            println!("{url}");
        }
        Command::Ban { code } => {
            if service.store().ban(&code).await? {
                info!(%code, "link banned");
            } else {
                bail!("no bannable link with code {code}");
            }
        }
        Command::Warmup => {
            let loaded = service.warm_cache().await?;
            println!("loaded {loaded} links into the cache");
        }
    }

    Ok(())
}
