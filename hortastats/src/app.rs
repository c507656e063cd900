//! Application state and initialization
//!
//! This module manages the state shared by every function invocation.
//! The storage connection is established lazily, on the first request
//! that needs it, and then reused.

use crate::config::Config;
use crate::database::{create_pool, Repository};
use crate::error::{AppError, Result};
use crate::services::{AuthService, ImagesService, PostsService};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

/// Services backing the function handlers
#[derive(Clone)]
pub struct Services {
    pub posts: PostsService,
    pub images: ImagesService,
    pub auth: AuthService,
}

impl Services {
    fn new(config: &Config, repo: Option<Repository>) -> Self {
        Self {
            posts: PostsService::new(repo.clone()),
            images: ImagesService::new(repo),
            auth: AuthService::new(config),
        }
    }
}

/// Central application state shared by all handlers
pub struct AppState {
    config: Config,
    services: OnceCell<Services>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            services: OnceCell::new(),
        }
    }

    /// State backed by an already open pool
    pub fn with_pool(config: Config, pool: SqlitePool) -> Self {
        let services = Services::new(&config, Some(Repository::new(pool)));
        Self {
            config,
            services: OnceCell::from(services),
        }
    }

    /// Services, connecting to storage on first use.
    ///
    /// A failed connection is not cached; the next request tries again.
    pub async fn services(&self) -> Result<&Services> {
        self.services
            .get_or_try_init(|| async {
                let repo = match &self.config.database_url {
                    Some(url) => {
                        tracing::info!("Connecting to configured database");
                        Some(Repository::new(create_pool(url).await?))
                    }
                    None => {
                        tracing::warn!(
                            "DATABASE_URL not set: reads return empty results and writes fail"
                        );
                        None
                    }
                };
                Ok::<_, AppError>(Services::new(&self.config, repo))
            })
            .await
    }
}
