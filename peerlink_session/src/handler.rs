//! Message handler trait and built-in handlers

use crate::error::Result;
use crate::store::PayloadStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Message handler trait
///
/// Receives every payload delivered by the receive loop, in wire order.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle a payload
    async fn handle(&self, payload: Bytes) -> Result<()>;
}

#[async_trait]
impl<H: MessageHandler + ?Sized> MessageHandler for Arc<H> {
    async fn handle(&self, payload: Bytes) -> Result<()> {
        (**self).handle(payload).await
    }
}

/// Function-based handler operating on raw payloads
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    /// Wrap an async closure taking the raw payload
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, payload: Bytes) -> Result<()> {
        (self.f)(payload).await
    }
}

/// Decodes payloads as UTF-8 text before handing them to a closure
pub struct TextHandler<F> {
    f: F,
}

impl<F, Fut> TextHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    /// Wrap an async closure taking the decoded text
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for TextHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, payload: Bytes) -> Result<()> {
        let text = std::str::from_utf8(&payload)?.to_owned();
        (self.f)(text).await
    }
}

type SavedCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Materializes payloads as files through a [`PayloadStore`]
pub struct StoreHandler {
    store: Arc<dyn PayloadStore>,
    on_saved: Option<SavedCallback>,
}

impl StoreHandler {
    /// Save every payload through `store`
    pub fn new(store: Arc<dyn PayloadStore>) -> Self {
        Self {
            store,
            on_saved: None,
        }
    }

    /// Called with the written path after every successful save
    pub fn on_saved<F>(mut self, f: F) -> Self
    where
        F: Fn(PathBuf) + Send + Sync + 'static,
    {
        self.on_saved = Some(Arc::new(f));
        self
    }
}

#[async_trait]
impl MessageHandler for StoreHandler {
    async fn handle(&self, payload: Bytes) -> Result<()> {
        let path = self.store.save(&payload).await?;
        info!(path = %path.display(), len = payload.len(), "received file");

        if let Some(on_saved) = &self.on_saved {
            on_saved(path);
        }
        Ok(())
    }
}
