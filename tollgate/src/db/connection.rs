//! Lazily established, process-wide connection handle
//!
//! The first caller runs the connector; concurrent callers await that same
//! attempt. A failed attempt leaves the cell empty so the next call retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::BoxError;

type ConnectFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;
type Connector<T> = Arc<dyn Fn() -> ConnectFuture<T> + Send + Sync>;

pub struct LazyHandle<T> {
    cell: Arc<OnceCell<T>>,
    connect: Connector<T>,
}

impl<T> Clone for LazyHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            connect: self.connect.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> LazyHandle<T> {
    pub fn new<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            connect: Arc::new(move || Box::pin(connect())),
        }
    }

    /// Get the handle, connecting on first use
    pub async fn get(&self) -> Result<&T, BoxError> {
        self.cell.get_or_try_init(|| (self.connect)()).await
    }

    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
