//! Coordinator-to-page messaging.
//!
//! Each request carries a correlation id and gets exactly one reply through a
//! oneshot channel. A tab whose page has no agent answers `NoReceiver`; the bus
//! then injects once and retries once before giving up with `Unreachable`.

use crate::agent::{AgentReply, PageInput};
use async_trait::async_trait;
use refill_common::TabId;
use refill_common::error::MessagingError;
use refill_common::protocol::{AgentAction, Envelope, Reply};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Loads the page agent into a tab on demand.
#[async_trait]
pub trait Injector: Send + Sync {
    async fn inject(&self, tab: TabId) -> Result<(), MessagingError>;
}

/// Inboxes of the pages currently loaded, by tab.
#[derive(Default)]
pub struct PageDirectory {
    pages: RwLock<HashMap<TabId, mpsc::Sender<PageInput>>>,
}

impl PageDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the page now loaded in `tab`. The previous page's inbox is
    /// returned; dropping it unloads that page.
    pub async fn attach(
        &self,
        tab: TabId,
        inbox: mpsc::Sender<PageInput>,
    ) -> Option<mpsc::Sender<PageInput>> {
        self.pages.write().await.insert(tab, inbox)
    }

    pub async fn detach(&self, tab: TabId) -> Option<mpsc::Sender<PageInput>> {
        self.pages.write().await.remove(&tab)
    }

    pub async fn inbox(&self, tab: TabId) -> Option<mpsc::Sender<PageInput>> {
        self.pages.read().await.get(&tab).cloned()
    }
}

#[async_trait]
impl Injector for PageDirectory {
    async fn inject(&self, tab: TabId) -> Result<(), MessagingError> {
        let failed = |reason: &str| MessagingError::InjectionFailed {
            tab,
            reason: reason.to_string(),
        };
        let inbox = self.inbox(tab).await.ok_or_else(|| failed("no page loaded"))?;
        let (reply, done) = oneshot::channel();
        inbox
            .send(PageInput::Inject { reply })
            .await
            .map_err(|_| failed("page unloaded"))?;
        done.await.map_err(|_| failed("page unloaded"))
    }
}

pub struct MessageBus {
    pages: Arc<PageDirectory>,
    injector: Arc<dyn Injector>,
    next_id: AtomicU64,
}

impl MessageBus {
    /// Bus whose injector loads the agent into the directory's own pages.
    pub fn new(pages: Arc<PageDirectory>) -> Self {
        let injector: Arc<dyn Injector> = pages.clone();
        Self::with_injector(pages, injector)
    }

    pub fn with_injector(pages: Arc<PageDirectory>, injector: Arc<dyn Injector>) -> Self {
        Self {
            pages,
            injector,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn send(&self, tab: TabId, action: AgentAction) -> Result<Reply, MessagingError> {
        match self.deliver(tab, action.clone()).await {
            Err(MessagingError::NoReceiver(_)) => {}
            other => return other,
        }

        info!(tab = %tab, action = action.name(), "No agent in tab, injecting");
        self.injector.inject(tab).await?;

        match self.deliver(tab, action.clone()).await {
            Err(MessagingError::NoReceiver(_)) => {
                warn!(tab = %tab, action = action.name(), "Agent still unreachable after retry");
                Err(MessagingError::Unreachable {
                    tab,
                    action: action.name().to_string(),
                })
            }
            other => other,
        }
    }

    async fn deliver(&self, tab: TabId, action: AgentAction) -> AgentReply {
        let inbox = self
            .pages
            .inbox(tab)
            .await
            .ok_or(MessagingError::NoReceiver(tab))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, tab = %tab, action = action.name(), "Delivering to page");

        let (reply, response) = oneshot::channel();
        inbox
            .send(PageInput::Command {
                envelope: Envelope {
                    id,
                    payload: action,
                },
                reply,
            })
            .await
            .map_err(|_| MessagingError::NoReceiver(tab))?;
        response
            .await
            .map_err(|_| MessagingError::NoReceiver(tab))?
    }
}
