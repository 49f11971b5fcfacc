//! Simulated browser host: tabs, page loads, and the wiring between the
//! coordinator, the message bus and the per-page agents.

use crate::agent::{InputReport, PageAgent, PageInput, PageSettings, PageSnapshot, UserInput};
use crate::bus::{MessageBus, PageDirectory};
use crate::config::RefillConfig;
use crate::coordinator::{Coordinator, CoordinatorHandle, TabQuery};
use crate::error::BrowserError;
use crate::popup::Popup;
use crate::profiles::ProfileStore;
use crate::registry::RecordingRegistry;
use crate::store::{KeyValueStore, MemoryStore};
use async_trait::async_trait;
use refill_common::TabId;
use refill_common::error::MessagingError;
use refill_common::protocol::{CoordinatorAction, Origin, RecordingStateReply, Reply};
use refill_page::dom::PageFixture;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock, oneshot};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ActiveTab {
    tab: RwLock<Option<TabId>>,
}

#[async_trait]
impl TabQuery for ActiveTab {
    async fn active_tab(&self) -> Option<TabId> {
        *self.tab.read().await
    }
}

impl ActiveTab {
    async fn set(&self, tab: Option<TabId>) {
        *self.tab.write().await = tab;
    }
}

#[derive(Debug, Clone)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
}

pub struct Browser {
    tabs: Mutex<BTreeMap<TabId, PageFixture>>,
    next_tab: Mutex<u32>,
    active: Arc<ActiveTab>,
    pages: Arc<PageDirectory>,
    ephemeral: Arc<MemoryStore>,
    profiles: Arc<ProfileStore>,
    coordinator: CoordinatorHandle,
    settings: PageSettings,
    inject_on_load: bool,
}

impl Browser {
    /// Start the coordinator over `durable` plus a fresh ephemeral store.
    pub fn launch(config: &RefillConfig, durable: Arc<dyn KeyValueStore>) -> Self {
        let ephemeral = Arc::new(MemoryStore::new());
        let profiles = Arc::new(ProfileStore::new(durable));
        let pages = Arc::new(PageDirectory::new());
        let bus = Arc::new(MessageBus::new(pages.clone()));
        let active = Arc::new(ActiveTab::default());

        let coordinator = Coordinator::new(
            RecordingRegistry::new(ephemeral.clone()),
            profiles.clone(),
            bus,
            active.clone(),
        )
        .spawn();

        info!(
            inject_on_load = config.agent.inject_on_load,
            "Browser launched"
        );
        Self {
            tabs: Mutex::new(BTreeMap::new()),
            next_tab: Mutex::new(1),
            active,
            pages,
            ephemeral,
            profiles,
            coordinator,
            settings: PageSettings {
                capture: config.capture.clone(),
                show_indicator: config.agent.show_indicator,
            },
            inject_on_load: config.agent.inject_on_load,
        }
    }

    pub fn popup(&self) -> Popup {
        Popup::new(self.coordinator.clone())
    }

    pub fn coordinator(&self) -> &CoordinatorHandle {
        &self.coordinator
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn ephemeral(&self) -> &Arc<MemoryStore> {
        &self.ephemeral
    }

    /// Open `page` in a new tab and focus it.
    pub async fn open_tab(&self, page: PageFixture) -> TabId {
        let tab = {
            let mut next = self.next_tab.lock().await;
            let tab = TabId(*next);
            *next += 1;
            tab
        };
        self.tabs.lock().await.insert(tab, page.clone());
        self.active.set(Some(tab)).await;
        self.load(tab, &page).await;
        tab
    }

    pub async fn navigate(&self, tab: TabId, page: PageFixture) -> Result<(), BrowserError> {
        {
            let mut tabs = self.tabs.lock().await;
            let slot = tabs.get_mut(&tab).ok_or(BrowserError::NoSuchTab(tab))?;
            *slot = page.clone();
        }
        self.load(tab, &page).await;
        Ok(())
    }

    pub async fn reload(&self, tab: TabId) -> Result<(), BrowserError> {
        let page = self
            .tabs
            .lock()
            .await
            .get(&tab)
            .cloned()
            .ok_or(BrowserError::NoSuchTab(tab))?;
        self.load(tab, &page).await;
        Ok(())
    }

    pub async fn activate(&self, tab: TabId) -> Result<(), BrowserError> {
        if !self.tabs.lock().await.contains_key(&tab) {
            return Err(BrowserError::NoSuchTab(tab));
        }
        self.active.set(Some(tab)).await;
        Ok(())
    }

    /// Close a tab and unload its page. The recording registry is left alone:
    /// its entry lives until the ephemeral store is cleared.
    pub async fn close_tab(&self, tab: TabId) -> Result<(), BrowserError> {
        let remaining: Vec<TabId> = {
            let mut tabs = self.tabs.lock().await;
            tabs.remove(&tab).ok_or(BrowserError::NoSuchTab(tab))?;
            tabs.keys().copied().collect()
        };
        self.pages.detach(tab).await;
        if self.active.active_tab().await == Some(tab) {
            self.active.set(remaining.last().copied()).await;
        }
        info!(tab = %tab, "Tab closed");
        Ok(())
    }

    pub async fn active_tab(&self) -> Option<TabId> {
        self.active.active_tab().await
    }

    pub async fn tabs(&self) -> Vec<TabInfo> {
        let active = self.active_tab().await;
        self.tabs
            .lock()
            .await
            .iter()
            .map(|(id, page)| TabInfo {
                id: *id,
                url: page.url.clone(),
                title: page.title.clone(),
                active: active == Some(*id),
            })
            .collect()
    }

    /// Deliver user input to the page in `tab`. A press of the in-page stop
    /// button is relayed to the coordinator before returning.
    pub async fn input(
        &self,
        tab: TabId,
        input: UserInput,
        at_ms: Option<u64>,
    ) -> Result<InputReport, BrowserError> {
        let inbox = self
            .pages
            .inbox(tab)
            .await
            .ok_or(BrowserError::NoSuchTab(tab))?;
        let (reply, response) = oneshot::channel();
        inbox
            .send(PageInput::User {
                input,
                at_ms,
                reply,
            })
            .await
            .map_err(|_| BrowserError::PageGone(tab))?;
        let report = response.await.map_err(|_| BrowserError::PageGone(tab))??;

        if report.stop_requested {
            let reply = self
                .coordinator
                .request(Origin::Tab(tab), CoordinatorAction::StopRecordingFromPage)
                .await?;
            if !reply.is_ok() {
                warn!(tab = %tab, "Coordinator rejected stop from page: {:?}", reply);
            }
        }
        Ok(report)
    }

    pub async fn inspect(&self, tab: TabId) -> Result<PageSnapshot, BrowserError> {
        let inbox = self
            .pages
            .inbox(tab)
            .await
            .ok_or(BrowserError::NoSuchTab(tab))?;
        let (reply, response) = oneshot::channel();
        inbox
            .send(PageInput::Inspect { reply })
            .await
            .map_err(|_| BrowserError::PageGone(tab))?;
        response.await.map_err(|_| BrowserError::PageGone(tab))
    }

    /// The coordinator's view of `tab`, asked on the tab's behalf.
    pub async fn recording_state(&self, tab: TabId) -> Result<RecordingStateReply, BrowserError> {
        let reply = self
            .coordinator
            .request(Origin::Tab(tab), CoordinatorAction::GetRecordingStateForTab)
            .await?;
        match reply {
            Reply::State(state) => Ok(state),
            other => Err(MessagingError::UnexpectedReply(format!("{:?}", other)).into()),
        }
    }

    /// Load a fresh document into `tab`, replacing (and unloading) the
    /// previous page, then report navigation-complete to the coordinator.
    async fn load(&self, tab: TabId, page: &PageFixture) {
        let doc = page.load(now_ms());
        let inbox = PageAgent::spawn(
            tab,
            doc,
            self.settings.clone(),
            self.profiles.clone(),
            self.coordinator.clone(),
            self.inject_on_load,
        );
        self.pages.attach(tab, inbox).await;
        info!(tab = %tab, url = %page.url, "Navigation complete");

        if let Err(e) = self.coordinator.navigation_complete(tab).await {
            warn!(tab = %tab, "Coordinator not notified of navigation: {}", e);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
