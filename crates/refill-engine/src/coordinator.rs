//! The coordinator: a single task owning the recording registry.
//!
//! Requests arrive on one queue and are handled to completion one at a time,
//! so the registry's whole-map read-modify-write never interleaves.

use crate::bus::MessageBus;
use crate::error::CoordinatorError;
use crate::profiles::ProfileStore;
use crate::registry::RecordingRegistry;
use async_trait::async_trait;
use refill_common::TabId;
use refill_common::error::{MessagingError, ValidationError};
use refill_common::naming::validate_profile_name;
use refill_common::protocol::{
    AckReply, AgentAction, CoordinatorAction, Origin, ProfileRequest, ProfilesReply,
    RecordingStateReply, Reply,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

const QUEUE_CAPACITY: usize = 64;

/// Which tab the user is looking at.
#[async_trait]
pub trait TabQuery: Send + Sync {
    async fn active_tab(&self) -> Option<TabId>;
}

pub enum CoordinatorEvent {
    Request {
        origin: Origin,
        action: CoordinatorAction,
        reply: oneshot::Sender<Reply>,
    },
    /// A page finished loading in `tab`.
    NavigationComplete {
        tab: TabId,
        reply: oneshot::Sender<()>,
    },
}

#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub async fn request(
        &self,
        origin: Origin,
        action: CoordinatorAction,
    ) -> Result<Reply, MessagingError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(CoordinatorEvent::Request {
                origin,
                action,
                reply,
            })
            .await
            .map_err(|_| MessagingError::CoordinatorClosed)?;
        response.await.map_err(|_| MessagingError::CoordinatorClosed)
    }

    /// Resolves once any re-arm for the tab has been attempted.
    pub async fn navigation_complete(&self, tab: TabId) -> Result<(), MessagingError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(CoordinatorEvent::NavigationComplete { tab, reply })
            .await
            .map_err(|_| MessagingError::CoordinatorClosed)?;
        done.await.map_err(|_| MessagingError::CoordinatorClosed)
    }
}

pub struct Coordinator {
    registry: RecordingRegistry,
    profiles: Arc<ProfileStore>,
    bus: Arc<MessageBus>,
    tabs: Arc<dyn TabQuery>,
}

impl Coordinator {
    pub fn new(
        registry: RecordingRegistry,
        profiles: Arc<ProfileStore>,
        bus: Arc<MessageBus>,
        tabs: Arc<dyn TabQuery>,
    ) -> Self {
        Self {
            registry,
            profiles,
            bus,
            tabs,
        }
    }

    pub fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(self.run(rx));
        CoordinatorHandle { tx }
    }

    async fn run(self, mut queue: mpsc::Receiver<CoordinatorEvent>) {
        info!("Coordinator started");
        while let Some(event) = queue.recv().await {
            match event {
                CoordinatorEvent::Request {
                    origin,
                    action,
                    reply,
                } => {
                    let name = action.name();
                    let response = match self.handle(origin, action).await {
                        Ok(response) => response,
                        Err(e) => {
                            error!(action = name, "Request failed: {}", e);
                            Reply::failed(e.to_string())
                        }
                    };
                    if reply.send(response).is_err() {
                        debug!(action = name, "Requester went away before the reply");
                    }
                }
                CoordinatorEvent::NavigationComplete { tab, reply } => {
                    self.rearm(tab).await;
                    let _ = reply.send(());
                }
            }
        }
        info!("Coordinator stopped");
    }

    async fn handle(
        &self,
        origin: Origin,
        action: CoordinatorAction,
    ) -> Result<Reply, CoordinatorError> {
        match action {
            CoordinatorAction::StartRecordingForActiveTab(req) => {
                validate_profile_name(&req.profile_name)?;
                let tab = self.active_tab().await?;
                if let Some(current) = self.registry.get(tab).await? {
                    info!(
                        tab = %tab,
                        profile = %current.profile_name,
                        requested = %req.profile_name,
                        "Tab already recording, keeping its profile"
                    );
                    self.forward(
                        tab,
                        AgentAction::StartRecording(ProfileRequest::new(&current.profile_name)),
                    )
                    .await;
                    return Ok(Reply::Ack(AckReply {
                        ok: true,
                        profile_name: Some(current.profile_name),
                        error: None,
                    }));
                }
                let name = self.profiles.create_unique(&req.profile_name).await?;
                self.registry.insert(tab, &name).await?;
                info!(tab = %tab, profile = %name, "Recording requested");
                self.forward(tab, AgentAction::StartRecording(ProfileRequest::new(&name)))
                    .await;
                Ok(Reply::Ack(AckReply {
                    ok: true,
                    profile_name: Some(name),
                    error: None,
                }))
            }
            CoordinatorAction::StopRecordingForActiveTab => {
                let tab = self.active_tab().await?;
                self.stop_tab(tab).await?;
                Ok(Reply::ok())
            }
            CoordinatorAction::GetRecordingStateForTab => {
                let tab = origin.tab().ok_or(ValidationError::NoSenderTab)?;
                let state = self.registry.get(tab).await?;
                Ok(Reply::State(RecordingStateReply {
                    recording: state.is_some(),
                    profile_name: state.map(|s| s.profile_name),
                }))
            }
            CoordinatorAction::StopRecordingFromPage => {
                let tab = origin.tab().ok_or(ValidationError::NoSenderTab)?;
                self.stop_tab(tab).await?;
                Ok(Reply::ok())
            }
            CoordinatorAction::ListProfiles => Ok(Reply::Profiles(ProfilesReply {
                profiles: self.profiles.list().await?,
            })),
            CoordinatorAction::DeleteProfile(req) => {
                let deleted = self.profiles.delete(&req.profile_name).await?;
                let tabs = self.registry.remove_profile(&req.profile_name).await?;
                if !deleted && tabs.is_empty() {
                    return Err(ValidationError::UnknownProfile(req.profile_name).into());
                }
                for tab in tabs {
                    info!(tab = %tab, profile = %req.profile_name, "Stopping recording of deleted profile");
                    self.forward(tab, AgentAction::StopRecording).await;
                }
                Ok(Reply::ok())
            }
            CoordinatorAction::ApplyProfileToActiveTab(req) => {
                let tab = self.active_tab().await?;
                Ok(self.bus.send(tab, AgentAction::ApplyProfile(req)).await?)
            }
        }
    }

    async fn active_tab(&self) -> Result<TabId, ValidationError> {
        self.tabs
            .active_tab()
            .await
            .ok_or(ValidationError::NoActiveTab)
    }

    async fn stop_tab(&self, tab: TabId) -> Result<(), CoordinatorError> {
        match self.registry.remove(tab).await? {
            Some(state) => info!(tab = %tab, profile = %state.profile_name, "Recording stopped"),
            None => debug!(tab = %tab, "Stop for a tab that was not recording"),
        }
        self.forward(tab, AgentAction::StopRecording).await;
        Ok(())
    }

    /// Re-send start to a freshly loaded page whose tab is still registered.
    async fn rearm(&self, tab: TabId) {
        match self.registry.get(tab).await {
            Ok(Some(state)) => {
                info!(tab = %tab, profile = %state.profile_name, "Re-arming recording after navigation");
                self.forward(
                    tab,
                    AgentAction::StartRecording(ProfileRequest::new(state.profile_name)),
                )
                .await;
            }
            Ok(None) => {}
            Err(e) => warn!(tab = %tab, "Registry read failed: {}", e),
        }
    }

    /// Best-effort delivery: the registry write already happened and is kept
    /// even if the page cannot be reached.
    async fn forward(&self, tab: TabId, action: AgentAction) {
        let name = action.name();
        if let Err(e) = self.bus.send(tab, action).await {
            warn!(tab = %tab, action = name, "Page not reached: {}", e);
        }
    }
}
