//! Cross-tab collaboration: scene broadcast, cursors and presence.
//!
//! Delivery is unordered and the last scene update received wins. A scene
//! applied from a peer is not broadcast back out.

mod transport;

pub use transport::{LocalHub, LocalTransport, SyncTransport};

use std::collections::BTreeMap;

use shared::SyncMessage;
use thiserror::Error;
use tracing::{debug, info};

use crate::helpers::short_id;
use crate::state::settings::SyncSettings;
use crate::state::SceneStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not joined to a collaboration channel")]
    NotJoined,

    #[error("transport closed")]
    Closed,

    #[error("failed to encode sync message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Channel and identity for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub channel: String,
    pub user_name: String,
    pub presence_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl From<&SyncSettings> for SyncConfig {
    fn from(s: &SyncSettings) -> Self {
        Self {
            channel: s.channel.clone(),
            user_name: s.user_name.clone(),
            presence_timeout_ms: s.presence_timeout_ms,
            heartbeat_interval_ms: s.heartbeat_interval_ms,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from(&SyncSettings::default())
    }
}

/// Another participant as last heard from
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub user_id: String,
    pub user: String,
    pub last_seen: u64,
    /// Pointer position in percent of their viewport
    pub cursor: Option<(f64, f64)>,
}

/// Outcome of draining the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReceipt {
    pub scene_applied: bool,
    pub cursor_updates: usize,
    pub heartbeats: usize,
}

/// Membership in one collaboration channel, from join to leave
pub struct SyncSession {
    config: SyncConfig,
    user_id: String,
    transport: Option<Box<dyn SyncTransport>>,
    peers: BTreeMap<String, Peer>,
    /// Set when a remote scene was applied; the next broadcast is skipped
    suppress_echo: bool,
    last_heartbeat: Option<u64>,
}

impl SyncSession {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            user_id: uuid::Uuid::new_v4().to_string(),
            transport: None,
            peers: BTreeMap::new(),
            suppress_echo: false,
            last_heartbeat: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Name shown to peers from the next message on
    pub fn set_user_name(&mut self, name: &str) {
        self.config.user_name = name.to_string();
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_joined(&self) -> bool {
        self.transport.is_some()
    }

    pub fn join(&mut self, transport: Box<dyn SyncTransport>) {
        info!(channel = %self.config.channel, user = %self.config.user_name, "joined collaboration channel");
        self.transport = Some(transport);
        self.last_heartbeat = None;
    }

    pub fn leave(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!(channel = %self.config.channel, "left collaboration channel");
        }
        self.peers.clear();
        self.suppress_echo = false;
    }

    fn post(&self, message: &SyncMessage) -> Result<(), SyncError> {
        self.transport
            .as_ref()
            .ok_or(SyncError::NotJoined)?
            .post(message)
    }

    /// Send the whole scene and log. Returns false when skipped because the
    /// current scene was itself received from a peer.
    pub fn broadcast_scene(&mut self, store: &SceneStore) -> Result<bool, SyncError> {
        if std::mem::take(&mut self.suppress_echo) {
            debug!("skipping echo of remote scene");
            return Ok(false);
        }
        self.post(&SyncMessage::SceneUpdate {
            objects: store.snapshot().clone(),
            log: store.history().to_vec(),
            baseline: Some(store.history().baseline().clone()),
        })?;
        Ok(true)
    }

    /// Share the local pointer position, in percent of the viewport
    pub fn send_cursor(&self, x: f64, y: f64) -> Result<(), SyncError> {
        self.post(&SyncMessage::CursorUpdate {
            user_id: self.user_id.clone(),
            user: self.config.user_name.clone(),
            x,
            y,
        })
    }

    /// Apply everything received since the last call
    pub fn receive(&mut self, store: &mut SceneStore, now: u64) -> SyncReceipt {
        let mut receipt = SyncReceipt::default();
        let Some(transport) = self.transport.as_mut() else {
            return receipt;
        };

        for message in transport.drain() {
            match message {
                SyncMessage::SceneUpdate {
                    objects,
                    log,
                    baseline,
                } => {
                    debug!(objects = objects.len(), entries = log.len(), "remote scene update");
                    store.apply_remote(objects, log, baseline);
                    self.suppress_echo = true;
                    receipt.scene_applied = true;
                }
                SyncMessage::CursorUpdate {
                    user_id,
                    user,
                    x,
                    y,
                } => {
                    if user_id == self.user_id {
                        continue;
                    }
                    let peer = touch_peer(&mut self.peers, user_id, user, now);
                    peer.cursor = Some((x, y));
                    receipt.cursor_updates += 1;
                }
                SyncMessage::Heartbeat { user_id, user } => {
                    if user_id == self.user_id {
                        continue;
                    }
                    touch_peer(&mut self.peers, user_id, user, now);
                    receipt.heartbeats += 1;
                }
            }
        }
        receipt
    }

    /// Periodic upkeep: heartbeat when due, expire silent peers
    pub fn tick(&mut self, now: u64) -> Result<(), SyncError> {
        if !self.is_joined() {
            return Err(SyncError::NotJoined);
        }
        let due = self
            .last_heartbeat
            .map_or(true, |t| now.saturating_sub(t) >= self.config.heartbeat_interval_ms);
        if due {
            self.post(&SyncMessage::Heartbeat {
                user_id: self.user_id.clone(),
                user: self.config.user_name.clone(),
            })?;
            self.last_heartbeat = Some(now);
        }
        self.expire_peers(now);
        Ok(())
    }

    fn expire_peers(&mut self, now: u64) {
        let timeout = self.config.presence_timeout_ms;
        self.peers.retain(|id, peer| {
            let alive = now.saturating_sub(peer.last_seen) <= timeout;
            if !alive {
                debug!(peer = short_id(id), "peer timed out");
            }
            alive
        });
    }

    /// Peers heard from within the presence timeout
    pub fn active_users(&self, now: u64) -> Vec<&Peer> {
        self.peers
            .values()
            .filter(|p| now.saturating_sub(p.last_seen) <= self.config.presence_timeout_ms)
            .collect()
    }

    /// Remote cursors of active peers: (name, x%, y%)
    pub fn cursors(&self, now: u64) -> Vec<(&str, f64, f64)> {
        self.active_users(now)
            .into_iter()
            .filter_map(|p| p.cursor.map(|(x, y)| (p.user.as_str(), x, y)))
            .collect()
    }
}

fn touch_peer(peers: &mut BTreeMap<String, Peer>, user_id: String, user: String, now: u64) -> &mut Peer {
    let peer = peers.entry(user_id.clone()).or_insert_with(|| {
        debug!(peer = short_id(&user_id), %user, "peer joined");
        Peer {
            user_id,
            user: user.clone(),
            last_seen: now,
            cursor: None,
        }
    });
    peer.user = user;
    peer.last_seen = now;
    peer
}
