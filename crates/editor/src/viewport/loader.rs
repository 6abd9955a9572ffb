//! Asynchronous model loading for imported references.
//!
//! A load is started synchronously during reconciliation. Its result comes
//! back through a oneshot channel owned by the renderable; dropping the
//! renderable drops the receiver, which cancels the load.

use std::cell::RefCell;

use shared::ModelFormat;
use thiserror::Error;
use tokio::sync::oneshot;

use super::mesh::MeshData;

pub type LoadResult = Result<MeshData, LoadError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("no loader available for {0}")]
    Unavailable(String),
}

/// What to load, and for which renderable
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Id of the owning scene object
    pub key: String,
    pub url: String,
    pub format: ModelFormat,
}

/// Completion side of a load; sending after cancellation is a no-op
#[derive(Debug)]
pub struct LoadTicket {
    sender: oneshot::Sender<LoadResult>,
}

impl LoadTicket {
    /// Create a ticket and the receiver its renderable keeps
    pub fn channel() -> (Self, oneshot::Receiver<LoadResult>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// True once the renderable that wanted this result is gone
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// Deliver the result; returns false if nobody is listening anymore
    pub fn complete(self, result: LoadResult) -> bool {
        self.sender.send(result).is_ok()
    }
}

/// Starts loads on behalf of the viewport
pub trait MeshLoader {
    fn start(&self, request: LoadRequest, ticket: LoadTicket);
}

/// Loader that parks requests until someone delivers their bytes.
/// Used by hosts that fetch on their own (the browser) and by tests.
#[derive(Debug, Default)]
pub struct QueuedLoader {
    pending: RefCell<Vec<(LoadRequest, LoadTicket)>>,
}

impl QueuedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests still waiting, cancelled ones dropped
    pub fn pending_requests(&self) -> Vec<LoadRequest> {
        let mut pending = self.pending.borrow_mut();
        pending.retain(|(_, ticket)| !ticket.is_cancelled());
        pending.iter().map(|(req, _)| req.clone()).collect()
    }

    /// Complete every pending load for `key`. Returns how many were still wanted.
    pub fn complete(&self, key: &str, result: LoadResult) -> usize {
        let mut pending = self.pending.borrow_mut();
        let (matching, rest): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|(req, _)| req.key == key);
        *pending = rest;
        matching
            .into_iter()
            .filter(|(_, ticket)| !ticket.is_cancelled())
            .map(|(_, ticket)| ticket.complete(result.clone()))
            .filter(|delivered| *delivered)
            .count()
    }

    /// Parse raw model bytes and complete the load for `key`
    pub fn deliver_bytes(&self, key: &str, bytes: &[u8]) -> usize {
        let Some(request) = self
            .pending
            .borrow()
            .iter()
            .find(|(req, _)| req.key == key)
            .map(|(req, _)| req.clone())
        else {
            return 0;
        };
        let result = crate::io::parse_model(request.format, bytes).map_err(|e| LoadError::Decode {
            url: request.url.clone(),
            reason: e.to_string(),
        });
        self.complete(key, result)
    }
}

impl MeshLoader for QueuedLoader {
    fn start(&self, request: LoadRequest, ticket: LoadTicket) {
        tracing::debug!(key = %request.key, url = %request.url, "queued model load");
        self.pending.borrow_mut().push((request, ticket));
    }
}

/// Reads model files from disk on the tokio blocking pool
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileLoader {
    handle: tokio::runtime::Handle,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileLoader {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl MeshLoader for FileLoader {
    fn start(&self, request: LoadRequest, ticket: LoadTicket) {
        self.handle.spawn_blocking(move || {
            if ticket.is_cancelled() {
                return;
            }
            let result = std::fs::read(&request.url)
                .map_err(|e| LoadError::Fetch {
                    url: request.url.clone(),
                    reason: e.to_string(),
                })
                .and_then(|bytes| {
                    crate::io::parse_model(request.format, &bytes).map_err(|e| LoadError::Decode {
                        url: request.url.clone(),
                        reason: e.to_string(),
                    })
                });
            if !ticket.complete(result) {
                tracing::debug!(url = %request.url, "load finished after cancellation");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(key: &str) -> LoadRequest {
        LoadRequest {
            key: key.into(),
            url: format!("{key}.obj"),
            format: ModelFormat::Obj,
        }
    }

    #[test]
    fn test_dropped_receiver_cancels() {
        let (ticket, receiver) = LoadTicket::channel();
        assert!(!ticket.is_cancelled());
        drop(receiver);
        assert!(ticket.is_cancelled());
        assert!(!ticket.complete(Ok(MeshData::new())));
    }

    #[test]
    fn test_queued_loader_delivers() {
        let loader = QueuedLoader::new();
        let (ticket, mut receiver) = LoadTicket::channel();
        loader.start(request("a"), ticket);
        assert_eq!(loader.pending_requests(), vec![request("a")]);

        let obj = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        assert_eq!(loader.deliver_bytes("a", obj), 1);
        let mesh = receiver.try_recv().unwrap().unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(loader.pending_requests().is_empty());
    }

    #[test]
    fn test_queued_loader_skips_cancelled() {
        let loader = QueuedLoader::new();
        let (ticket, receiver) = LoadTicket::channel();
        loader.start(request("a"), ticket);
        drop(receiver);
        assert!(loader.pending_requests().is_empty());
        assert_eq!(loader.complete("a", Ok(MeshData::new())), 0);
    }

    #[test]
    fn test_file_loader_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let loader = FileLoader::new(rt.handle().clone());
        let (ticket, receiver) = LoadTicket::channel();
        loader.start(
            LoadRequest {
                key: "k".into(),
                url: path.to_string_lossy().into_owned(),
                format: ModelFormat::Obj,
            },
            ticket,
        );
        let mesh = rt.block_on(receiver).unwrap().unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_file_loader_missing_file() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let loader = FileLoader::new(rt.handle().clone());
        let (ticket, receiver) = LoadTicket::channel();
        loader.start(request("missing"), ticket);
        let result = rt.block_on(receiver).unwrap();
        assert!(matches!(result, Err(LoadError::Fetch { .. })));
    }
}
