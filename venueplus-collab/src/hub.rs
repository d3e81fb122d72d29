use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use log::{debug, error, info};
use parking_lot::Mutex;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    watch,
};

use crate::{protocol::ServerMessage, util::Id};

pub type ConnectionId = Id<Connection>;

/// A frame queued for a connection's writer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    /// Ask the writer to send a close frame with the given reason and stop
    Close(String),
}

/// Tracks live connections and the club each one is viewing.
pub struct ConnectionHub {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
    shutdown: watch::Sender<bool>,
}

pub struct Connection {
    id: ConnectionId,
    club_id: String,
    sender: UnboundedSender<Outbound>,
}

/// Keeps a connection registered for as long as it lives
pub struct ConnectionHandle {
    id: ConnectionId,
    hub: Weak<ConnectionHub>,
}

impl ConnectionHub {
    const CLOSE_GRACE: Duration = Duration::from_millis(100);

    pub fn new() -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);

        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
            shutdown,
        })
    }

    /// Registers a new connection affiliated with the club, returning its handle and outbound queue
    pub fn connect(&self, club_id: &str) -> (ConnectionHandle, UnboundedReceiver<Outbound>) {
        let (sender, receiver) = unbounded_channel();
        let id = ConnectionId::new();

        self.register(id, sender, club_id);

        let handle = ConnectionHandle {
            id,
            hub: self.me.clone(),
        };

        (handle, receiver)
    }

    pub fn register(&self, id: ConnectionId, sender: UnboundedSender<Outbound>, club_id: &str) {
        debug!("Connection {} opened on {}", id, club_id);

        self.connections.lock().push(Connection {
            id,
            club_id: club_id.to_string(),
            sender,
        });
    }

    /// Changes the club a connection is viewing. Returns false for unknown connections
    pub fn set_club(&self, id: ConnectionId, club_id: &str) -> bool {
        let mut connections = self.connections.lock();

        match connections.iter_mut().find(|c| c.id == id) {
            Some(connection) => {
                connection.club_id = club_id.to_string();
                true
            }
            None => false,
        }
    }

    pub fn club_of(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .lock()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.club_id.clone())
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id);
        debug!("Connection {} closed", id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Every club at least one connection is viewing, ordered
    pub fn clubs(&self) -> Vec<String> {
        let mut clubs: Vec<_> = self
            .connections
            .lock()
            .iter()
            .map(|c| c.club_id.clone())
            .collect();

        clubs.sort();
        clubs.dedup();
        clubs
    }

    /// Sends a message to a single connection. A closed channel is purged, not an error.
    pub fn send_to(&self, id: ConnectionId, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };

        let sender = self
            .connections
            .lock()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.sender.clone());

        match sender {
            Some(sender) => {
                if sender.send(Outbound::Text(text)).is_err() {
                    debug!("Connection {} is gone, dropping message", id);
                    self.unregister(id);
                }
            }
            None => debug!("Connection {} is not registered, dropping message", id),
        }
    }

    /// Sends a message to every connection viewing the club at the time of the call
    pub fn broadcast_club(&self, club_id: &str, message: &ServerMessage) {
        self.broadcast_where(message, |c| c.club_id == club_id)
    }

    pub fn broadcast_all(&self, message: &ServerMessage) {
        self.broadcast_where(message, |_| true)
    }

    fn broadcast_where<F>(&self, message: &ServerMessage, filter: F)
    where
        F: Fn(&Connection) -> bool,
    {
        let Some(text) = encode(message) else {
            return;
        };

        let recipients: Vec<_> = self
            .connections
            .lock()
            .iter()
            .filter(|c| filter(c))
            .map(|c| (c.id, c.sender.clone()))
            .collect();

        let closed: Vec<_> = recipients
            .into_iter()
            .filter(|(_, sender)| sender.send(Outbound::Text(text.clone())).is_err())
            .map(|(id, _)| id)
            .collect();

        if !closed.is_empty() {
            debug!("Purging {} closed connections", closed.len());
            self.connections.lock().retain(|c| !closed.contains(&c.id));
        }
    }

    /// Sends a close frame to every connection, waits a short grace period and drops them all
    pub async fn close_all(&self, reason: &str) {
        let _ = self.shutdown.send(true);

        let senders: Vec<_> = self
            .connections
            .lock()
            .iter()
            .map(|c| c.sender.clone())
            .collect();

        info!("Closing {} connections", senders.len());

        for sender in &senders {
            let _ = sender.send(Outbound::Close(reason.to_string()));
        }

        tokio::time::sleep(Self::CLOSE_GRACE).await;
        self.connections.lock().clear();
    }

    /// Resolves once [ConnectionHub::close_all] has been called
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id)
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    serde_json::to_string(message)
        .map_err(|e| error!("Failed to serialize outgoing message: {}", e))
        .ok()
}

#[cfg(test)]
mod test {
    use super::*;

    fn message() -> ServerMessage {
        ServerMessage::ClubDeleted
    }

    #[test]
    fn test_broadcast_is_club_scoped() {
        let hub = ConnectionHub::new();
        let (_a, mut a_rx) = hub.connect("nightclub");
        let (_b, mut b_rx) = hub.connect("default");

        hub.broadcast_club("nightclub", &message());

        assert!(matches!(a_rx.try_recv(), Ok(Outbound::Text(_))));
        assert!(b_rx.try_recv().is_err());

        hub.broadcast_all(&message());
        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_ok());
    }

    #[test]
    fn test_affiliation_is_evaluated_at_broadcast_time() {
        let hub = ConnectionHub::new();
        let (a, mut a_rx) = hub.connect("default");

        assert!(hub.set_club(a.id(), "nightclub"));
        assert_eq!(hub.club_of(a.id()).as_deref(), Some("nightclub"));

        hub.broadcast_club("default", &message());
        assert!(a_rx.try_recv().is_err());

        hub.broadcast_club("nightclub", &message());
        assert!(a_rx.try_recv().is_ok());
        assert_eq!(hub.clubs(), vec!["nightclub"]);
    }

    #[test]
    fn test_closed_connections_are_purged() {
        let hub = ConnectionHub::new();
        let (_a, a_rx) = hub.connect("default");
        let (_b, _b_rx) = hub.connect("default");

        drop(a_rx);
        hub.broadcast_club("default", &message());

        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn test_handle_unregisters_on_drop() {
        let hub = ConnectionHub::new();
        let (handle, _rx) = hub.connect("default");
        let id = handle.id();

        drop(handle);

        assert_eq!(hub.club_of(id), None);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_close_all() {
        let hub = ConnectionHub::new();
        let (_a, mut a_rx) = hub.connect("default");
        let mut signal = hub.shutdown_signal();

        hub.close_all("server stopping").await;

        assert_eq!(
            a_rx.recv().await,
            Some(Outbound::Close("server stopping".to_string()))
        );
        assert_eq!(a_rx.recv().await, None);
        assert!(*signal.borrow_and_update());
        assert_eq!(hub.connection_count(), 0);
    }
}
