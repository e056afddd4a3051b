//! UDP transport and the fixed-rate tick driver.
//!
//! A receiver task decodes packets and forwards them to the main loop, a
//! sender task drains the outbound queue, and a timeout task expires silent
//! sessions. The main loop owns the [`GameState`] outright, so every
//! mutation happens between two awaits on one task and a snapshot always
//! observes a settled post-tick world.

use crate::client_manager::SessionRegistry;
use crate::config::ServerConfig;
use crate::game::{GameEvent, GameState};
use crate::persistence::{PersistenceBridge, PlayerStore};
use crate::snapshot::{full_snapshot, private_state, SnapshotTracker};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ClassId, Packet, PlayerId, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Largest datagram accepted from a client.
const RECV_BUFFER: usize = 4096;

/// Messages sent from network tasks to the main loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    SessionTimeout { session: u32, player_id: PlayerId },
    Shutdown,
}

/// Messages sent from the main loop to the sender task.
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    Broadcast { packet: Packet },
}

/// Owns the socket, the sessions and the world.
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: Arc<RwLock<SessionRegistry>>,
    game: GameState,
    snapshots: SnapshotTracker,
    persistence: PersistenceBridge,
    config: ServerConfig,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig, store: Arc<dyn PlayerStore>) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let game = GameState::new(&config.map, config.sim.clone(), config.seed);

        Ok(Server {
            socket,
            sessions: Arc::new(RwLock::new(SessionRegistry::new(config.max_clients, config.client_timeout))),
            snapshots: SnapshotTracker::new(config.sim.full_resync_every),
            persistence: PersistenceBridge::new(store),
            game,
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for asking a running server to stop.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER];
            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) => {
                            if server_tx.send(ServerMessage::PacketReceived { packet, addr }).is_err() {
                                break;
                            }
                        }
                        // malformed datagrams are dropped without a reply
                        Err(e) => debug!("Undecodable packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            warn!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Broadcast { packet } => {
                        let recipients = sessions.read().await.recipients();
                        let data = match serialize(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast: {}", e);
                                continue;
                            }
                        };
                        for (session, _, addr) in recipients {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                warn!("Failed to send to session {}: {}", session, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn spawn_timeout_checker(&self) {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                let expired = sessions.write().await.check_timeouts();
                for session in expired {
                    info!("Session {} timed out", session.id);
                    let message = ServerMessage::SessionTimeout {
                        session: session.id,
                        player_id: session.player_id,
                    };
                    if server_tx.send(message).is_err() {
                        return;
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::Broadcast { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                player_id,
            } => self.handle_connect(client_version, player_id, addr).await,
            Packet::Intent { sequence, intent } => {
                let mut sessions = self.sessions.write().await;
                if let Some(id) = sessions.find_by_addr(addr) {
                    // rejected intents are dropped silently
                    let _ = sessions.push_intent(id, sequence, intent);
                }
            }
            Packet::Disconnect => {
                let session = self.sessions.read().await.find_by_addr(addr);
                if let Some(id) = session {
                    self.close_session(id).await;
                }
            }
            _ => warn!("Unexpected packet type from {}", addr),
        }
    }

    async fn handle_connect(&mut self, client_version: u32, player_id: PlayerId, addr: SocketAddr) {
        info!("Client connecting from {} (version {}, player {})", addr, client_version, player_id);
        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: format!("unsupported protocol version {}", client_version),
                },
                addr,
            );
            return;
        }

        let (same_addr, same_player) = {
            let sessions = self.sessions.read().await;
            (sessions.find_by_addr(addr), sessions.find_by_player(player_id))
        };
        if let Some(id) = same_addr {
            self.close_session(id).await;
        }
        if let Some(id) = same_player.filter(|id| Some(*id) != same_addr) {
            if let Some(old) = self.sessions.read().await.get(id).map(|s| s.addr) {
                self.send_packet(
                    Packet::Disconnected {
                        reason: "logged in elsewhere".to_string(),
                    },
                    old,
                );
            }
            self.close_session(id).await;
        }

        let player = match self.persistence.load_player(player_id) {
            Ok(player) => player,
            Err(e) => {
                warn!("Could not load player {}: {}", player_id, e);
                self.send_packet(
                    Packet::Disconnected {
                        reason: "character unavailable".to_string(),
                    },
                    addr,
                );
                return;
            }
        };

        let Some(client_id) = self.sessions.write().await.add_session(addr, player_id) else {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Server full".to_string(),
                },
                addr,
            );
            return;
        };

        match player {
            Some(player) => self.game.add_player(player),
            None => {
                self.game.create_player(player_id, ClassId::Fighter);
            }
        }

        self.send_packet(Packet::Connected { client_id, player_id }, addr);
        self.send_packet(Packet::Snapshot(full_snapshot(&self.game)), addr);
        if let Some(player) = self.game.players.get(player_id) {
            self.send_packet(Packet::Private(private_state(player, self.game.now)), addr);
        }
    }

    /// Closes a session, saving and removing its player.
    async fn close_session(&mut self, id: u32) {
        let removed = self.sessions.write().await.remove_session(id);
        if let Some(session) = removed {
            self.release_player(session.player_id);
        }
    }

    fn release_player(&mut self, player_id: PlayerId) {
        if let Some(player) = self.game.remove_player(player_id) {
            if let Err(e) = self.persistence.save_player(&player) {
                warn!("Saving player {} on disconnect failed: {}", player_id, e);
            }
        }
    }

    /// Applies buffered intents, advances the world and ships its events.
    async fn run_tick(&mut self, dt_ms: u64) {
        let intents = self.sessions.write().await.drain_intents();
        for (player, intent) in intents {
            self.game.apply_intent(player, intent);
        }

        let started = Instant::now();
        self.game.tick(dt_ms);
        let elapsed = started.elapsed();
        if elapsed > self.config.tick_duration {
            warn!("Tick {} took {:?}, over budget", self.game.tick, elapsed);
        }

        let addrs: HashMap<PlayerId, SocketAddr> = self
            .sessions
            .read()
            .await
            .recipients()
            .into_iter()
            .map(|(_, player, addr)| (player, addr))
            .collect();
        self.deliver_events(&addrs);

        if self.game.tick % self.config.snapshot_every.max(1) == 0 {
            let snapshot = self.snapshots.next(&self.game);
            self.broadcast_packet(Packet::Snapshot(snapshot));
            for (player_id, addr) in &addrs {
                if let Some(player) = self.game.players.get(*player_id) {
                    self.send_packet(Packet::Private(private_state(player, self.game.now)), *addr);
                }
            }
        }
    }

    fn deliver_events(&mut self, addrs: &HashMap<PlayerId, SocketAddr>) {
        for event in self.game.drain_events() {
            match event {
                GameEvent::ActionFailed { player, slot, error } => {
                    if let Some(addr) = addrs.get(&player) {
                        let reason = error.code().to_string();
                        self.send_packet(Packet::ActionFailed { slot, reason }, *addr);
                    }
                }
                GameEvent::Visual(visual) => self.broadcast_packet(Packet::Visual(visual)),
                GameEvent::Chat {
                    from,
                    channel,
                    text,
                    recipients,
                } => {
                    for addr in recipients.iter().filter_map(|p| addrs.get(p)) {
                        self.send_packet(
                            Packet::Chat {
                                from,
                                channel,
                                text: text.clone(),
                            },
                            *addr,
                        );
                    }
                }
                // state changes reach clients through the next snapshot
                GameEvent::LevelUp { .. } | GameEvent::PlayerDied { .. } | GameEvent::MobKilled { .. } => {}
            }
        }
    }

    /// Saves everyone and tells connected clients the server is going away.
    async fn shutdown(&mut self) {
        let failed = self.persistence.flush_sync(&mut self.game);
        if failed > 0 {
            warn!("{} players could not be saved during shutdown", failed);
        }
        let recipients = self.sessions.read().await.recipients();
        let packet = Packet::Disconnected {
            reason: "server shutting down".to_string(),
        };
        for (_, _, addr) in recipients {
            if let Err(e) = send_packet_impl(&self.socket, &packet, addr).await {
                debug!("Shutdown notice to {} failed: {}", addr, e);
            }
        }
    }

    /// Runs until Ctrl+C or a [`ServerMessage::Shutdown`].
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let dt_ms = self.config.tick_duration.as_millis().max(1) as u64;
        let mut tick_interval = interval(self.config.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut persist_interval = interval(self.config.persist_interval);
        persist_interval.tick().await;

        info!("Server started, {} ms per tick", dt_ms);

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::SessionTimeout { session, player_id }) => {
                            debug!("Releasing player {} from session {}", player_id, session);
                            self.release_player(player_id);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }
                _ = tick_interval.tick() => {
                    self.run_tick(dt_ms).await;
                    if self.game.tick % 60 == 0 {
                        let sessions = self.sessions.read().await.len();
                        if sessions > 0 {
                            debug!("Tick {}: {} sessions", self.game.tick, sessions);
                        }
                    }
                }
                _ = persist_interval.tick() => {
                    let retried = self.persistence.apply_failures(&mut self.game);
                    if retried > 0 {
                        info!("Retrying {} failed saves", retried);
                    }
                    // fire and forget; failures come back through the bridge
                    let _ = self.persistence.flush_async(&mut self.game);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }
}

async fn send_packet_impl(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}
