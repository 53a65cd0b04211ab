//! WebSocket server and connection handling.

use crate::players::PlayerDirectory;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{Lobby, Occupant};
use armada_core::{Bot, Coord, MatchId, MatchRegistry, PlacementProgress, SideId};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Who plays a seat in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatOccupant {
    Human(Uuid),
    Bot,
}

/// One side of an active match and who plays it.
#[derive(Debug, Clone, Copy)]
pub struct Seat {
    pub side: SideId,
    pub occupant: SeatOccupant,
}

/// Server state shared across all connections.
pub struct ServerState {
    /// Registered players and their win counters
    pub directory: Mutex<PlayerDirectory>,
    /// Open rooms waiting for a second player
    pub lobby: Mutex<Lobby>,
    /// The match engine registry
    pub engine: Mutex<MatchRegistry>,
    /// Seats of every active match, host seat first
    pub seats: DashMap<MatchId, [Seat; 2]>,
    /// Player ID -> the match they are in
    pub player_matches: DashMap<Uuid, MatchId>,
    /// Bot opponents of single-player matches
    pub bots: DashMap<MatchId, Bot>,
    /// Mapping from player ID to their message sender
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            directory: Mutex::new(PlayerDirectory::new()),
            lobby: Mutex::new(Lobby::new()),
            engine: Mutex::new(MatchRegistry::new()),
            seats: DashMap::new(),
            player_matches: DashMap::new(),
            bots: DashMap::new(),
            senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to every connected player.
    pub fn broadcast_all(&self, msg: ServerMessage) {
        for entry in self.senders.iter() {
            let _ = entry.value().send(msg.clone());
        }
    }

    /// Broadcast a message to the human players of a match.
    pub fn broadcast_match(&self, match_id: MatchId, msg: ServerMessage) {
        if let Some(seats) = self.seats.get(&match_id) {
            for seat in seats.iter() {
                if let SeatOccupant::Human(player_id) = seat.occupant {
                    self.send_to_player(player_id, msg.clone());
                }
            }
        }
    }

    fn broadcast_rooms(&self) {
        let rooms = self.lobby.lock().unwrap().open_rooms();
        self.broadcast_all(ServerMessage::UpdateRoom { rooms });
    }

    fn broadcast_winners(&self) {
        let winners = self.directory.lock().unwrap().winners();
        self.broadcast_all(ServerMessage::UpdateWinners { winners });
    }

    /// The match and side a player currently occupies.
    fn seat_of(&self, player_id: Uuid) -> Option<(MatchId, SideId)> {
        let match_id = *self.player_matches.get(&player_id)?;
        let seats = self.seats.get(&match_id)?;
        seats
            .iter()
            .find(|s| s.occupant == SeatOccupant::Human(player_id))
            .map(|s| (match_id, s.side))
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection's view of who it is.
struct Session {
    player_id: Uuid,
    name: Option<String>,
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Armada server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let mut session = Session {
        player_id: Uuid::new_v4(),
        name: None,
    };

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(session.player_id, tx);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(&mut session, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", session.player_id, e);
                    state.send_to_player(
                        session.player_id,
                        ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", session.player_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", session.player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(session.player_id, &state);
    state.senders.remove(&session.player_id);
    send_task.abort();

    info!("Connection closed for {}", session.player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(session: &mut Session, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::Reg { name, password } => {
            let result = state
                .directory
                .lock()
                .unwrap()
                .register(session.player_id, &name, &password);
            match result {
                Ok(account) => {
                    // Logging back in: move this connection's sender onto
                    // the existing account id
                    if account.id != session.player_id {
                        if let Some((_, tx)) = state.senders.remove(&session.player_id) {
                            state.senders.insert(account.id, tx);
                        }
                        session.player_id = account.id;
                    }
                    session.name = Some(account.name.clone());
                    info!("Player {} registered as {}", session.player_id, account.name);

                    state.send_to_player(
                        session.player_id,
                        ServerMessage::Reg {
                            name: account.name,
                            player_id: account.id,
                        },
                    );
                    let rooms = state.lobby.lock().unwrap().open_rooms();
                    state.send_to_player(session.player_id, ServerMessage::UpdateRoom { rooms });
                    let winners = state.directory.lock().unwrap().winners();
                    state
                        .send_to_player(session.player_id, ServerMessage::UpdateWinners { winners });
                }
                Err(e) => reject(state, session.player_id, e.to_string()),
            }
        }

        ClientMessage::CreateRoom => {
            let Some(name) = session.name.clone() else {
                return reject(state, session.player_id, "Register first".into());
            };
            if state.player_matches.contains_key(&session.player_id) {
                return reject(state, session.player_id, "Already in a match".into());
            }

            state.lobby.lock().unwrap().create_room(session.player_id, name);
            state.broadcast_rooms();
        }

        ClientMessage::AddUserToRoom { room_id } => {
            let Some(name) = session.name.clone() else {
                return reject(state, session.player_id, "Register first".into());
            };
            if state.player_matches.contains_key(&session.player_id) {
                return reject(state, session.player_id, "Already in a match".into());
            }

            let joined = state
                .lobby
                .lock()
                .unwrap()
                .join_room(room_id, session.player_id, name);
            match joined {
                Ok(pair) => {
                    start_match(state, pair);
                    state.broadcast_rooms();
                }
                Err(e) => reject(state, session.player_id, e.to_string()),
            }
        }

        ClientMessage::SinglePlay => {
            if session.name.is_none() {
                return reject(state, session.player_id, "Register first".into());
            }
            if state.player_matches.contains_key(&session.player_id) {
                return reject(state, session.player_id, "Already in a match".into());
            }

            start_single_play(state, session.player_id);
        }

        ClientMessage::AddShips { ships } => {
            let Some((match_id, side)) = state.seat_of(session.player_id) else {
                return reject(state, session.player_id, "Not in a match".into());
            };

            let result = state.engine.lock().unwrap().submit_fleet(match_id, side, ships);
            match result {
                Ok(PlacementProgress::AwaitingOpponent) => {}
                Ok(PlacementProgress::BothFleetsReady) => announce_start(state, match_id),
                Err(e) => reject(state, session.player_id, e.to_string()),
            }
        }

        ClientMessage::Attack { target } => {
            let Some((match_id, side)) = state.seat_of(session.player_id) else {
                return reject(state, session.player_id, "Not in a match".into());
            };
            fire(state, session.player_id, match_id, side, target);
        }

        ClientMessage::RandomAttack => {
            let Some((match_id, side)) = state.seat_of(session.player_id) else {
                return reject(state, session.player_id, "Not in a match".into());
            };

            let target = state
                .engine
                .lock()
                .unwrap()
                .random_target(match_id, side, &mut rand::thread_rng());
            match target {
                Ok(target) => fire(state, session.player_id, match_id, side, target),
                Err(e) => reject(state, session.player_id, e.to_string()),
            }
        }
    }
}

fn reject(state: &ServerState, player_id: Uuid, message: String) {
    state.send_to_player(player_id, ServerMessage::Error { message });
}

/// Create a match for a filled room, host side first.
fn start_match(state: &Arc<ServerState>, pair: [Occupant; 2]) {
    let match_id = MatchId::new();
    let sides = [SideId::new(), SideId::new()];

    if let Err(e) = state
        .engine
        .lock()
        .unwrap()
        .create_match(match_id, sides[0], sides[1])
        .map(|_| ())
    {
        error!("Failed to create match {}: {}", match_id, e);
        return;
    }

    let seats = [
        Seat {
            side: sides[0],
            occupant: SeatOccupant::Human(pair[0].player_id),
        },
        Seat {
            side: sides[1],
            occupant: SeatOccupant::Human(pair[1].player_id),
        },
    ];
    state.seats.insert(match_id, seats);

    for (occupant, seat) in pair.iter().zip(seats.iter()) {
        state.player_matches.insert(occupant.player_id, match_id);
        state.send_to_player(
            occupant.player_id,
            ServerMessage::CreateGame {
                match_id,
                side_id: seat.side,
            },
        );
    }

    info!(
        "Match {} created for {} vs {}",
        match_id, pair[0].name, pair[1].name
    );
}

/// Create a single-player match against the bot. The human moves first.
fn start_single_play(state: &Arc<ServerState>, player_id: Uuid) {
    let match_id = MatchId::new();
    let human_side = SideId::new();
    let bot_side = SideId::new();
    let mut bot = Bot::new();

    let bot_fleet = match bot.place_fleet() {
        Ok(fleet) => fleet,
        Err(e) => {
            error!("Bot fleet generation failed: {}", e);
            return reject(state, player_id, e.to_string());
        }
    };

    {
        let mut engine = state.engine.lock().unwrap();
        if engine.create_match(match_id, human_side, bot_side).is_err() {
            return reject(state, player_id, "Could not create match".into());
        }
        if let Err(e) = engine.submit_fleet(match_id, bot_side, bot_fleet) {
            error!("Bot fleet rejected by engine: {}", e);
            let _ = engine.remove_match(match_id);
            return reject(state, player_id, e.to_string());
        }
    }

    state.seats.insert(
        match_id,
        [
            Seat {
                side: human_side,
                occupant: SeatOccupant::Human(player_id),
            },
            Seat {
                side: bot_side,
                occupant: SeatOccupant::Bot,
            },
        ],
    );
    state.player_matches.insert(player_id, match_id);
    state.bots.insert(match_id, bot);

    // The player is no longer waiting in any room
    state.lobby.lock().unwrap().leave(player_id);
    state.broadcast_rooms();

    state.send_to_player(
        player_id,
        ServerMessage::CreateGame {
            match_id,
            side_id: human_side,
        },
    );
    info!("Single-player match {} created", match_id);
}

/// Both fleets are in: tell each human its own layout and announce the turn.
fn announce_start(state: &Arc<ServerState>, match_id: MatchId) {
    let engine = state.engine.lock().unwrap();
    let Ok(game) = engine.get(match_id) else {
        return;
    };
    let current_side = game.turn();

    if let Some(seats) = state.seats.get(&match_id) {
        for seat in seats.iter() {
            if let SeatOccupant::Human(player_id) = seat.occupant {
                let ships = game
                    .fleet(seat.side)
                    .ok()
                    .flatten()
                    .map(|s| s.to_vec())
                    .unwrap_or_default();
                state.send_to_player(
                    player_id,
                    ServerMessage::StartGame {
                        ships,
                        current_side,
                    },
                );
            }
        }
    }
    drop(engine);

    state.broadcast_match(match_id, ServerMessage::Turn { current_side });
}

/// Resolve one attack and fan out the results; then let the bot move if it
/// holds the turn.
fn fire(state: &Arc<ServerState>, player_id: Uuid, match_id: MatchId, side: SideId, target: Coord) {
    let outcome = state.engine.lock().unwrap().attack(match_id, side, target);
    match outcome {
        Ok(outcome) => {
            state.broadcast_match(match_id, ServerMessage::Attack { outcome });
            if let Some(winner_side) = outcome.winner {
                conclude_match(state, match_id, winner_side);
            } else {
                let turn = state.engine.lock().unwrap().status(match_id).map(|s| s.turn);
                if let Ok(current_side) = turn {
                    state.broadcast_match(match_id, ServerMessage::Turn { current_side });
                }
                drive_bot(state, match_id);
            }
        }
        Err(e) => reject(state, player_id, e.to_string()),
    }
}

/// Let the bot fire while it holds the turn. A miss hands the turn back to
/// the human; a win concludes the match.
fn drive_bot(state: &Arc<ServerState>, match_id: MatchId) {
    loop {
        let Ok(status) = state.engine.lock().unwrap().status(match_id) else {
            return;
        };
        if status.finished {
            return;
        }

        let bot_side = {
            let Some(seats) = state.seats.get(&match_id) else {
                return;
            };
            match seats
                .iter()
                .find(|s| s.side == status.turn && s.occupant == SeatOccupant::Bot)
            {
                Some(seat) => seat.side,
                None => return,
            }
        };

        let target = {
            let engine = state.engine.lock().unwrap();
            let Ok(game) = engine.get(match_id) else {
                return;
            };
            let Some(mut bot) = state.bots.get_mut(&match_id) else {
                return;
            };
            match bot.choose_target(game, bot_side) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Bot has no move in match {}: {}", match_id, e);
                    return;
                }
            }
        };

        let outcome = state.engine.lock().unwrap().attack(match_id, bot_side, target);
        match outcome {
            Ok(outcome) => {
                state.broadcast_match(match_id, ServerMessage::Attack { outcome });
                if let Some(winner_side) = outcome.winner {
                    conclude_match(state, match_id, winner_side);
                    return;
                }
                let turn = state.engine.lock().unwrap().status(match_id).map(|s| s.turn);
                if let Ok(current_side) = turn {
                    state.broadcast_match(match_id, ServerMessage::Turn { current_side });
                }
            }
            Err(e) => {
                error!("Bot attack failed in match {}: {}", match_id, e);
                return;
            }
        }
    }
}

/// Announce the winner, update the leaderboard, and retire the match.
fn conclude_match(state: &Arc<ServerState>, match_id: MatchId, winner_side: SideId) {
    state.broadcast_match(match_id, ServerMessage::Finish { winner_side });

    if let Some((_, seats)) = state.seats.remove(&match_id) {
        for seat in seats {
            if let SeatOccupant::Human(player_id) = seat.occupant {
                if seat.side == winner_side {
                    state.directory.lock().unwrap().record_win(player_id);
                }
                state.player_matches.remove(&player_id);
            }
        }
    }

    // Finished matches are removed immediately; nothing expires them later
    let _ = state.engine.lock().unwrap().remove_match(match_id);
    state.bots.remove(&match_id);
    state.broadcast_winners();

    info!("Match {} finished, winner side {}", match_id, winner_side);
}

/// Handle player disconnect: leave the lobby and forfeit any active match.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    state.lobby.lock().unwrap().leave(player_id);
    state.broadcast_rooms();

    if let Some((match_id, side)) = state.seat_of(player_id) {
        let opponent = state.seats.get(&match_id).and_then(|seats| {
            seats.iter().find(|s| s.side != side).map(|s| s.side)
        });
        if let Some(winner_side) = opponent {
            info!(
                "Player {} disconnected, forfeiting match {}",
                player_id, match_id
            );
            let forced = state.engine.lock().unwrap().force_finish(match_id, winner_side);
            match forced {
                Ok(()) => conclude_match(state, match_id, winner_side),
                Err(e) => warn!("Could not forfeit match {}: {}", match_id, e),
            }
        }
    }
}
