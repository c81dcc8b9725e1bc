use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    game::{EventSink, LevelOrchestrator},
    models::{DefinitionDetails, GameEvent, Position},
    websocket::messages::{ClientMessage, ServerMessage},
    AppState,
};

/// Input to a session actor
#[derive(Debug)]
pub enum SessionCommand {
    Client(ClientMessage),
    /// A definition lookup finished; `None` means it failed
    Definition {
        word: String,
        result: Option<DefinitionDetails>,
    },
}

/// One player's game. The actor task is the only owner of the orchestrator,
/// so grid, word and engine state are mutated from a single place.
pub struct GameSession {
    id: Uuid,
    state: Arc<AppState>,
    orchestrator: LevelOrchestrator,
    events: mpsc::UnboundedReceiver<GameEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    command_tx: mpsc::Sender<SessionCommand>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl GameSession {
    pub fn new(
        id: Uuid,
        state: Arc<AppState>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> (Self, mpsc::Sender<SessionCommand>) {
        let (sink, events) = EventSink::channel();
        let (command_tx, commands) = mpsc::channel(64);
        let orchestrator =
            LevelOrchestrator::new(state.config.game.clone(), state.catalog.clone(), sink);

        let session = Self {
            id,
            state,
            orchestrator,
            events,
            commands,
            command_tx: command_tx.clone(),
            outbound,
        };
        (session, command_tx)
    }

    /// Drive the session until the client goes away
    pub async fn run(mut self) {
        match self.state.progress.load().await {
            Ok(progress) => self.orchestrator.set_progress(progress),
            Err(e) => tracing::warn!("Session {}: using fresh progress: {:#}", self.id, e),
        }

        let greeting = [
            ServerMessage::SessionCreated {
                session_id: self.id.to_string(),
            },
            ServerMessage::Snapshot {
                snapshot: self.orchestrator.snapshot(),
            },
        ];
        for msg in greeting {
            if self.outbound.send(msg).await.is_err() {
                return;
            }
        }

        let tick_ms = self.state.config.game.tick_interval_ms.max(1);
        let mut ticker = interval(Duration::from_millis(tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.orchestrator.tick(tick_ms);
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }

            if !self.flush_events().await {
                break;
            }
        }

        tracing::info!(
            "Session {} finished at level {} with score {}",
            self.id,
            self.orchestrator.level(),
            self.orchestrator.score()
        );
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Client(msg) => {
                if let Err(message) = self.handle_client_message(msg).await {
                    let _ = self.outbound.send(ServerMessage::Error { message }).await;
                }
            }
            SessionCommand::Definition { word, result } => {
                self.orchestrator.apply_definition(&word, result);
            }
        }
    }

    async fn handle_client_message(&mut self, msg: ClientMessage) -> Result<(), String> {
        match msg {
            ClientMessage::StartGame { level, categories } => {
                tracing::info!("Session {} starting game at level {}", self.id, level);
                self.orchestrator.set_categories(categories);
                self.orchestrator.new_game(level).map_err(|e| e.to_string())?;
            }
            ClientMessage::SelectTile { x, y } => {
                self.orchestrator.select_tile(Position::new(x, y));
            }
            ClientMessage::Pause => {
                self.orchestrator.pause();
            }
            ClientMessage::Resume => {
                self.orchestrator.resume();
            }
            ClientMessage::NextLevel => {
                self.orchestrator.next_level().map_err(|e| e.to_string())?;
            }
            ClientMessage::ReplayLevel => {
                self.orchestrator.replay_level().map_err(|e| e.to_string())?;
            }
            ClientMessage::Snapshot => {
                let snapshot = self.orchestrator.snapshot();
                let _ = self.outbound.send(ServerMessage::Snapshot { snapshot }).await;
            }
        }
        Ok(())
    }

    /// Forward pending events to the client and react to the ones that need
    /// storage or lookups. Returns false once the client is gone.
    async fn flush_events(&mut self) -> bool {
        while let Ok(event) = self.events.try_recv() {
            match &event {
                GameEvent::WordSelected { .. } => self.spawn_enrichment(),
                GameEvent::LevelCompleted { progress, .. } => {
                    if let Err(e) = self.state.progress.save(progress).await {
                        tracing::warn!("Session {}: failed to save progress: {:#}", self.id, e);
                    }
                }
                _ => {}
            }

            if self.outbound.send(ServerMessage::Event { event }).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Look up the active word's definition off the tick loop
    fn spawn_enrichment(&self) {
        let Some(entry) = self.orchestrator.word().entry() else {
            return;
        };
        let word = entry.word.clone();
        let service = self.state.definitions.clone();
        let tx = self.command_tx.clone();
        let session_id = self.id;

        tokio::spawn(async move {
            let result = match service.lookup(&word).await {
                Ok(details) => Some(details),
                Err(e) => {
                    tracing::warn!(
                        "Session {}: definition lookup for {} failed: {:#}",
                        session_id,
                        word,
                        e
                    );
                    None
                }
            };
            let _ = tx.send(SessionCommand::Definition { word, result }).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::GameConfig, models::LevelState};

    async fn recv_until<F>(rx: &mut mpsc::Receiver<ServerMessage>, pred: F) -> ServerMessage
    where
        F: Fn(&ServerMessage) -> bool,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for message")
                .expect("session closed");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_session_starts_game_and_falls_back_on_definition() {
        let state = crate::test_state(GameConfig {
            grid_width: 2,
            grid_height: 3,
            ..GameConfig::default()
        });
        let (out_tx, mut out_rx) = mpsc::channel(256);
        let (session, commands) = GameSession::new(Uuid::new_v4(), state, out_tx);
        let handle = tokio::spawn(session.run());

        assert!(matches!(
            recv_until(&mut out_rx, |_| true).await,
            ServerMessage::SessionCreated { .. }
        ));

        commands
            .send(SessionCommand::Client(ClientMessage::StartGame {
                level: 1,
                categories: None,
            }))
            .await
            .unwrap();

        recv_until(&mut out_rx, |m| {
            matches!(
                m,
                ServerMessage::Event {
                    event: GameEvent::GameStateChanged {
                        state: LevelState::Playing
                    }
                }
            )
        })
        .await;

        // The offline definition service fails, so the fallback arrives
        let msg = recv_until(&mut out_rx, |m| {
            matches!(
                m,
                ServerMessage::Event {
                    event: GameEvent::DefinitionUpdated { .. }
                }
            )
        })
        .await;
        match msg {
            ServerMessage::Event {
                event: GameEvent::DefinitionUpdated {
                    definition,
                    fallback,
                    ..
                },
            } => {
                assert!(fallback);
                assert!(definition.starts_with("A word meaning "));
            }
            other => panic!("unexpected {:?}", other),
        }

        drop(commands);
        drop(out_rx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_locked_level_reports_error() {
        let state = crate::test_state(GameConfig::default());
        let (out_tx, mut out_rx) = mpsc::channel(256);
        let (session, commands) = GameSession::new(Uuid::new_v4(), state, out_tx);
        let handle = tokio::spawn(session.run());

        commands
            .send(SessionCommand::Client(ClientMessage::StartGame {
                level: 5,
                categories: None,
            }))
            .await
            .unwrap();

        let msg = recv_until(&mut out_rx, |m| matches!(m, ServerMessage::Error { .. })).await;
        assert!(matches!(msg, ServerMessage::Error { message } if message.contains("locked")));

        drop(commands);
        drop(out_rx);
        handle.await.unwrap();
    }
}
