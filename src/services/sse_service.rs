use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        phase::PhaseEnteredEvent,
        sse::{Handshake, ServerEvent},
    },
    error::ServiceError,
    services::{game_service, sse_events},
    state::SharedState,
};

/// Subscription to one game's feed plus the events only this client should see first.
pub struct Subscription {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub greeting: Vec<ServerEvent>,
}

/// Subscribe to the change feed of a game, loading it if needed.
///
/// The first subscriber of a freshly entered phase also triggers the
/// `phase.entered` cue for everybody.
pub async fn subscribe(state: &SharedState, game_id: Uuid) -> Result<Subscription, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    let receiver = runtime.sse().subscribe();

    let handshake = Handshake {
        game_id,
        message: "subscribed to game events".into(),
        degraded: state.is_degraded(),
        last_event_id: runtime.sse().last_event_id(),
    };
    let greeting = match ServerEvent::direct(sse_events::EVENT_HANDSHAKE, &handshake) {
        Ok(event) => vec![event],
        Err(err) => {
            warn!(%game_id, error = %err, "failed to serialize SSE handshake");
            Vec::new()
        }
    };

    let (cursor, started_at) = {
        let cache = runtime.cache().read().await;
        (cache.cursor(), cache.game().phase_started_at)
    };
    if runtime.session().lock().await.take_entry_cue(cursor) {
        sse_events::broadcast_phase_entered(
            runtime.sse(),
            &PhaseEnteredEvent::new(cursor, started_at),
        );
    }

    info!(
        %game_id,
        subscribers = runtime.sse().subscriber_count(),
        "new game SSE connection"
    );
    Ok(Subscription { receiver, greeting })
}

/// Convert a subscription into an SSE response, forwarding events until the
/// client disconnects.
pub fn to_sse_stream(
    subscription: Subscription,
    game_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        greeting,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: greets the client, then reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        for payload in greeting {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            debug!(%game_id, skipped, "SSE subscriber lagging behind");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%game_id, "game SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().event(payload.event).data(payload.data);
    match payload.id {
        Some(id) => event.id(id.to_string()),
        None => event,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::game::{CreateGameRequest, PlayerInput},
        services::commit::tests::flaky_state,
    };

    #[tokio::test]
    async fn first_subscriber_gets_handshake_and_phase_cue_once() {
        let (state, _store) = flaky_state().await;
        let host = Uuid::new_v4();
        let game = game_service::create_game(
            &state,
            host,
            CreateGameRequest {
                name: "Cue".into(),
                host: PlayerInput {
                    name: "Ada".into(),
                    faction: "Arborec".into(),
                    color: "green".into(),
                },
                victory_point_goal: Some(14),
            },
        )
        .await
        .unwrap();

        let mut first = subscribe(&state, game.id).await.unwrap();
        assert_eq!(first.greeting.len(), 1);
        assert_eq!(first.greeting[0].event, sse_events::EVENT_HANDSHAKE);
        assert_eq!(first.greeting[0].id, None);
        let cue = first.receiver.recv().await.unwrap();
        assert_eq!(cue.event, sse_events::EVENT_PHASE_ENTERED);

        let _second = subscribe(&state, game.id).await.unwrap();
        assert!(first.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_games_cannot_be_subscribed() {
        let (state, _store) = flaky_state().await;
        let err = subscribe(&state, Uuid::new_v4()).await.err().unwrap();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
