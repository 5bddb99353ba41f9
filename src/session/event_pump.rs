// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The event pump: drains the backend's local event queue and converts
//! each event into an outbound wire message, serializing attach
//! handshakes through the pending-attach gate.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use crate::{
    backend::{Backend, Event},
    reader::{Reader, ReaderRegistry},
    session::{pending::PendingAttachGate, send_gate::SendGate},
    wire::{Atr, MessageType, ReaderAdd, UNDEFINED_READER_ID},
};

/// Runs the event pump until the backend signals shutdown
/// (`event_wait` returning `None`). Intended to be spawned as its own
/// task, independent of the session loop.
pub async fn run<B, W>(
    backend: Arc<B>,
    registry: Arc<ReaderRegistry>,
    gate: Arc<PendingAttachGate>,
    send_gate: Arc<SendGate<W>>,
) where
    B: Backend,
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let Some(event) = backend.event_wait().await else {
            debug!("event pump: backend signaled shutdown");
            return;
        };

        if let Err(err) = handle_event(&backend, &registry, &gate, &send_gate, event).await {
            warn!("event pump: failed to forward event: {err}");
        }
    }
}

async fn handle_event<B, W>(
    backend: &Arc<B>,
    registry: &Arc<ReaderRegistry>,
    gate: &Arc<PendingAttachGate>,
    send_gate: &Arc<SendGate<W>>,
    event: Event,
) -> anyhow::Result<()>
where
    B: Backend,
    W: AsyncWrite + Unpin + Send,
{
    // READER_INSERT never has a prior registry entry; every other event
    // kind must resolve an existing reader before the stale-event filter
    // can even ask for its id.
    if let Event::ReaderInsert { handle, name } = event {
        // Block until IDLE, then register `r` as pending: this also
        // guarantees any card event on the same reader queued behind it
        // in the backend's queue sees an id already assigned or the
        // handshake already resolved by the time it's dequeued.
        gate.wait_idle().await;
        let reader = Arc::new(Reader::new(handle, name));
        registry.insert(Arc::clone(&reader));
        gate.begin_attach(Arc::clone(&reader)).await;

        let payload = ReaderAdd {
            name: reader.name.clone(),
        }
        .encode();
        send_gate
            .send(MessageType::ReaderAdd, UNDEFINED_READER_ID, &payload)
            .await?;
        return Ok(());
    }

    let handle = event.handle();
    let Some(reader) = registry.by_handle(handle) else {
        // Unknown handle: the reader was already removed. Drop silently.
        return Ok(());
    };

    let mut id = reader.id();
    if id == UNDEFINED_READER_ID {
        // Stale-event filter: wait out any handshake in flight on this
        // reader before trusting its id.
        if gate.pending_handle().await == Some(handle) {
            gate.wait_idle().await;
            id = reader.id();
            if id == UNDEFINED_READER_ID {
                // Rejected while we waited: drop the event. If it was the
                // backend telling us the reader is gone, the registry
                // entry must still be purged even though the reader was
                // never attached.
                if matches!(event, Event::ReaderRemove { .. }) {
                    registry.remove(handle);
                }
                return Ok(());
            }
        } else {
            // Already rejected earlier: drop, purging the registry entry
            // on a ReaderRemove for the same reason as above.
            if matches!(event, Event::ReaderRemove { .. }) {
                registry.remove(handle);
            }
            return Ok(());
        }
    }

    match event {
        Event::ReaderInsert { .. } => unreachable!("handled above"),
        Event::ReaderRemove { handle } => {
            send_gate.send(MessageType::ReaderRemove, id, &[]).await?;
            registry.remove(handle);
        }
        Event::CardInsert { handle } => {
            let atr = backend.reader_power_on(handle).await?;
            reader.insert_card(atr.clone())?;
            let payload = Atr { bytes: atr }.encode();
            send_gate.send(MessageType::Atr, id, &payload).await?;
        }
        Event::CardRemove { .. } => {
            reader.remove_card();
            send_gate.send(MessageType::CardRemove, id, &[]).await?;
        }
    }
    Ok(())
}
