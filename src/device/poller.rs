use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{CoverState, Curtain};

/// Background task that keeps a [`CoverState`] fresh.
///
/// Polls once on start, then every `interval` and whenever [`refresh`] is
/// called. A failed poll only marks the cover unavailable; the next tick
/// tries again.
///
/// [`refresh`]: PositionPoller::refresh
pub struct PositionPoller {
    state_rx: watch::Receiver<CoverState>,
    refresh: Arc<Notify>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PositionPoller {
    pub fn spawn(curtain: Arc<dyn Curtain>, interval: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(CoverState::default());
        let refresh = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        log::info!("Starting position poller every {:?}", interval);
        let handle = tokio::spawn(poll_task(
            curtain,
            interval,
            state_tx,
            refresh.clone(),
            shutdown_rx,
        ));

        Self {
            state_rx,
            refresh,
            shutdown_tx,
            handle,
        }
    }

    pub fn state(&self) -> watch::Receiver<CoverState> {
        self.state_rx.clone()
    }

    pub fn current(&self) -> CoverState {
        self.state_rx.borrow().clone()
    }

    /// Poll now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            log::warn!("Position poller ended abnormally: {}", e);
        }
        log::info!("Position poller stopped");
    }
}

async fn poll_task(
    curtain: Arc<dyn Curtain>,
    interval: Duration,
    state_tx: watch::Sender<CoverState>,
    refresh: Arc<Notify>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Also fires if the poller handle was dropped.
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {},
            _ = refresh.notified() => {},
        }
        poll_once(curtain.as_ref(), &state_tx).await;
    }
}

async fn poll_once(curtain: &dyn Curtain, state_tx: &watch::Sender<CoverState>) {
    match curtain.query_position().await {
        Ok(position) => {
            log::debug!("Curtain position: {}", position);
            state_tx.send_modify(|state| state.record_position(position));
        }
        Err(e) => {
            log::warn!("Position poll failed: {}", e);
            state_tx.send_modify(|state| state.record_failure(&e));
        }
    }
}
