//! Single pending reconnect timer

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::session::{ChatSession, Transport};
use crate::error::SessionError;

/// At most one pending reconnect; scheduling again replaces it.
///
/// Must be used inside a tokio runtime. Dropping the timer cancels it.
pub struct ReconnectTimer {
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<()>,
    rx: mpsc::UnboundedReceiver<()>,
}

impl Default for ReconnectTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectTimer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            pending: None,
            tx,
            rx,
        }
    }

    pub fn schedule(&mut self, delay: Duration) {
        self.cancel();
        let tx = self.tx.clone();
        tracing::info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(());
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        // Drain a fire that raced the abort
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the pending timer to fire. Returns false at once if nothing
    /// is scheduled.
    pub async fn fired(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        let fired = self.rx.recv().await.is_some();
        self.pending = None;
        fired
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Owns a session together with its reconnect timer.
///
/// Unclean closes schedule a reconnect; teardown disposes the transport and
/// cancels whatever is pending.
pub struct SessionSupervisor<T: Transport> {
    session: ChatSession<T>,
    timer: ReconnectTimer,
}

impl<T: Transport> SessionSupervisor<T> {
    pub fn new(session: ChatSession<T>) -> Self {
        Self {
            session,
            timer: ReconnectTimer::new(),
        }
    }

    pub fn session(&self) -> &ChatSession<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession<T> {
        &mut self.session
    }

    pub fn reconnect_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn on_close(&mut self, clean: bool) {
        if let Some(delay) = self.session.on_close(clean) {
            self.timer.schedule(delay);
        }
    }

    /// Wait out the backoff, then start the next connection attempt
    pub async fn reconnect(&mut self, token: &str) -> Result<url::Url, SessionError> {
        if !self.timer.fired().await {
            return Err(SessionError::NoReconnectPending);
        }
        self.session.connect(token)
    }

    pub fn teardown(&mut self) {
        self.timer.cancel();
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::{ConnectionState, RecordingTransport, SessionOptions};

    fn supervisor() -> SessionSupervisor<RecordingTransport> {
        let options = SessionOptions {
            url: "wss://chat.example.com/ws".to_string(),
            token_param: "token".to_string(),
            reconnect_delay: Duration::from_secs(3),
        };
        let mut session = ChatSession::new(RecordingTransport::default(), options);
        session.connect("t1").unwrap();
        session.on_open();
        SessionSupervisor::new(session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let mut timer = ReconnectTimer::new();
        let start = tokio::time::Instant::now();
        timer.schedule(Duration::from_secs(3));
        assert!(timer.is_pending());

        assert!(timer.fired().await);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let mut timer = ReconnectTimer::new();
        timer.schedule(Duration::from_secs(3));
        timer.cancel();
        assert!(!timer.is_pending());

        assert!(!timer.fired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending() {
        let mut timer = ReconnectTimer::new();
        let start = tokio::time::Instant::now();
        timer.schedule(Duration::from_secs(1));
        timer.schedule(Duration::from_secs(5));

        assert!(timer.fired().await);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclean_close_reconnects_after_backoff() {
        let mut sup = supervisor();
        sup.on_close(false);
        assert!(sup.reconnect_pending());

        let start = tokio::time::Instant::now();
        let url = sup.reconnect("t2").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(url.query(), Some("token=t2"));
        assert_eq!(sup.session().state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_close_schedules_nothing() {
        let mut sup = supervisor();
        sup.on_close(true);
        assert!(!sup.reconnect_pending());

        let outcome = tokio::time::timeout(Duration::from_secs(60), sup.reconnect("t2"))
            .await
            .expect("reconnect returns without a pending timer");
        assert!(matches!(outcome, Err(SessionError::NoReconnectPending)));
        assert_eq!(sup.session().state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_without_close_is_an_error() {
        let mut sup = supervisor();
        assert!(matches!(
            sup.reconnect("t2").await,
            Err(SessionError::NoReconnectPending)
        ));
        assert_eq!(sup.session().state(), ConnectionState::Authenticating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_schedules_nothing() {
        let mut sup = supervisor();
        sup.session_mut()
            .on_frame(r#"{"type":"auth_response","success":false}"#)
            .unwrap();
        sup.on_close(false);
        assert!(!sup.reconnect_pending());
        assert!(matches!(
            sup.reconnect("t2").await,
            Err(SessionError::NoReconnectPending)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_reconnect() {
        let mut sup = supervisor();
        sup.on_close(false);
        sup.teardown();

        assert!(!sup.reconnect_pending());
        assert!(!sup.session().is_alive());
        assert!(sup.session().transport().closed);
    }
}
