//! Cross-window remote signer.
//!
//! # Responsibilities
//! - Open a signer popup carrying the requested intent and network
//! - Wait for exactly one message from the signer's origin
//! - Race that message against popup-closed polling and a hard timeout
//! - Close the popup and drop the listener on every exit path
//!
//! The window system is reached through `PopupHost`. Dropping the receiver
//! returned by `PopupHost::listen` deregisters the listener; hosts must
//! stop delivering to dropped receivers.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::config::schema::WalletConfig;
use crate::network::{resolve_network, NetworkSelector};
use crate::signing::{is_refusal, AgentError, InFlight};

/// A cross-window message as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    /// Origin of the sending window (`scheme://host[:port]`).
    pub origin: String,
    pub data: Value,
}

/// An open popup window.
pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

/// Window system used to open signer popups.
pub trait PopupHost: Send + Sync {
    /// Open `url` in a popup; `None` when the popup was blocked.
    fn open(&self, url: &Url) -> Option<Box<dyn PopupWindow>>;

    /// Register a message listener.
    fn listen(&self) -> mpsc::UnboundedReceiver<WindowMessage>;
}

/// Closes the popup when the wait ends, however it ends.
struct PopupGuard(Box<dyn PopupWindow>);

impl Drop for PopupGuard {
    fn drop(&mut self) {
        if !self.0.is_closed() {
            self.0.close();
        }
    }
}

/// Open `url` and wait for a single reply from `trusted_origin`.
///
/// Messages from any other origin are ignored. Resolves with the message
/// payload, or fails with `UserCancelled` (popup closed), `Timeout`, or
/// `Unavailable` (popup blocked).
pub async fn await_popup_reply(
    host: &dyn PopupHost,
    url: &Url,
    trusted_origin: &str,
    deadline: Duration,
    poll_interval: Duration,
) -> Result<Value, AgentError> {
    if poll_interval.is_zero() {
        return Err(AgentError::Unavailable("popup poll interval must be non-zero".to_string()));
    }

    // Listen before opening so an immediate reply is not lost.
    let mut messages = host.listen();
    let window = PopupGuard(
        host.open(url)
            .ok_or_else(|| AgentError::Unavailable("signer popup was blocked".to_string()))?,
    );

    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);
    let mut poll = tokio::time::interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Some(message) if message.origin == trusted_origin => return Ok(message.data),
                Some(message) => {
                    tracing::debug!(origin = %message.origin, "Ignoring message from untrusted origin");
                }
                None => return Err(AgentError::Failed("popup host stopped delivering messages".to_string())),
            },
            _ = poll.tick() => {
                if window.0.is_closed() {
                    tracing::debug!("Signer popup closed by user");
                    return Err(AgentError::UserCancelled);
                }
            }
            _ = &mut timeout => {
                tracing::warn!(timeout_secs = deadline.as_secs(), "Signer popup timed out");
                return Err(AgentError::Timeout(deadline.as_secs()));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Connect,
    Sign,
}

/// Pull `field` out of a signer reply, or map its `error` member.
fn interpret_reply(reply: &Value, field: &str, purpose: Purpose) -> Result<String, AgentError> {
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .unwrap_or("signer returned an error")
            .to_string();
        return Err(match (purpose, is_refusal(&message)) {
            (Purpose::Connect, true) => AgentError::PermissionRejected,
            (Purpose::Sign, true) => AgentError::Rejected(message),
            (_, false) => AgentError::Failed(message),
        });
    }

    reply
        .get(field)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AgentError::Failed(format!("signer reply has no '{}'", field)))
}

/// Remote signer reached through popups.
pub struct PopupAgent {
    host: Arc<dyn PopupHost>,
    signer_url: Url,
    origin: String,
    connect_timeout: Duration,
    sign_timeout: Duration,
    poll_interval: Duration,
    connect_flight: InFlight,
    sign_flight: InFlight,
}

impl PopupAgent {
    pub fn new(host: Arc<dyn PopupHost>, config: &WalletConfig) -> Result<Self, AgentError> {
        let signer_url = Url::parse(&config.popup_signer_url).map_err(|e| {
            AgentError::Unavailable(format!("invalid signer URL '{}': {}", config.popup_signer_url, e))
        })?;
        let origin = signer_url.origin().ascii_serialization();
        if config.poll_interval_ms == 0 {
            return Err(AgentError::Unavailable(
                "popup poll interval must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            signer_url,
            origin,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            sign_timeout: Duration::from_secs(config.sign_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            connect_flight: InFlight::default(),
            sign_flight: InFlight::default(),
        })
    }

    /// The only origin whose messages are accepted.
    pub fn signer_origin(&self) -> &str {
        &self.origin
    }

    fn intent_url(&self, intent: &str, network: NetworkSelector, extra: &[(&str, &str)]) -> Url {
        let mut url = self.signer_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("intent", intent);
            query.append_pair(
                "network",
                &resolve_network(network).wallet_label.to_ascii_lowercase(),
            );
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        url
    }

    pub async fn request_public_key(&self, network: NetworkSelector) -> Result<String, AgentError> {
        let _flight = self.connect_flight.begin()?;
        let url = self.intent_url("public_key", network, &[]);
        let reply = await_popup_reply(
            self.host.as_ref(),
            &url,
            &self.origin,
            self.connect_timeout,
            self.poll_interval,
        )
        .await?;
        interpret_reply(&reply, "pubkey", Purpose::Connect)
    }

    /// Sign base64 XDR through the popup; returns the signed XDR.
    pub async fn sign(
        &self,
        transaction_xdr: &str,
        network: NetworkSelector,
    ) -> Result<String, AgentError> {
        let _flight = self.sign_flight.begin()?;
        let url = self.intent_url("tx", network, &[("xdr", transaction_xdr)]);
        let reply = await_popup_reply(
            self.host.as_ref(),
            &url,
            &self.origin,
            self.sign_timeout,
            self.poll_interval,
        )
        .await?;
        interpret_reply(&reply, "signed_envelope_xdr", Purpose::Sign)
    }
}

impl std::fmt::Debug for PopupAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupAgent")
            .field("signer_url", &self.signer_url.as_str())
            .field("connect_timeout", &self.connect_timeout)
            .field("sign_timeout", &self.sign_timeout)
            .finish()
    }
}

/// In-process `PopupHost` for shells that drive windows themselves
/// (embedded webviews, test harnesses).
#[derive(Clone, Default)]
pub struct LoopbackPopupHost {
    inner: Arc<LoopbackState>,
}

#[derive(Default)]
struct LoopbackState {
    listeners: Mutex<Vec<mpsc::UnboundedSender<WindowMessage>>>,
    windows: Mutex<Vec<Arc<LoopbackWindow>>>,
    blocked: AtomicBool,
}

/// A window opened through `LoopbackPopupHost`.
#[derive(Debug)]
pub struct LoopbackWindow {
    url: Url,
    closed: AtomicBool,
}

impl LoopbackWindow {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct LoopbackHandle(Arc<LoopbackWindow>);

impl PopupWindow for LoopbackHandle {
    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    fn close(&self) {
        self.0.close()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LoopbackPopupHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a popup blocker.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Deliver a message to every live listener. Returns the delivery count.
    pub fn post_message(&self, origin: &str, data: Value) -> usize {
        let mut listeners = lock(&self.inner.listeners);
        listeners.retain(|tx| !tx.is_closed());
        let message = WindowMessage {
            origin: origin.to_string(),
            data,
        };
        listeners
            .iter()
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count()
    }

    /// Listeners not yet dropped.
    pub fn listener_count(&self) -> usize {
        let mut listeners = lock(&self.inner.listeners);
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    /// Every window opened so far, oldest first.
    pub fn windows(&self) -> Vec<Arc<LoopbackWindow>> {
        lock(&self.inner.windows).clone()
    }

    pub fn latest_window(&self) -> Option<Arc<LoopbackWindow>> {
        lock(&self.inner.windows).last().cloned()
    }
}

impl PopupHost for LoopbackPopupHost {
    fn open(&self, url: &Url) -> Option<Box<dyn PopupWindow>> {
        if self.inner.blocked.load(Ordering::SeqCst) {
            return None;
        }
        let window = Arc::new(LoopbackWindow {
            url: url.clone(),
            closed: AtomicBool::new(false),
        });
        lock(&self.inner.windows).push(window.clone());
        Some(Box::new(LoopbackHandle(window)))
    }

    fn listen(&self) -> mpsc::UnboundedReceiver<WindowMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.listeners).push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SIGNER_URL: &str = "https://signer.example.org/confirm";
    const ORIGIN: &str = "https://signer.example.org";
    const KEY: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

    fn setup() -> (LoopbackPopupHost, Arc<PopupAgent>) {
        let host = LoopbackPopupHost::new();
        let config = WalletConfig {
            popup_signer_url: SIGNER_URL.to_string(),
            ..WalletConfig::default()
        };
        let agent = PopupAgent::new(Arc::new(host.clone()), &config).unwrap();
        (host, Arc::new(agent))
    }

    async fn wait_for_window(host: &LoopbackPopupHost, count: usize) -> Arc<LoopbackWindow> {
        while host.windows().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        host.windows()[count - 1].clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_public_key_reply() {
        let (host, agent) = setup();
        let task = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.request_public_key(NetworkSelector::Testnet).await })
        };

        let window = wait_for_window(&host, 1).await;
        let query: Vec<(String, String)> = window.url().query_pairs().into_owned().collect();
        assert!(query.contains(&("intent".to_string(), "public_key".to_string())));
        assert!(query.contains(&("network".to_string(), "testnet".to_string())));

        host.post_message(ORIGIN, json!({ "pubkey": KEY }));
        assert_eq!(task.await.unwrap().unwrap(), KEY);
        assert!(window.is_closed(), "popup is closed once resolved");
        assert_eq!(host.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_origin_ignored() {
        let (host, agent) = setup();
        let task = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.request_public_key(NetworkSelector::Testnet).await })
        };
        wait_for_window(&host, 1).await;

        host.post_message("https://evil.example.com", json!({ "pubkey": "GEVIL" }));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!task.is_finished(), "call must stay pending");

        host.post_message(ORIGIN, json!({ "pubkey": KEY }));
        assert_eq!(task.await.unwrap().unwrap(), KEY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_popup_cancels_without_stale_resolution() {
        let (host, agent) = setup();

        let first = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.request_public_key(NetworkSelector::Testnet).await })
        };
        wait_for_window(&host, 1).await.close();
        assert_eq!(first.await.unwrap(), Err(AgentError::UserCancelled));
        assert_eq!(host.listener_count(), 0);

        // A late reply for the first popup reaches nobody.
        assert_eq!(host.post_message(ORIGIN, json!({ "pubkey": "GSTALE" })), 0);

        let second = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.request_public_key(NetworkSelector::Testnet).await })
        };
        wait_for_window(&host, 2).await;
        host.post_message(ORIGIN, json!({ "pubkey": KEY }));
        assert_eq!(second.await.unwrap().unwrap(), KEY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_tears_down() {
        let (host, agent) = setup();
        let result = agent.request_public_key(NetworkSelector::Mainnet).await;
        assert_eq!(result, Err(AgentError::Timeout(60)));

        let window = host.latest_window().unwrap();
        assert!(window.is_closed());
        assert_eq!(host.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_timeout_is_longer() {
        let (_host, agent) = setup();
        let start = tokio::time::Instant::now();
        let result = agent.sign("AAAA", NetworkSelector::Testnet).await;
        assert_eq!(result, Err(AgentError::Timeout(120)));
        assert!(start.elapsed() >= Duration::from_secs(120));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = WalletConfig {
            popup_signer_url: SIGNER_URL.to_string(),
            poll_interval_ms: 0,
            ..WalletConfig::default()
        };
        let result = PopupAgent::new(Arc::new(LoopbackPopupHost::new()), &config);
        assert!(matches!(result, Err(AgentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_zero_poll_interval_opens_no_popup() {
        let host = LoopbackPopupHost::new();
        let url = Url::parse(SIGNER_URL).unwrap();
        let result =
            await_popup_reply(&host, &url, ORIGIN, Duration::from_secs(1), Duration::ZERO).await;
        assert!(matches!(result, Err(AgentError::Unavailable(_))));
        assert!(host.windows().is_empty());
        assert_eq!(host.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_blocked_popup_fails_immediately() {
        let (host, agent) = setup();
        host.set_blocked(true);
        let result = agent.request_public_key(NetworkSelector::Testnet).await;
        assert!(matches!(result, Err(AgentError::Unavailable(_))));
        assert_eq!(host.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_reply_and_errors() {
        let (host, agent) = setup();

        let task = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.sign("AAAA", NetworkSelector::Mainnet).await })
        };
        let window = wait_for_window(&host, 1).await;
        let query: Vec<(String, String)> = window.url().query_pairs().into_owned().collect();
        assert!(query.contains(&("xdr".to_string(), "AAAA".to_string())));
        assert!(query.contains(&("network".to_string(), "public".to_string())));
        host.post_message(ORIGIN, json!({ "signed_envelope_xdr": "BBBB" }));
        assert_eq!(task.await.unwrap().unwrap(), "BBBB");

        let task = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.sign("AAAA", NetworkSelector::Testnet).await })
        };
        wait_for_window(&host, 2).await;
        host.post_message(ORIGIN, json!({ "error": { "message": "User rejected the request", "code": -4 } }));
        assert!(matches!(task.await.unwrap(), Err(AgentError::Rejected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_connect_while_pending_is_busy() {
        let (host, agent) = setup();
        let first = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.request_public_key(NetworkSelector::Testnet).await })
        };
        wait_for_window(&host, 1).await;

        assert_eq!(
            agent.request_public_key(NetworkSelector::Testnet).await,
            Err(AgentError::Busy)
        );
        assert_eq!(host.windows().len(), 1);

        host.post_message(ORIGIN, json!({ "pubkey": KEY }));
        assert!(first.await.unwrap().is_ok());
    }

    #[test]
    fn test_reply_interpretation() {
        assert_eq!(
            interpret_reply(&json!({ "error": "denied by user" }), "pubkey", Purpose::Connect),
            Err(AgentError::PermissionRejected)
        );
        assert_eq!(
            interpret_reply(&json!({ "error": { "message": "boom" } }), "pubkey", Purpose::Connect),
            Err(AgentError::Failed("boom".to_string()))
        );
        assert!(matches!(
            interpret_reply(&json!({ "something": 1 }), "pubkey", Purpose::Connect),
            Err(AgentError::Failed(_))
        ));
        assert_eq!(
            interpret_reply(&json!({ "pubkey": KEY, "error": null }), "pubkey", Purpose::Connect),
            Ok(KEY.to_string())
        );
    }
}
