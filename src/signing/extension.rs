//! In-page browser extension agent.
//!
//! The extension is reached through `ExtensionApi`, implemented by the
//! embedding shell. This module owns the connect handshake and maps the
//! extension's free-text errors onto `AgentError`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::signing::{is_refusal, AgentError, InFlight};

/// Error text reported by the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFault(pub String);

impl From<&str> for ExtensionFault {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Calls exposed by the wallet extension.
#[async_trait]
pub trait ExtensionApi: Send + Sync {
    /// Whether the extension is installed and reachable.
    async fn is_connected(&self) -> Result<bool, ExtensionFault>;

    /// Whether this site was already granted access.
    async fn is_allowed(&self) -> Result<bool, ExtensionFault>;

    /// Prompt the user for access; returns the public key on approval.
    async fn request_access(&self) -> Result<String, ExtensionFault>;

    async fn get_public_key(&self) -> Result<String, ExtensionFault>;

    /// Sign base64 XDR for the network named by `network_label`.
    async fn sign_transaction(
        &self,
        transaction_xdr: &str,
        network_label: &str,
    ) -> Result<String, ExtensionFault>;
}

/// How a connect attempt obtained the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessGrant {
    /// Site was already authorized; no prompt shown.
    AlreadyConnected(String),
    /// User approved a fresh prompt.
    Granted(String),
}

impl AccessGrant {
    pub fn public_key(&self) -> &str {
        match self {
            AccessGrant::AlreadyConnected(key) | AccessGrant::Granted(key) => key,
        }
    }

    pub fn into_public_key(self) -> String {
        match self {
            AccessGrant::AlreadyConnected(key) | AccessGrant::Granted(key) => key,
        }
    }
}

pub struct ExtensionAgent {
    api: Arc<dyn ExtensionApi>,
    connect_flight: InFlight,
    sign_flight: InFlight,
}

impl ExtensionAgent {
    pub fn new(api: Arc<dyn ExtensionApi>) -> Self {
        Self {
            api,
            connect_flight: InFlight::default(),
            sign_flight: InFlight::default(),
        }
    }

    /// Check install state, reuse an existing grant, or prompt for access.
    pub async fn connect(&self) -> Result<AccessGrant, AgentError> {
        let _flight = self.connect_flight.begin()?;

        let installed = self
            .api
            .is_connected()
            .await
            .map_err(|f| AgentError::Unavailable(f.0))?;
        if !installed {
            return Err(AgentError::Unavailable("wallet extension is not installed".to_string()));
        }

        if self.api.is_allowed().await.map_err(access_error)? {
            let key = self.api.get_public_key().await.map_err(access_error)?;
            if !key.is_empty() {
                return Ok(AccessGrant::AlreadyConnected(key));
            }
        }

        match self.api.request_access().await {
            Ok(key) if !key.is_empty() => Ok(AccessGrant::Granted(key)),
            // An empty key is how the extension reports a dismissed prompt.
            Ok(_) => Err(AgentError::PermissionRejected),
            Err(fault) => Err(access_error(fault)),
        }
    }

    /// Sign through the extension; returns the signed XDR.
    pub async fn sign(
        &self,
        transaction_xdr: &str,
        network_label: &str,
    ) -> Result<String, AgentError> {
        let _flight = self.sign_flight.begin()?;

        match self.api.sign_transaction(transaction_xdr, network_label).await {
            Ok(signed) if !signed.is_empty() => Ok(signed),
            Ok(_) => Err(AgentError::Failed("extension returned an empty envelope".to_string())),
            Err(fault) if is_refusal(&fault.0) => Err(AgentError::Rejected(fault.0)),
            Err(fault) => Err(AgentError::Failed(fault.0)),
        }
    }
}

fn access_error(fault: ExtensionFault) -> AgentError {
    if is_refusal(&fault.0) {
        AgentError::PermissionRejected
    } else {
        AgentError::Failed(fault.0)
    }
}

impl std::fmt::Debug for ExtensionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionAgent").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const KEY: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

    #[derive(Default)]
    struct FakeExtension {
        installed: bool,
        allowed: bool,
        access: Option<Result<String, ExtensionFault>>,
        signing: Option<Result<String, ExtensionFault>>,
        prompts: AtomicUsize,
        signed_with: Mutex<Option<String>>,
        sign_delay: Option<Duration>,
    }

    #[async_trait]
    impl ExtensionApi for FakeExtension {
        async fn is_connected(&self) -> Result<bool, ExtensionFault> {
            Ok(self.installed)
        }

        async fn is_allowed(&self) -> Result<bool, ExtensionFault> {
            Ok(self.allowed)
        }

        async fn request_access(&self) -> Result<String, ExtensionFault> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.access.clone().unwrap_or_else(|| Ok(KEY.to_string()))
        }

        async fn get_public_key(&self) -> Result<String, ExtensionFault> {
            Ok(KEY.to_string())
        }

        async fn sign_transaction(
            &self,
            transaction_xdr: &str,
            network_label: &str,
        ) -> Result<String, ExtensionFault> {
            if let Some(delay) = self.sign_delay {
                tokio::time::sleep(delay).await;
            }
            *self.signed_with.lock().unwrap() = Some(network_label.to_string());
            self.signing
                .clone()
                .unwrap_or_else(|| Ok(format!("{transaction_xdr}-signed")))
        }
    }

    fn agent(fake: FakeExtension) -> (ExtensionAgent, Arc<FakeExtension>) {
        let fake = Arc::new(fake);
        (ExtensionAgent::new(fake.clone()), fake)
    }

    #[tokio::test]
    async fn test_absent_extension() {
        let (agent, _) = agent(FakeExtension::default());
        assert!(matches!(agent.connect().await, Err(AgentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_already_connected_skips_prompt() {
        let (agent, fake) = agent(FakeExtension {
            installed: true,
            allowed: true,
            ..Default::default()
        });
        let grant = agent.connect().await.unwrap();
        assert_eq!(grant, AccessGrant::AlreadyConnected(KEY.to_string()));
        assert_eq!(fake.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_granted_and_declined() {
        let (agent, fake) = agent(FakeExtension {
            installed: true,
            ..Default::default()
        });
        assert_eq!(agent.connect().await.unwrap(), AccessGrant::Granted(KEY.to_string()));
        assert_eq!(fake.prompts.load(Ordering::SeqCst), 1);

        let (agent, _) = self::agent(FakeExtension {
            installed: true,
            access: Some(Err("User declined access".into())),
            ..Default::default()
        });
        assert_eq!(agent.connect().await, Err(AgentError::PermissionRejected));

        let (agent, _) = self::agent(FakeExtension {
            installed: true,
            access: Some(Ok(String::new())),
            ..Default::default()
        });
        assert_eq!(agent.connect().await, Err(AgentError::PermissionRejected));
    }

    #[tokio::test]
    async fn test_sign_passes_network_label() {
        let (agent, fake) = agent(FakeExtension {
            installed: true,
            ..Default::default()
        });
        let signed = agent.sign("AAAA", "TESTNET").await.unwrap();
        assert_eq!(signed, "AAAA-signed");
        assert_eq!(fake.signed_with.lock().unwrap().as_deref(), Some("TESTNET"));
    }

    #[tokio::test]
    async fn test_sign_rejection_is_distinct_from_failure() {
        let (agent, _) = agent(FakeExtension {
            installed: true,
            signing: Some(Err("User rejected the transaction".into())),
            ..Default::default()
        });
        assert!(matches!(agent.sign("AAAA", "TESTNET").await, Err(AgentError::Rejected(_))));

        let (agent, _) = self::agent(FakeExtension {
            installed: true,
            signing: Some(Err("Unable to parse XDR".into())),
            ..Default::default()
        });
        assert_eq!(
            agent.sign("AAAA", "TESTNET").await,
            Err(AgentError::Failed("Unable to parse XDR".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sign_is_busy() {
        let (agent, _) = agent(FakeExtension {
            installed: true,
            sign_delay: Some(Duration::from_secs(1)),
            ..Default::default()
        });
        let agent = Arc::new(agent);

        let first = {
            let agent = agent.clone();
            tokio::spawn(async move { agent.sign("AAAA", "TESTNET").await })
        };
        tokio::task::yield_now().await;

        assert_eq!(agent.sign("BBBB", "TESTNET").await, Err(AgentError::Busy));
        assert!(first.await.unwrap().is_ok());
        assert!(agent.sign("CCCC", "TESTNET").await.is_ok());
    }
}
