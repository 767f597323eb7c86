//! Signing side of the sign protocol
//!
//! The authority owns sessions, accounts and keys. Each request moves through
//! `Idle -> AwaitingUserApproval -> Signing -> Idle`, or straight to `Signing`
//! when a session covers the origin and the policy skips confirmation. Any
//! failure ends the request in `Rejected`. Every request gets exactly one
//! outcome.

use crate::address::{encode_address, validate_address};
use crate::config::SigningPolicy;
use crate::error::{ProviderError, WasmAlgoError};
use crate::events::{send_event, BridgeEvent, EventKind};
use crate::provider::messages::{
    BridgeMessage, CorrelationId, SignOutcome, SignRequest, SignResult,
};
use crate::provider::transport::Transport;
use crate::session::{Account, AccountService, Session, SessionService};
use crate::storage::StorageBackend;
use crate::transaction::{SignedTransaction, UnsignedTransaction};
use crate::types::{TransactionType, MAX_GROUP_SIZE};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use dashmap::DashMap;
use ed25519_dalek::SigningKey;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a sign request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignState {
    Idle,
    AwaitingUserApproval,
    Signing,
    Rejected,
}

/// Source of signing keys by address
pub trait Keyring {
    fn signing_key(&self, address: &str) -> Option<SigningKey>;

    /// Forget the key for `address`; returns whether one was held
    fn remove(&self, address: &str) -> bool;
}

/// Keys held in memory; clones share the same keys
#[derive(Clone, Default)]
pub struct MemoryKeyring {
    keys: Arc<DashMap<String, SigningKey>>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, returning its address
    pub fn insert(&self, key: SigningKey) -> Result<String, WasmAlgoError> {
        let address = encode_address(key.verifying_key().as_bytes())?;
        self.keys.insert(address.clone(), key);
        Ok(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.keys.contains_key(address)
    }
}

impl Keyring for MemoryKeyring {
    fn signing_key(&self, address: &str) -> Option<SigningKey> {
        self.keys.get(address).map(|k| k.value().clone())
    }

    fn remove(&self, address: &str) -> bool {
        self.keys.remove(address).is_some()
    }
}

/// One transaction as presented to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub id: String,
    pub tx_type: TransactionType,
    pub sender: String,
    pub message: Option<String>,
    pub skipped: bool,
}

/// What the user is asked to approve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: CorrelationId,
    pub origin: String,
    /// Session covering the origin; `None` means this also connects the origin
    pub session: Option<Session>,
    pub transactions: Vec<TransactionSummary>,
}

/// Asks the user to approve a request
#[async_trait(?Send)]
pub trait ApprovalPrompt {
    async fn request_approval(&self, request: &ApprovalRequest) -> bool;
}

/// A decoded request entry
struct PreparedTransaction {
    bytes: Vec<u8>,
    transaction: UnsignedTransaction,
    /// `None` when the caller asked to skip this entry
    signer: Option<String>,
    message: Option<String>,
}

pub struct SigningAuthority<S: StorageBackend, K: Keyring, P: ApprovalPrompt> {
    sessions: SessionService<S>,
    accounts: AccountService<S>,
    keyring: K,
    prompt: P,
    policy: SigningPolicy,
    states: DashMap<CorrelationId, SignState>,
}

impl<S, K, P> SigningAuthority<S, K, P>
where
    S: StorageBackend + Clone,
    K: Keyring,
    P: ApprovalPrompt,
{
    pub fn new(storage: S, keyring: K, prompt: P, policy: SigningPolicy) -> Self {
        SigningAuthority {
            sessions: SessionService::new(storage.clone()),
            accounts: AccountService::new(storage),
            keyring,
            prompt,
            policy,
            states: DashMap::new(),
        }
    }

    pub fn sessions(&self) -> &SessionService<S> {
        &self.sessions
    }

    pub fn accounts(&self) -> &AccountService<S> {
        &self.accounts
    }

    pub fn keyring(&self) -> &K {
        &self.keyring
    }

    pub fn policy(&self) -> SigningPolicy {
        self.policy
    }

    /// Current state of a request; `Idle` once it has finished
    pub fn state(&self, id: &CorrelationId) -> SignState {
        self.states
            .get(id)
            .map(|s| *s.value())
            .unwrap_or(SignState::Idle)
    }

    fn transition(&self, id: &CorrelationId, state: SignState) {
        debug!(correlation_id = %id, state = ?state, "Sign request state");
        self.states.insert(id.clone(), state);
    }

    /// Process one sign request to its single terminal outcome
    pub async fn handle_sign_request(
        &self,
        id: CorrelationId,
        origin: &str,
        request: SignRequest,
    ) -> SignOutcome {
        self.transition(&id, SignState::Idle);
        let result = self.process(&id, origin, request).await;

        match &result {
            Ok(signed) => info!(
                correlation_id = %id,
                origin = origin,
                signed = signed.stxns.iter().filter(|s| s.is_some()).count(),
                "Sign request completed"
            ),
            Err(err) => {
                self.transition(&id, SignState::Rejected);
                info!(
                    correlation_id = %id,
                    origin = origin,
                    code = err.code,
                    reason = %err.message,
                    "Sign request rejected"
                );
            }
        }
        self.states.remove(&id);

        SignOutcome::from(result)
    }

    async fn process(
        &self,
        id: &CorrelationId,
        origin: &str,
        request: SignRequest,
    ) -> Result<SignResult, ProviderError> {
        let prepared = prepare(request)?;
        self.signing_keys(&prepared)?;

        let genesis_hash = BASE64.encode(prepared[0].transaction.header.genesis_hash);
        let mut signers: Vec<String> = prepared.iter().filter_map(|p| p.signer.clone()).collect();
        signers.sort();
        signers.dedup();

        let covering = self
            .session_for(origin, &genesis_hash)?
            .filter(|s| signers.iter().all(|a| s.authorizes(a)));

        let needs_prompt = match &covering {
            Some(_) => self.policy.confirm_known_origins,
            None if self.policy.prompt_unknown_origins => true,
            None => {
                return Err(ProviderError::user_rejected(format!(
                    "Origin {} is not connected",
                    origin
                )))
            }
        };

        if needs_prompt {
            self.transition(id, SignState::AwaitingUserApproval);
            let approval = ApprovalRequest {
                id: id.clone(),
                origin: origin.to_string(),
                session: covering,
                transactions: prepared.iter().map(summarize).collect(),
            };
            if !self.prompt.request_approval(&approval).await {
                return Err(ProviderError::user_rejected("Request declined"));
            }
        }

        // The account may have been removed while the prompt was open
        let keys = self.signing_keys(&prepared)?;

        self.transition(id, SignState::Signing);
        let mut stxns = Vec::with_capacity(prepared.len());
        for (entry, key) in prepared.iter().zip(&keys) {
            let stxn = match key {
                Some(key) => {
                    let signed = SignedTransaction::sign(&entry.bytes, key)?;
                    Some(BASE64.encode(signed.encode()?))
                }
                None => None,
            };
            stxns.push(stxn);
        }

        // Re-read so concurrent requests from one origin extend the same session
        let mut session = self
            .session_for(origin, &genesis_hash)?
            .unwrap_or_else(|| Session::new(origin, genesis_hash));
        for signer in signers {
            if !session.authorizes(&signer) {
                session.authorized_addresses.push(signer);
            }
        }
        session.used_at = Utc::now();
        self.sessions.save(session).map_err(ProviderError::from)?;

        Ok(SignResult {
            id: id.clone(),
            stxns,
        })
    }

    /// Key for each entry that is not skipped
    ///
    /// A signer needs both a stored account and a key in the keyring.
    fn signing_keys(
        &self,
        prepared: &[PreparedTransaction],
    ) -> Result<Vec<Option<SigningKey>>, ProviderError> {
        prepared
            .iter()
            .map(|entry| {
                entry
                    .signer
                    .as_deref()
                    .map(|signer| self.signing_key_for(signer))
                    .transpose()
            })
            .collect()
    }

    fn signing_key_for(&self, signer: &str) -> Result<SigningKey, ProviderError> {
        let stored = self
            .accounts
            .get_by_address(signer)
            .map_err(ProviderError::from)?
            .is_some();
        match self.keyring.signing_key(signer) {
            Some(key) if stored => Ok(key),
            _ => Err(ProviderError::key_not_found(format!(
                "No signing key for {}",
                signer
            ))),
        }
    }

    /// Most recently used session for this origin on this network
    fn session_for(
        &self,
        origin: &str,
        genesis_hash: &str,
    ) -> Result<Option<Session>, ProviderError> {
        Ok(self
            .sessions
            .get_by_origin(origin)
            .map_err(ProviderError::from)?
            .into_iter()
            .find(|s| s.genesis_hash == genesis_hash))
    }

    /// Answer sign requests from `incoming` concurrently, replying on `transport`
    pub async fn serve<St, T>(&self, incoming: St, transport: &T)
    where
        St: Stream<Item = BridgeMessage>,
        T: Transport + ?Sized,
    {
        incoming
            .for_each_concurrent(None, |message| async move {
                match message {
                    BridgeMessage::SignRequest {
                        id,
                        origin,
                        request,
                    } => {
                        let outcome = self.handle_sign_request(id.clone(), &origin, request).await;
                        let response = BridgeMessage::SignResponse {
                            id: id.clone(),
                            outcome,
                        };
                        if let Err(e) = transport.send(response).await {
                            warn!(correlation_id = %id, error = %e, "Dropping orphaned sign response");
                        }
                    }
                    other => debug!(kind = other.kind(), "Ignoring message"),
                }
            })
            .await
    }

    /// Revoke a session and tell other contexts
    pub async fn revoke_session<T: Transport + ?Sized>(
        &self,
        session_id: &str,
        transport: &T,
    ) -> Result<bool, WasmAlgoError> {
        let Some(session) = self.sessions.get_by_id(session_id)? else {
            return Ok(false);
        };
        self.sessions.remove_by_id(&session.id)?;
        notify_revoked(transport, session).await;
        Ok(true)
    }

    /// Remove an account, its signing key and every session that authorizes it
    pub async fn remove_account<T: Transport + ?Sized>(
        &self,
        account_id: &str,
        transport: &T,
    ) -> Result<Vec<Session>, WasmAlgoError> {
        let Some(account) = self.accounts.get_by_id(account_id)? else {
            return Ok(Vec::new());
        };
        let address = account.address()?;
        self.accounts.remove_by_id(&account.id)?;
        if !self.accounts.is_account_known(&address)? {
            self.keyring.remove(&address);
        }

        let revoked = self.sessions.remove_by_address(&address)?;
        for session in &revoked {
            notify_revoked(transport, session.clone()).await;
        }
        Ok(revoked)
    }
}

impl<S, P> SigningAuthority<S, MemoryKeyring, P>
where
    S: StorageBackend + Clone,
    P: ApprovalPrompt,
{
    /// Store an account together with its signing key
    pub fn add_account(
        &self,
        id: &str,
        name: Option<String>,
        key: SigningKey,
    ) -> Result<Account, WasmAlgoError> {
        let account = self.accounts.save(Account {
            id: id.to_string(),
            public_key: hex::encode(key.verifying_key().as_bytes()),
            name,
        })?;
        self.keyring.insert(key)?;
        Ok(account)
    }
}

async fn notify_revoked<T: Transport + ?Sized>(transport: &T, session: Session) {
    let event = BridgeEvent::new(EventKind::SessionRevoked {
        session_id: session.id,
        origin: session.origin,
    });
    send_event(transport, event).await;
}

/// Structural validation; nothing here prompts the user
fn prepare(request: SignRequest) -> Result<Vec<PreparedTransaction>, ProviderError> {
    if request.txns.is_empty() {
        return Err(ProviderError::bad_request("No transactions to sign"));
    }
    if request.txns.len() > MAX_GROUP_SIZE {
        return Err(ProviderError::bad_request(format!(
            "At most {} transactions per request, got {}",
            MAX_GROUP_SIZE,
            request.txns.len()
        )));
    }

    let mut prepared = Vec::with_capacity(request.txns.len());
    for (index, entry) in request.txns.into_iter().enumerate() {
        let bytes = BASE64.decode(&entry.txn).map_err(|e| {
            ProviderError::bad_request(format!("Entry {}: invalid base64: {}", index, e))
        })?;
        let transaction = UnsignedTransaction::decode(&bytes).map_err(|e| match e {
            WasmAlgoError::UnknownTransactionType(_) => ProviderError::from(e),
            other => ProviderError::bad_request(format!("Entry {}: {}", index, other)),
        })?;

        let signer = match entry.signers.as_deref() {
            None => Some(transaction.sender()),
            Some([]) => None,
            Some([signer]) => {
                if !validate_address(signer) {
                    return Err(ProviderError::bad_request(format!(
                        "Entry {}: invalid signer {}",
                        index, signer
                    )));
                }
                Some(signer.clone())
            }
            Some(_) => {
                return Err(ProviderError::bad_request(format!(
                    "Entry {}: multisig is not supported",
                    index
                )))
            }
        };
        prepared.push(PreparedTransaction {
            bytes,
            transaction,
            signer,
            message: entry.message,
        });
    }

    if prepared.iter().all(|p| p.signer.is_none()) {
        return Err(ProviderError::bad_request("Every transaction is marked as skipped"));
    }
    let genesis_hash = prepared[0].transaction.header.genesis_hash;
    if prepared
        .iter()
        .any(|p| p.transaction.header.genesis_hash != genesis_hash)
    {
        return Err(ProviderError::bad_request(
            "Transactions belong to different networks",
        ));
    }

    Ok(prepared)
}

fn summarize(entry: &PreparedTransaction) -> TransactionSummary {
    TransactionSummary {
        id: crate::transaction::transaction_id(&entry.bytes),
        tx_type: entry.transaction.tx_type(),
        sender: entry.transaction.sender(),
        message: entry.message.clone(),
        skipped: entry.signer.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::provider::bridge::ProviderBridge;
    use crate::provider::messages::WalletTransaction;
    use crate::provider::transport::ChannelTransport;
    use crate::storage::MemoryStorage;
    use crate::transaction::tests::{test_header, test_key};
    use crate::transaction::TransactionKind;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    const ORIGIN: &str = "https://dapp.example";

    /// Answers every prompt the same way and counts them
    struct FixedPrompt {
        approve: bool,
        calls: Cell<usize>,
    }

    impl FixedPrompt {
        fn new(approve: bool) -> Self {
            FixedPrompt {
                approve,
                calls: Cell::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl ApprovalPrompt for FixedPrompt {
        async fn request_approval(&self, _request: &ApprovalRequest) -> bool {
            self.calls.set(self.calls.get() + 1);
            self.approve
        }
    }

    /// Holds the first prompt open until a second one arrives
    struct ReversingPrompt {
        release: RefCell<Option<oneshot::Sender<()>>>,
        wait: RefCell<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait(?Send)]
    impl ApprovalPrompt for ReversingPrompt {
        async fn request_approval(&self, _request: &ApprovalRequest) -> bool {
            let wait = self.wait.borrow_mut().take();
            match wait {
                Some(wait) => {
                    let _ = wait.await;
                }
                None => {
                    if let Some(release) = self.release.borrow_mut().take() {
                        let _ = release.send(());
                    }
                }
            }
            true
        }
    }

    /// Approves once `open` fires
    struct GatedPrompt {
        open: RefCell<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait(?Send)]
    impl ApprovalPrompt for GatedPrompt {
        async fn request_approval(&self, _request: &ApprovalRequest) -> bool {
            let open = self.open.borrow_mut().take();
            if let Some(open) = open {
                let _ = open.await;
            }
            true
        }
    }

    fn authority<P: ApprovalPrompt>(
        prompt: P,
        policy: SigningPolicy,
    ) -> SigningAuthority<MemoryStorage, MemoryKeyring, P> {
        let authority = SigningAuthority::new(MemoryStorage::new(), MemoryKeyring::new(), prompt, policy);
        authority.add_account("a1", Some("Main".to_string()), test_key()).unwrap();
        authority
    }

    fn sender() -> [u8; 32] {
        test_key().verifying_key().to_bytes()
    }

    fn txn_for(sender: [u8; 32], asset_id: u64) -> String {
        let tx = UnsignedTransaction {
            header: test_header(sender),
            kind: TransactionKind::AssetTransfer {
                asset_id,
                amount: 0,
                receiver: sender,
                close_to: None,
            },
        };
        BASE64.encode(tx.encode().unwrap())
    }

    fn request(asset_ids: &[u64]) -> SignRequest {
        SignRequest {
            txns: asset_ids
                .iter()
                .map(|id| WalletTransaction::new(txn_for(sender(), *id)))
                .collect(),
        }
    }

    fn decode_stxn(stxn: &str) -> SignedTransaction {
        SignedTransaction::decode(&BASE64.decode(stxn).unwrap()).unwrap()
    }

    fn asset_of(stxn: &str) -> u64 {
        match decode_stxn(stxn).transaction().kind {
            TransactionKind::AssetTransfer { asset_id, .. } => asset_id,
            _ => panic!("Expected AssetTransfer"),
        }
    }

    fn rejected_kind(outcome: SignOutcome) -> Option<ProviderErrorKind> {
        outcome.into_result().unwrap_err().kind()
    }

    #[test]
    fn test_unknown_origin_approved() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1, 2, 3])));

        let result = outcome.into_result().unwrap();
        assert_eq!(result.stxns.len(), 3);
        for (stxn, asset_id) in result.stxns.iter().zip([1, 2, 3]) {
            let stxn = stxn.as_deref().unwrap();
            assert!(decode_stxn(stxn).verify());
            assert_eq!(asset_of(stxn), asset_id);
        }
        assert_eq!(authority.prompt.calls.get(), 1);

        let sessions = authority.sessions().get_by_origin(ORIGIN).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].authorized_addresses,
            vec![encode_address(&sender()).unwrap()]
        );
        assert_eq!(authority.state(&"r1".into()), SignState::Idle);
    }

    #[test]
    fn test_known_origin_skips_prompt_when_allowed() {
        let policy = SigningPolicy {
            prompt_unknown_origins: true,
            confirm_known_origins: false,
        };
        let authority = authority(FixedPrompt::new(true), policy);
        block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])))
            .into_result()
            .unwrap();
        block_on(authority.handle_sign_request("r2".into(), ORIGIN, request(&[2])))
            .into_result()
            .unwrap();

        // Only the connecting request prompted
        assert_eq!(authority.prompt.calls.get(), 1);
        assert_eq!(authority.sessions().get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_known_origin_confirms_by_default() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        for id in ["r1", "r2"] {
            block_on(authority.handle_sign_request(id.into(), ORIGIN, request(&[1])))
                .into_result()
                .unwrap();
        }
        assert_eq!(authority.prompt.calls.get(), 2);
    }

    #[test]
    fn test_unknown_origin_without_prompting() {
        let policy = SigningPolicy {
            prompt_unknown_origins: false,
            confirm_known_origins: true,
        };
        let authority = authority(FixedPrompt::new(true), policy);
        let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])));
        assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::UserRejected));
        assert_eq!(authority.prompt.calls.get(), 0);
    }

    #[test]
    fn test_declined() {
        let authority = authority(FixedPrompt::new(false), SigningPolicy::default());
        let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])));
        assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::UserRejected));
        assert!(authority.sessions().get_all().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_request_never_prompts() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        let cases = vec![
            SignRequest { txns: vec![] },
            SignRequest {
                txns: vec![WalletTransaction::new("!!not base64!!")],
            },
            SignRequest {
                txns: vec![WalletTransaction::new(BASE64.encode([0xc0]))],
            },
            SignRequest {
                txns: vec![WalletTransaction {
                    txn: txn_for(sender(), 1),
                    signers: Some(vec!["bogus".to_string()]),
                    message: None,
                }],
            },
            SignRequest {
                txns: vec![WalletTransaction {
                    txn: txn_for(sender(), 1),
                    signers: Some(vec![]),
                    message: None,
                }],
            },
        ];

        for request in cases {
            let outcome = block_on(authority.handle_sign_request("bad".into(), ORIGIN, request));
            assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::BadRequest));
        }
        assert_eq!(authority.prompt.calls.get(), 0);
    }

    #[test]
    fn test_missing_key() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        let request = SignRequest {
            txns: vec![WalletTransaction::new(txn_for([8u8; 32], 1))],
        };
        let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request));
        assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::KeyNotFound));
        assert_eq!(authority.prompt.calls.get(), 0);
    }

    #[test]
    fn test_skipped_entry_is_null() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        let mut request = request(&[1, 2]);
        request.txns[0].signers = Some(vec![]);

        let result = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request))
            .into_result()
            .unwrap();
        assert!(result.stxns[0].is_none());
        assert_eq!(asset_of(result.stxns[1].as_deref().unwrap()), 2);
    }

    #[test]
    fn test_awaiting_approval_state() {
        let (open, gate) = oneshot::channel();
        let prompt = GatedPrompt {
            open: RefCell::new(Some(gate)),
        };
        let authority = authority(prompt, SigningPolicy::default());
        let id = CorrelationId::from("r1");

        let (observer, observed) = (&authority, &id);
        let check = async move {
            assert_eq!(observer.state(observed), SignState::AwaitingUserApproval);
            open.send(()).unwrap();
        };
        let (outcome, ()) = block_on(futures::future::join(
            authority.handle_sign_request(id.clone(), ORIGIN, request(&[1])),
            check,
        ));

        assert!(outcome.into_result().is_ok());
        assert_eq!(authority.state(&id), SignState::Idle);
    }

    #[test]
    fn test_concurrent_requests_not_swapped() {
        let (release, wait) = oneshot::channel();
        let prompt = ReversingPrompt {
            release: RefCell::new(Some(release)),
            wait: RefCell::new(Some(wait)),
        };
        let authority = authority(prompt, SigningPolicy::default());

        let (to_authority, requests) = ChannelTransport::new();
        let (to_bridge, mut responses) = ChannelTransport::new();
        let bridge = ProviderBridge::new(to_authority, ORIGIN, Duration::from_secs(30));

        let client = futures::future::join(
            bridge.sign_txns(request(&[11, 12])),
            bridge.sign_txns(request(&[21])),
        );
        let server = authority.serve(requests, &to_bridge);
        let router = async {
            while let Some(message) = responses.next().await {
                bridge.handle_message(message);
            }
        };

        let background = futures::future::join(server, router);
        let (first, second) = match block_on(futures::future::select(
            Box::pin(client),
            Box::pin(background),
        )) {
            futures::future::Either::Left((results, _)) => results,
            futures::future::Either::Right(_) => panic!("Server stopped first"),
        };

        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.stxns.len(), 2);
        assert_eq!(second.stxns.len(), 1);
        assert_eq!(asset_of(first.stxns[0].as_deref().unwrap()), 11);
        assert_eq!(asset_of(first.stxns[1].as_deref().unwrap()), 12);
        assert_eq!(asset_of(second.stxns[0].as_deref().unwrap()), 21);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_remove_account_revokes_sessions() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])))
            .into_result()
            .unwrap();

        let (transport, mut events) = ChannelTransport::new();
        let revoked = block_on(authority.remove_account("a1", &transport)).unwrap();
        assert_eq!(revoked.len(), 1);
        assert!(authority.sessions().get_all().unwrap().is_empty());
        assert!(authority.accounts().get_all().unwrap().is_empty());

        match block_on(events.next()) {
            Some(BridgeMessage::Event(event)) => {
                assert!(matches!(event.event, EventKind::SessionRevoked { .. }))
            }
            other => panic!("Expected revocation event, got {:?}", other),
        }
    }

    #[test]
    fn test_removed_account_cannot_sign() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        let (transport, _events) = ChannelTransport::new();
        block_on(authority.remove_account("a1", &transport)).unwrap();
        assert!(!authority
            .keyring()
            .contains(&encode_address(&sender()).unwrap()));

        let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])));
        assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::KeyNotFound));
        assert_eq!(authority.prompt.calls.get(), 0);
    }

    #[test]
    fn test_shared_key_survives_other_account_removal() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        authority.add_account("a1-copy", None, test_key()).unwrap();
        let (transport, _events) = ChannelTransport::new();
        block_on(authority.remove_account("a1-copy", &transport)).unwrap();

        block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])))
            .into_result()
            .unwrap();
    }

    #[test]
    fn test_account_removed_while_awaiting_approval() {
        let (open, gate) = oneshot::channel();
        let prompt = GatedPrompt {
            open: RefCell::new(Some(gate)),
        };
        let authority = authority(prompt, SigningPolicy::default());
        let (transport, _events) = ChannelTransport::new();
        let id = CorrelationId::from("r1");

        let (remover, observed, transport_ref) = (&authority, &id, &transport);
        let remove = async move {
            assert_eq!(remover.state(observed), SignState::AwaitingUserApproval);
            remover.remove_account("a1", transport_ref).await.unwrap();
            open.send(()).unwrap();
        };
        let (outcome, ()) = block_on(futures::future::join(
            authority.handle_sign_request(id.clone(), ORIGIN, request(&[1])),
            remove,
        ));

        assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::KeyNotFound));
        assert!(authority.sessions().get_all().unwrap().is_empty());
        assert_eq!(authority.state(&id), SignState::Idle);
    }

    #[test]
    fn test_concurrent_connects_share_session() {
        let (release, wait) = oneshot::channel();
        let prompt = ReversingPrompt {
            release: RefCell::new(Some(release)),
            wait: RefCell::new(Some(wait)),
        };
        let authority = authority(prompt, SigningPolicy::default());
        let second_key = SigningKey::from_bytes(&[3u8; 32]);
        let second = authority
            .add_account("a2", None, second_key)
            .unwrap()
            .address()
            .unwrap();

        let mut by_second = request(&[2]);
        by_second.txns[0].signers = Some(vec![second.clone()]);

        let (first, other) = block_on(futures::future::join(
            authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])),
            authority.handle_sign_request("r2".into(), ORIGIN, by_second),
        ));
        first.into_result().unwrap();
        other.into_result().unwrap();

        let sessions = authority.sessions().get_by_origin(ORIGIN).unwrap();
        assert_eq!(sessions.len(), 1);
        let mut authorized = sessions[0].authorized_addresses.clone();
        authorized.sort();
        let mut expected = vec![encode_address(&sender()).unwrap(), second];
        expected.sort();
        assert_eq!(authorized, expected);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_one_answer_per_entry(skips in proptest::collection::vec(any::<bool>(), 1..=16)) {
            let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
            let asset_ids: Vec<u64> = (1..=skips.len() as u64).collect();
            let mut request = request(&asset_ids);
            for (entry, skip) in request.txns.iter_mut().zip(&skips) {
                if *skip {
                    entry.signers = Some(vec![]);
                }
            }

            let outcome = block_on(authority.handle_sign_request("r1".into(), ORIGIN, request));
            if skips.iter().all(|skip| *skip) {
                prop_assert_eq!(rejected_kind(outcome), Some(ProviderErrorKind::BadRequest));
            } else {
                let result = outcome.into_result().unwrap();
                prop_assert_eq!(result.stxns.len(), skips.len());
                for ((stxn, skip), asset_id) in result.stxns.iter().zip(&skips).zip(&asset_ids) {
                    match stxn {
                        Some(stxn) => {
                            prop_assert!(!*skip);
                            prop_assert_eq!(asset_of(stxn), *asset_id);
                        }
                        None => prop_assert!(*skip),
                    }
                }
            }
        }
    }

    #[test]
    fn test_revoke_session() {
        let authority = authority(FixedPrompt::new(true), SigningPolicy::default());
        block_on(authority.handle_sign_request("r1".into(), ORIGIN, request(&[1])))
            .into_result()
            .unwrap();
        let session_id = authority.sessions().get_all().unwrap()[0].id.clone();

        let (transport, _events) = ChannelTransport::new();
        assert!(block_on(authority.revoke_session(&session_id, &transport)).unwrap());
        assert!(!block_on(authority.revoke_session(&session_id, &transport)).unwrap());
    }
}
