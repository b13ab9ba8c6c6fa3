//! Editor identity.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::UserRecord;
use crate::StoreResult;

/// Email sign-in with one-time codes.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in editor, if any.
    fn current_user(&self) -> Option<UserRecord>;

    /// Send a sign-in code to `email`, replacing any code sent before.
    fn send_code(&self, email: &str) -> StoreResult<()>;

    /// Exchange a code for a session.
    fn sign_in_with_code(&self, email: &str, code: &str) -> StoreResult<UserRecord>;

    fn sign_out(&self);
}

/// A sign-in code on its way to an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDelivery {
    pub email: String,
    pub code: String,
}

#[derive(Default)]
struct IdentityState {
    pending: HashMap<String, String>,
    users: HashMap<String, UserRecord>,
    current: Option<UserRecord>,
}

/// Identity provider kept in memory.
///
/// Codes are delivered over a channel instead of by mail.
pub struct InMemoryIdentity {
    state: RwLock<IdentityState>,
    outbox: Sender<CodeDelivery>,
}

impl InMemoryIdentity {
    /// Create a provider and the receiving end of its code outbox.
    pub fn new() -> (Self, Receiver<CodeDelivery>) {
        let (outbox, deliveries) = crossbeam_channel::unbounded();
        let provider = Self {
            state: RwLock::new(IdentityState::default()),
            outbox,
        };
        (provider, deliveries)
    }
}

fn normalize_email(email: &str) -> StoreResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(StoreError::InvalidEmail(email));
    }
    Ok(email)
}

fn generate_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{:06}", value % 1_000_000)
}

impl IdentityProvider for InMemoryIdentity {
    fn current_user(&self) -> Option<UserRecord> {
        self.state.read().current.clone()
    }

    #[instrument(name = "send_code", skip(self))]
    fn send_code(&self, email: &str) -> StoreResult<()> {
        let email = normalize_email(email)?;
        let code = generate_code();
        self.state.write().pending.insert(email.clone(), code.clone());

        if self.outbox.send(CodeDelivery { email, code }).is_err() {
            warn!("Code outbox closed");
        }
        Ok(())
    }

    #[instrument(name = "sign_in", skip(self, code))]
    fn sign_in_with_code(&self, email: &str, code: &str) -> StoreResult<UserRecord> {
        let email = normalize_email(email)?;
        let mut state = self.state.write();

        let expected = state
            .pending
            .get(&email)
            .ok_or_else(|| StoreError::NoPendingCode(email.clone()))?;
        if expected != code.trim() {
            return Err(StoreError::InvalidCode);
        }
        state.pending.remove(&email);

        let user = state
            .users
            .entry(email.clone())
            .or_insert_with(|| UserRecord {
                id: Uuid::new_v4(),
                email: email.clone(),
            })
            .clone();
        state.current = Some(user.clone());

        info!(user = %user.id, "Signed in");
        Ok(user)
    }

    fn sign_out(&self) {
        if let Some(user) = self.state.write().current.take() {
            info!(user = %user.id, "Signed out");
        }
    }
}
