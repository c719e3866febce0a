use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, broadcast};

use crate::{
    checkout::{CheckoutSession, CheckoutState},
    error::{AppError, AppResult},
};

use super::{Cart, CartEvent, CartStorage, CartStore, store::load_cart};

const MAX_KEY_LEN: usize = 64;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Cart keys double as storage keys and file names, so they are limited to
/// `[A-Za-z0-9_-]{1,64}`.
pub fn validate_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "cart key must be 1-64 characters of [A-Za-z0-9_-]".to_string(),
        ))
    }
}

/// Per-visitor state: the cart plus the checkout form state machine.
pub struct CartSession<S> {
    pub store: CartStore<S>,
    pub checkout: CheckoutSession,
    ended: bool,
}

impl<S> CartSession<S> {
    pub fn new(store: CartStore<S>) -> Self {
        Self {
            store,
            checkout: CheckoutSession::default(),
            ended: false,
        }
    }

    /// Set once the registry has dropped this session. A later request for
    /// the same key gets a fresh session, so this one must not be written to.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

struct SessionEntry<S> {
    session: Arc<Mutex<CartSession<S>>>,
    touched_ms: AtomicU64,
}

/// Live cart sessions keyed by cart key.
///
/// A session is opened (and its snapshot loaded) on first mutation and lives
/// until [`CartRegistry::end_session`] or until it sits idle longer than the
/// idle timeout. Idle sessions are swept whenever a new one is opened; a
/// session with a checkout in flight is never dropped. All access to one cart
/// goes through its mutex, so each cart has a single writer.
pub struct CartRegistry<S> {
    storage: S,
    sessions: RwLock<HashMap<String, SessionEntry<S>>>,
    idle_timeout: Duration,
    started: Instant,
}

impl<S> CartRegistry<S>
where
    S: CartStorage + Clone + 'static,
{
    pub fn new(storage: S) -> Self {
        Self::with_idle_timeout(storage, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(storage: S, idle_timeout: Duration) -> Self {
        Self {
            storage,
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            started: Instant::now(),
        }
    }

    pub async fn session(&self, key: &str) -> AppResult<Arc<Mutex<CartSession<S>>>> {
        validate_key(key)?;
        if let Some(entry) = self.sessions.read().await.get(key) {
            entry.touched_ms.store(self.now_ms(), Ordering::Relaxed);
            return Ok(entry.session.clone());
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(key) {
            entry.touched_ms.store(self.now_ms(), Ordering::Relaxed);
            return Ok(entry.session.clone());
        }

        self.evict_idle(&mut sessions);

        let store = CartStore::open(key, self.storage.clone()).await?;
        spawn_event_logger(store.subscribe());
        let session = Arc::new(Mutex::new(CartSession::new(store)));
        sessions.insert(
            key.to_string(),
            SessionEntry {
                session: session.clone(),
                touched_ms: AtomicU64::new(self.now_ms()),
            },
        );
        tracing::info!(cart_key = %key, active = sessions.len(), "cart session started");
        Ok(session)
    }

    /// Lock the live session for `key`, opening it if needed. Retries when the
    /// session it found was ended before the lock was acquired.
    pub async fn lock(&self, key: &str) -> AppResult<OwnedMutexGuard<CartSession<S>>> {
        loop {
            let guard = self.session(key).await?.lock_owned().await;
            if !guard.is_ended() {
                return Ok(guard);
            }
        }
    }

    /// Current cart and checkout state without registering a session: a live
    /// session is read in place, otherwise the snapshot is loaded.
    pub async fn peek(&self, key: &str) -> AppResult<(Cart, CheckoutState)> {
        validate_key(key)?;
        let live = self
            .sessions
            .read()
            .await
            .get(key)
            .map(|entry| entry.session.clone());
        if let Some(session) = live {
            let session = session.lock().await;
            if !session.is_ended() {
                return Ok((session.store.cart().clone(), session.checkout.state()));
            }
        }
        let cart = load_cart(&self.storage, key).await?;
        Ok((cart, CheckoutState::Idle))
    }

    /// Drop the in-memory session. The durable snapshot is kept, so the next
    /// access reloads it. Refused while the session's checkout is in flight.
    pub async fn end_session(&self, key: &str) -> AppResult<bool> {
        validate_key(key)?;
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get(key).map(|entry| entry.session.clone()) else {
            return Ok(false);
        };

        let mut session = session.lock().await;
        if session.checkout.is_busy() {
            return Err(AppError::Conflict(
                "checkout in progress, session cannot be ended".to_string(),
            ));
        }
        session.ended = true;
        sessions.remove(key);
        tracing::info!(cart_key = %key, "cart session ended");
        Ok(true)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry<S>>) {
        let now = self.now_ms();
        let timeout = self.idle_timeout.as_millis() as u64;
        sessions.retain(|key, entry| {
            let idle = now.saturating_sub(entry.touched_ms.load(Ordering::Relaxed));
            if idle < timeout {
                return true;
            }
            // a held lock means the session is in use right now
            let Ok(mut session) = entry.session.try_lock() else {
                return true;
            };
            if session.checkout.is_busy() {
                return true;
            }
            session.ended = true;
            tracing::debug!(cart_key = %key, idle_ms = idle, "evicting idle cart session");
            false
        });
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

fn spawn_event_logger(mut events: broadcast::Receiver<CartEvent>) {
    // ends once the session, and with it the sender, is dropped
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(
                    cart_key = %event.key,
                    total = event.cart_total,
                    count = event.cart_count,
                    notice = ?event.notice.as_ref().map(|n| n.message.as_str()),
                    "cart event"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "cart event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
