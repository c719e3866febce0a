use std::{collections::HashMap, future::Future, io, path::PathBuf, sync::Arc};

use tokio::{fs, sync::RwLock};

use crate::{db::DbPool, error::AppResult};

use super::{Cart, CartLine, registry::validate_key};

/// Key-value store for serialized cart snapshots.
///
/// Implementations only move opaque strings around; encoding lives in
/// [`encode_snapshot`] / [`decode_snapshot`] so the medium can be swapped
/// without touching cart logic. `save` replaces any previous value wholesale.
pub trait CartStorage: Send + Sync {
    fn load(&self, key: &str) -> impl Future<Output = AppResult<Option<String>>> + Send;

    fn save(&self, key: &str, snapshot: &str) -> impl Future<Output = AppResult<()>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = AppResult<()>> + Send;
}

pub fn encode_snapshot(cart: &Cart) -> AppResult<String> {
    Ok(serde_json::to_string(cart)?)
}

/// Decode a snapshot, dropping lines that violate cart invariants
/// (non-positive quantity, quantity above the ceiling, negative price,
/// duplicate product).
pub fn decode_snapshot(raw: &str) -> AppResult<Cart> {
    let lines: Vec<CartLine> = serde_json::from_str(raw)?;
    let mut cart = Cart::default();
    for line in lines {
        let valid = line.quantity >= 1
            && line.quantity <= line.stock_ceiling
            && line.unit_price >= 0
            && cart.line(line.product_id).is_none();
        if valid {
            cart.push(line);
        } else {
            tracing::warn!(product_id = %line.product_id, "dropping invalid line from cart snapshot");
        }
    }
    Ok(cart)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryCartStorage {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, snapshot: &str) -> AppResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), snapshot.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// One JSON file per cart under `dir`.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    dir: PathBuf,
}

impl FileCartStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CartStorage for FileCartStorage {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, key: &str, snapshot: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        // write then rename so readers never observe a half-written snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Snapshots in the `cart_snapshots` table.
#[derive(Debug, Clone)]
pub struct PgCartStorage {
    pool: DbPool,
}

impl PgCartStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartStorage for PgCartStorage {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM cart_snapshots WHERE cart_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(payload,)| payload))
    }

    async fn save(&self, key: &str, snapshot: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_snapshots (cart_key, payload, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (cart_key) DO UPDATE
            SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM cart_snapshots WHERE cart_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Storage selected at startup from configuration.
#[derive(Debug, Clone)]
pub enum CartBackend {
    Memory(MemoryCartStorage),
    File(FileCartStorage),
    Postgres(PgCartStorage),
}

impl CartStorage for CartBackend {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        match self {
            CartBackend::Memory(inner) => inner.load(key).await,
            CartBackend::File(inner) => inner.load(key).await,
            CartBackend::Postgres(inner) => inner.load(key).await,
        }
    }

    async fn save(&self, key: &str, snapshot: &str) -> AppResult<()> {
        match self {
            CartBackend::Memory(inner) => inner.save(key, snapshot).await,
            CartBackend::File(inner) => inner.save(key, snapshot).await,
            CartBackend::Postgres(inner) => inner.save(key, snapshot).await,
        }
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        match self {
            CartBackend::Memory(inner) => inner.remove(key).await,
            CartBackend::File(inner) => inner.remove(key).await,
            CartBackend::Postgres(inner) => inner.remove(key).await,
        }
    }
}
