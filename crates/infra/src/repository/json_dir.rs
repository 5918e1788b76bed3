//! File-per-record repository.
//!
//! Each record lives in `<dir>/<UUID>.json`. The whole directory is guarded by
//! one reader-writer lock: reads share it, every mutation takes it
//! exclusively, so a read never observes a half-applied update.
//!
//! Every write goes to a dot-prefixed temp file first. Updates rename it over
//! the record; creates hard-link it into place, which fails if the UUID is
//! taken and never leaves a partial `<UUID>.json` behind.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use roster_core::{Content, CreateRequest, IdUuid, Metadata, Record, UpdateRequest};

use super::{Repository, RepositoryError, RepositoryResult, resolve_uuid};

pub struct JsonDirRepository<C> {
    dir: PathBuf,
    lock: RwLock<()>,
    _content: PhantomData<fn() -> C>,
}

impl<C: Content> JsonDirRepository<C> {
    /// Open (creating if needed) the record directory.
    pub async fn open(dir: impl Into<PathBuf>) -> RepositoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create_dir", &dir, e))?;
        Ok(Self {
            dir,
            lock: RwLock::new(()),
            _content: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, uuid: &str) -> RepositoryResult<PathBuf> {
        // UUIDs become file names; refuse anything that could escape the directory.
        let safe = !uuid.is_empty()
            && uuid
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !safe {
            return Err(RepositoryError::NotFound(C::KIND));
        }
        Ok(self.dir.join(format!("{uuid}.json")))
    }

    async fn read_record(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let path = self.path_for(uuid)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound(C::KIND));
            }
            Err(e) => return Err(io_error("read", &path, e)),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| RepositoryError::storage(format!("decode {}: {e}", path.display())))
    }

    async fn read_all(&self) -> RepositoryResult<Vec<Record<C>>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error("read_dir", &self.dir, e))?;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("read_dir", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await.map_err(|e| io_error("read", &path, e))?;
            match serde_json::from_slice::<Record<C>>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping undecodable record file");
                }
            }
        }
        Ok(records)
    }

    async fn find_by<F>(&self, matches: F) -> RepositoryResult<Record<C>>
    where
        F: Fn(&Record<C>) -> bool + Send,
    {
        let _guard = self.lock.read().await;
        self.read_all()
            .await?
            .into_iter()
            .find(|record| matches(record))
            .ok_or(RepositoryError::NotFound(C::KIND))
    }

    fn tmp_path(&self, uuid: &str) -> PathBuf {
        self.dir.join(format!(".{uuid}.json.tmp"))
    }

    async fn write_tmp(&self, record: &Record<C>) -> RepositoryResult<PathBuf> {
        let tmp = self.tmp_path(&record.uuid);
        let bytes = encode(record)?;
        if let Err(e) = fs::write(&tmp, &bytes).await {
            discard(&tmp).await;
            return Err(io_error("write", &tmp, e));
        }
        Ok(tmp)
    }

    /// Replace the file contents via a temp file + rename.
    async fn write_record(&self, record: &Record<C>) -> RepositoryResult<()> {
        let path = self.path_for(&record.uuid)?;
        let tmp = self.write_tmp(record).await?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("rename", &path, e))
    }

    async fn modify<T, F>(&self, uuid: &str, apply: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut Record<C>) -> T + Send,
        T: Send,
    {
        let _guard = self.lock.write().await;
        let mut record = self.read_record(uuid).await?;
        let out = apply(&mut record);
        self.write_record(&record).await?;
        Ok(out)
    }
}

fn encode<C: Content>(record: &Record<C>) -> RepositoryResult<Vec<u8>> {
    serde_json::to_vec_pretty(record)
        .map_err(|e| RepositoryError::storage(format!("encode {}: {e}", record.uuid)))
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
        }
    }
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> RepositoryError {
    RepositoryError::storage(format!("{operation} {}: {err}", path.display()))
}

#[async_trait]
impl<C: Content> Repository<C> for JsonDirRepository<C> {
    async fn list_ids_and_uuids(&self) -> RepositoryResult<Vec<IdUuid>> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.iter().map(Record::id_uuid).collect())
    }

    async fn list(&self) -> RepositoryResult<Vec<Record<C>>> {
        let _guard = self.lock.read().await;
        self.read_all().await
    }

    async fn get(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let _guard = self.lock.read().await;
        self.read_record(uuid).await
    }

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.id == id).await
    }

    async fn get_by_name(&self, name: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.name() == name).await
    }

    async fn get_by_email(&self, email: &str) -> RepositoryResult<Record<C>> {
        self.find_by(|r| r.email() == email).await
    }

    async fn create(&self, request: CreateRequest<C>) -> RepositoryResult<Record<C>> {
        let uuid = resolve_uuid(&request.uuid)?;
        let record = request.into_record(uuid);
        let path = self.path_for(&record.uuid)?;

        let _guard = self.lock.write().await;
        let tmp = self.write_tmp(&record).await?;
        let linked = fs::hard_link(&tmp, &path).await;
        discard(&tmp).await;
        match linked {
            Ok(()) => Ok(record),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(RepositoryError::already_exists(
                C::KIND,
                format!("UUID {}", record.uuid),
            )),
            Err(e) => Err(io_error("link", &path, e)),
        }
    }

    async fn update(&self, uuid: &str, request: UpdateRequest<C>) -> RepositoryResult<Record<C>> {
        self.modify(uuid, move |record| {
            record.apply_update(&request);
            record.clone()
        })
        .await
    }

    async fn update_metadata(&self, uuid: &str, metadata: Metadata) -> RepositoryResult<Metadata> {
        self.modify(uuid, move |record| {
            record.metadata.merge(&metadata);
            record.metadata.clone()
        })
        .await
    }

    async fn update_content(&self, uuid: &str, content: C) -> RepositoryResult<C> {
        self.modify(uuid, move |record| {
            record.content.merge(&content);
            record.content.clone()
        })
        .await
    }

    async fn delete(&self, uuid: &str) -> RepositoryResult<Record<C>> {
        let _guard = self.lock.write().await;
        let record = self.read_record(uuid).await?;
        let path = self.path_for(uuid)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| io_error("remove", &path, e))?;
        Ok(record)
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        fs::metadata(&self.dir)
            .await
            .map(|_| ())
            .map_err(|e| io_error("stat", &self.dir, e))
    }
}
