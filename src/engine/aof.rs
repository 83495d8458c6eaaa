use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    thread,
    time::Duration,
};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{EventRecord, EventStore, NewEventRecord, StoreTransaction};
use crate::error::{StoreError, StoreResult};

/// Первая строка журнала: идентификатор формата.
const MAGIC: &str = "TOPICBUS-AOF1";

/// Как часто вызывать fsync для журнала.
///
/// Сам `write` выполняется при каждом commit без промежуточного буфера, так
/// что политика влияет только на то, когда данные дойдут до диска.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// fsync после каждого commit.
    Always,
    /// fsync раз в секунду фоновым потоком.
    #[default]
    EverySec,
    /// fsync оставлен операционной системе.
    No,
}

/// Файл, в который дописываются записи журнала.
trait LogFile: Write {
    fn truncate(
        &mut self,
        len: u64,
    ) -> io::Result<()>;

    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate(
        &mut self,
        len: u64,
    ) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Неудачная дозапись.
#[derive(Debug)]
struct AppendError {
    source: io::Error,
    /// Удалось ли обрезать файл до зафиксированной длины.
    rolled_back: bool,
}

/// Дописывает `buf` целиком (и синхронизирует при `sync`) либо обрезает
/// файл обратно до `committed_len`. Возвращает новую зафиксированную длину.
fn append_or_rollback<F: LogFile>(
    file: &mut F,
    committed_len: u64,
    buf: &[u8],
    sync: bool,
) -> Result<u64, AppendError> {
    let written = file
        .write_all(buf)
        .and_then(|()| file.flush())
        .and_then(|()| if sync { file.sync() } else { Ok(()) });

    match written {
        Ok(()) => Ok(committed_len + buf.len() as u64),
        Err(source) => {
            let rolled_back = file.truncate(committed_len).is_ok();
            Err(AppendError {
                source,
                rolled_back,
            })
        }
    }
}

struct LogWriter {
    file: File,
    /// Длина файла после последнего успешного commit.
    committed_len: u64,
    /// Откат не удался, хвост файла неизвестен: новые commit'ы запрещены.
    poisoned: bool,
}

struct AofShared {
    path: PathBuf,
    policy: SyncPolicy,
    writer: Mutex<LogWriter>,
    records: RwLock<Vec<EventRecord>>,
    next_id: AtomicU64,
}

/// Хранилище событий в append-only файле.
///
/// Формат: строка-заголовок [`MAGIC`], затем по одной JSON-записи
/// [`EventRecord`] на строку. При открытии журнал воспроизводится целиком,
/// записи держатся в памяти для `list_all`.
#[derive(Clone)]
pub struct AofEventStore {
    shared: Arc<AofShared>,
}

impl AofEventStore {
    /// Открывает (или создаёт) журнал и воспроизводит существующие записи.
    pub fn open<P: AsRef<Path>>(
        path: P,
        policy: SyncPolicy,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = Self::replay(&path)?;
        // Транзакции фиксируются в любом порядке, так что id в файле не
        // обязательно возрастают.
        let next_id = records.iter().map(|r| r.id).max().map_or(1, |id| id + 1);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{MAGIC}")?;
            file.sync_data()?;
        }
        let committed_len = file.metadata()?.len();

        debug!(
            path = %path.display(),
            records = records.len(),
            ?policy,
            "event log opened"
        );

        let shared = Arc::new(AofShared {
            path,
            policy,
            writer: Mutex::new(LogWriter {
                file,
                committed_len,
                poisoned: false,
            }),
            records: RwLock::new(records),
            next_id: AtomicU64::new(next_id),
        });

        if policy == SyncPolicy::EverySec {
            spawn_flusher(Arc::downgrade(&shared))?;
        }

        Ok(Self { shared })
    }

    /// Читает все записи журнала. Несуществующий или пустой файл даёт пустой
    /// список.
    fn replay(path: &Path) -> StoreResult<Vec<EventRecord>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records: Vec<EventRecord> = Vec::new();
        let mut lines = BufReader::new(file).lines();

        match lines.next().transpose()? {
            None => return Ok(records),
            Some(header) if header == MAGIC => {}
            Some(_) => {
                return Err(StoreError::Corrupted {
                    location: format!("{}:1", path.display()),
                    reason: "invalid event log header".to_string(),
                })
            }
        }

        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: EventRecord =
                serde_json::from_str(&line).map_err(|e| StoreError::Corrupted {
                    location: format!("{}:{}", path.display(), idx + 2),
                    reason: e.to_string(),
                })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Синхронизирует файл с диском.
    pub fn sync(&self) -> StoreResult<()> {
        let writer = self.shared.writer.lock();
        if writer.poisoned {
            return Err(StoreError::Closed);
        }
        writer.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn policy(&self) -> SyncPolicy {
        self.shared.policy
    }
}

impl std::fmt::Debug for AofEventStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("AofEventStore")
            .field("path", &self.shared.path)
            .field("policy", &self.shared.policy)
            .finish_non_exhaustive()
    }
}

fn spawn_flusher(weak: Weak<AofShared>) -> StoreResult<()> {
    thread::Builder::new()
        .name("topicbus-aof-flush".to_string())
        .spawn(move || loop {
            thread::sleep(Duration::from_secs(1));
            let Some(shared) = weak.upgrade() else {
                break;
            };
            let synced = shared.writer.lock().file.sync_data();
            if let Err(err) = synced {
                warn!(path = %shared.path.display(), error = %err, "event log fsync failed");
            }
        })?;
    Ok(())
}

impl EventStore for AofEventStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(AofTransaction {
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
        }))
    }

    fn list_all(&self) -> StoreResult<Vec<EventRecord>> {
        Ok(self.shared.records.read().clone())
    }

    fn kind(&self) -> &'static str {
        "aof"
    }
}

struct AofTransaction {
    shared: Arc<AofShared>,
    pending: Vec<EventRecord>,
}

impl StoreTransaction for AofTransaction {
    fn insert(
        &mut self,
        record: NewEventRecord,
    ) -> StoreResult<EventRecord> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let record = record.with_id(id);
        self.pending.push(record.clone());
        Ok(record)
    }

    /// Все записи транзакции уходят в файл одним `write_all`.
    fn commit(self: Box<Self>) -> StoreResult<()> {
        let AofTransaction { shared, pending } = *self;
        if pending.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in &pending {
            let line = serde_json::to_string(record).map_err(|e| StoreError::Encode {
                reason: e.to_string(),
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }

        // Запись и обновление кеша под одной блокировкой writer'а, чтобы
        // порядок в файле совпадал с порядком в `list_all`.
        let mut writer = shared.writer.lock();
        if writer.poisoned {
            return Err(StoreError::Closed);
        }

        let sync = shared.policy == SyncPolicy::Always;
        let committed_len = writer.committed_len;
        match append_or_rollback(&mut writer.file, committed_len, buf.as_bytes(), sync) {
            Ok(len) => writer.committed_len = len,
            Err(AppendError {
                source,
                rolled_back,
            }) => {
                if !rolled_back {
                    writer.poisoned = true;
                    error!(
                        path = %shared.path.display(),
                        error = %source,
                        "event log rollback failed, store closed"
                    );
                }
                return Err(source.into());
            }
        }

        shared.records.write().extend(pending);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::engine::use_transaction;

    fn insert(
        store: &AofEventStore,
        topics: &[&str],
    ) -> Vec<EventRecord> {
        use_transaction(store, |tx| {
            topics
                .iter()
                .map(|t| tx.insert(NewEventRecord::new(*t, "\"v\"", Utc::now())))
                .collect()
        })
        .unwrap()
    }

    fn run_append_replay(policy: SyncPolicy) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");

        let written = {
            let store = AofEventStore::open(&path, policy).unwrap();
            let mut written = insert(&store, &["a:create"]);
            written.extend(insert(&store, &["a:update", "a:delete"]));
            store.sync().unwrap();
            written
        };

        let reopened = AofEventStore::open(&path, policy).unwrap();
        assert_eq!(reopened.list_all().unwrap(), written);

        let next = insert(&reopened, &["b:create"]);
        assert_eq!(next[0].id, 4);
    }

    #[test]
    fn test_always_policy() {
        run_append_replay(SyncPolicy::Always);
    }

    #[test]
    fn test_everysec_policy() {
        run_append_replay(SyncPolicy::EverySec);
    }

    #[test]
    fn test_no_policy() {
        run_append_replay(SyncPolicy::No);
    }

    #[test]
    fn test_always_policy_is_durable_without_sync() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");
        let store = AofEventStore::open(&path, SyncPolicy::Always).unwrap();
        insert(&store, &["a:create"]);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some(MAGIC));
        assert!(lines.next().unwrap().contains("\"topic\":\"a:create\""));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_uncommitted_transaction_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");
        let store = AofEventStore::open(&path, SyncPolicy::Always).unwrap();
        {
            let mut tx = store.begin().unwrap();
            tx.insert(NewEventRecord::new("a:create", "1", Utc::now()))
                .unwrap();
        }
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{MAGIC}\n"));
    }

    #[test]
    fn test_foreign_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");
        std::fs::write(&path, "AOF1\n{}\n").unwrap();

        let err = AofEventStore::open(&path, SyncPolicy::No).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }), "{err:?}");
    }

    #[test]
    fn test_garbage_line_is_reported_with_location() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");
        std::fs::write(&path, format!("{MAGIC}\nnot json\n")).unwrap();

        match AofEventStore::open(&path, SyncPolicy::No).unwrap_err() {
            StoreError::Corrupted { location, .. } => assert!(location.ends_with(":2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_policy_from_config_string() {
        let policy: SyncPolicy = serde_json::from_str("\"everysec\"").unwrap();
        assert_eq!(policy, SyncPolicy::EverySec);
        let policy: SyncPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(policy, SyncPolicy::Always);
    }
    /// Файл в памяти, который принимает не больше `accept` байт.
    #[derive(Default)]
    struct FlakyFile {
        data: Vec<u8>,
        accept: Option<usize>,
        fail_sync: bool,
        fail_truncate: bool,
    }

    impl Write for FlakyFile {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> io::Result<usize> {
            let room = match self.accept {
                Some(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full")),
                Some(room) => room.min(buf.len()),
                None => buf.len(),
            };
            self.data.extend_from_slice(&buf[..room]);
            if let Some(left) = self.accept.as_mut() {
                *left -= room;
            }
            Ok(room)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for FlakyFile {
        fn truncate(
            &mut self,
            len: u64,
        ) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::other("truncate failed"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::other("fsync failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_append_returns_new_length() {
        let mut file = FlakyFile {
            data: b"head\n".to_vec(),
            ..Default::default()
        };
        let len = append_or_rollback(&mut file, 5, b"line\n", true).unwrap();
        assert_eq!(len, 10);
        assert_eq!(file.data, b"head\nline\n");
    }

    #[test]
    fn test_partial_write_is_truncated() {
        let mut file = FlakyFile {
            data: b"head\n".to_vec(),
            accept: Some(3),
            ..Default::default()
        };
        let err = append_or_rollback(&mut file, 5, b"{\"id\":1}\n", false).unwrap_err();
        assert!(err.rolled_back);
        assert_eq!(err.source.kind(), io::ErrorKind::WriteZero);
        assert_eq!(file.data, b"head\n");
    }

    #[test]
    fn test_failed_sync_is_truncated() {
        let mut file = FlakyFile {
            fail_sync: true,
            ..Default::default()
        };
        let err = append_or_rollback(&mut file, 0, b"line\n", true).unwrap_err();
        assert!(err.rolled_back);
        assert!(file.data.is_empty());

        // Без fsync по политике ошибка sync не возникает.
        assert_eq!(append_or_rollback(&mut file, 0, b"line\n", false).unwrap(), 5);
    }

    #[test]
    fn test_failed_truncate_is_reported() {
        let mut file = FlakyFile {
            accept: Some(2),
            fail_truncate: true,
            ..Default::default()
        };
        let err = append_or_rollback(&mut file, 0, b"line\n", false).unwrap_err();
        assert!(!err.rolled_back);
    }

    #[test]
    fn test_failed_commit_closes_store_and_keeps_log_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.aof");
        let store = AofEventStore::open(&path, SyncPolicy::Always).unwrap();
        let kept = insert(&store, &["a:create"]);

        // Дескриптор только для чтения: и запись, и обрезка завершатся ошибкой.
        store.shared.writer.lock().file = File::open(&path).unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert(NewEventRecord::new("a:update", "2", Utc::now()))
            .unwrap();
        assert!(matches!(tx.commit(), Err(StoreError::Io { .. })));
        assert!(store.shared.writer.lock().poisoned);

        let mut tx = store.begin().unwrap();
        tx.insert(NewEventRecord::new("a:delete", "3", Utc::now()))
            .unwrap();
        assert!(matches!(tx.commit(), Err(StoreError::Closed)));
        assert!(matches!(store.sync(), Err(StoreError::Closed)));
        assert_eq!(store.list_all().unwrap(), kept);
        drop(store);

        let reopened = AofEventStore::open(&path, SyncPolicy::No).unwrap();
        assert_eq!(reopened.list_all().unwrap(), kept);
    }
}
