use async_trait::async_trait;
use bytes::Bytes;
use libvfsftp::Session;
use libvfsftp::auth::PasswdAuthenticator;
use libvfsftp::storage::Error;
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;
use vfsftp_sbe_kv::{KvStorage, KvStore, MemoryKvStore};

/// Counts every command sent to the in-memory store.
#[derive(Debug, Default)]
struct Counting {
    inner: MemoryKvStore,
    calls: AtomicUsize,
}

impl Counting {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for Counting {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, Error> {
        self.count();
        self.inner.get(key).await
    }

    async fn strlen(&self, key: &str) -> Result<Option<u64>, Error> {
        self.count();
        self.inner.strlen(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), Error> {
        self.count();
        self.inner.set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<bool, Error> {
        self.count();
        self.inner.del(key).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        self.count();
        self.inner.rename(from, to).await
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, Error> {
        self.count();
        self.inner.scan(prefix).await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        self.count();
        self.inner.smembers(key).await
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error> {
        self.count();
        self.inner.sismember(key, member).await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, Error> {
        self.count();
        self.inner.sadd(key, member).await
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, Error> {
        self.count();
        self.inner.srem(key, member).await
    }
}

async fn setup() -> (Arc<Counting>, Session<KvStorage>) {
    let store = Arc::new(Counting::default());
    store.inner.set("passwd", Bytes::from_static(b"alice,secret,N\nroot,toor,Y\n")).await.unwrap();
    let storage = Arc::new(KvStorage::new(store.clone()));
    let authenticator = Arc::new(PasswdAuthenticator::new(storage.clone()));
    let session = Session::new(storage, authenticator).logger(slog::Logger::root(slog::Discard, slog::o!()));
    (store, session)
}

async fn read(session: &Session<KvStorage>, path: &str) -> Option<String> {
    let mut content = String::new();
    session.get_file(path).await?.read_to_string(&mut content).await.ok()?;
    Some(content)
}

fn names(entries: &[libvfsftp::storage::DirEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn unauthenticated_sessions_never_reach_the_store() {
    let (store, session) = setup().await;
    assert!(!session.change_dir("/").await);
    assert!(session.dir_contents("/").await.is_empty());
    assert_eq!(session.bytes("/a").await, None);
    assert!(session.get_file("/a").await.is_none());
    assert_eq!(session.put_file("/a", Cursor::new(b"x".to_vec())).await, None);
    assert!(!session.delete_file("/a").await);
    assert!(!session.delete_dir("/d").await);
    assert!(!session.rename("/a", "/b").await);
    assert!(!session.make_dir("/d").await);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn a_full_round_trip() {
    let (_, mut session) = setup().await;
    assert!(session.authenticate("alice", "secret").await);

    assert!(session.make_dir("/docs").await);
    assert_eq!(session.put_file("/docs/a.txt", Cursor::new(b"hello".to_vec())).await, Some(5));
    assert_eq!(names(&session.dir_contents("/docs").await), vec![".", "..", "a.txt"]);
    assert_eq!(session.bytes("/docs/a.txt").await, Some(5));

    assert!(session.rename("/docs/a.txt", "/docs/b.txt").await);
    assert_eq!(read(&session, "/docs/a.txt").await, None);
    assert_eq!(read(&session, "/docs/b.txt").await.as_deref(), Some("hello"));

    assert!(session.delete_file("/docs/b.txt").await);
    assert!(!session.delete_file("/docs/b.txt").await);
    assert!(session.delete_dir("/docs").await);
    assert!(!session.change_dir("/docs").await);
    assert_eq!(names(&session.dir_contents("/").await), vec![".", ".."]);
}

#[tokio::test]
async fn rejected_paths_skip_the_store() {
    let (store, mut session) = setup().await;
    assert!(session.authenticate("alice", "secret").await);
    let before = store.calls();

    assert!(session.dir_contents("/../bob").await.is_empty());
    assert!(!session.change_dir("/a/../../bob").await);
    assert!(session.get_file("/..").await.is_none());
    assert_eq!(store.calls(), before);
}

#[tokio::test]
async fn administrators_see_every_home() {
    let (_, mut session) = setup().await;
    assert!(session.authenticate("alice", "secret").await);
    assert!(session.put_file("/a.txt", Cursor::new(b"1".to_vec())).await.is_some());

    assert!(session.authenticate("root", "toor").await);
    assert!(session.user().is_some_and(|u| u.is_admin()));
    assert_eq!(names(&session.dir_contents("/").await), vec![".", "..", "alice"]);
    assert_eq!(read(&session, "/alice/a.txt").await.as_deref(), Some("1"));
}
