//! Shared fixtures for Zettelkasten integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use groundwave_core::ZkConfig;
use groundwave_zk::test_fixtures::MemoryDirectory;
use groundwave_zk::ZkCache;

pub const INDEX_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const A_ID: &str = "22222222-2222-2222-2222-222222222222";
pub const B_ID: &str = "33333333-3333-3333-3333-333333333333";
pub const D_ID: &str = "44444444-4444-4444-4444-444444444444";

pub const ZK_PATH: &str = "https://host/zk/index.org";
pub const NOTES_ROOT: &str = "https://host/zk/";
pub const DAILY_DIR: &str = "https://host/zk/daily/";

pub struct TestZk {
    pub dir: MemoryDirectory,
    pub cache: Arc<ZkCache>,
}

pub fn config() -> ZkConfig {
    ZkConfig::new(ZK_PATH).expect("valid test config")
}

/// Empty directory with a cache over it.
pub fn empty() -> TestZk {
    let config = config();
    let dir = MemoryDirectory::new(&config);
    let cache = Arc::new(ZkCache::new(Arc::new(dir.clone()), config));
    TestZk { dir, cache }
}

/// The S1 layout: index, a -> b, b.
pub fn simple_backlink() -> TestZk {
    let zk = empty();
    zk.dir.add_note("index.org", &body(INDEX_ID, "Index", "", false));
    zk.dir.add_note(
        "a.org",
        &body(A_ID, "A", &format!("See [[id:{}][X]].", B_ID), false),
    );
    zk.dir.add_note("b.org", &body(B_ID, "B", "Leaf.", false));
    zk
}

pub fn body(id: &str, title: &str, text: &str, public: bool) -> String {
    let access = if public { "#+access: public\n" } else { "" };
    format!(
        ":PROPERTIES:\n:ID:       {}\n:END:\n#+TITLE: {}\n{}\n{}\n",
        id, title, access, text
    )
}
