//! 패턴별 직렬화 락.
//!
//! 같은 패턴에 대한 read-modify-write 갱신이 동시에 실행되면
//! 한쪽 결과가 유실된다. 패턴 키마다 락을 하나씩 유지하여
//! 갱신을 직렬화한다.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// 키 단위 비동기 락 맵.
///
/// 서로 다른 키의 갱신은 병렬로 진행된다.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 키에 대응하는 락을 가져온다. 없으면 생성한다.
    pub async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(key) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
