use std::sync::{Mutex, PoisonError};

/// 最後に書き込まれた値が勝つ、バージョン付きのセル。
///
/// 同時に走っている複数のリクエストが同じフィールドを書き換える場合、完了した順に上書きされる。
/// ロックは値の読み書きの間だけ保持し、`await`をまたぐことはない。
#[derive(Debug, Default)]
pub struct VersionedCell<T> {
    inner: Mutex<Versioned<T>>,
}

#[derive(Debug, Default)]
struct Versioned<T> {
    version: u64,
    value: T,
}

impl<T: Clone> VersionedCell<T> {
    /// 新しい`VersionedCell`を返す。
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Versioned { version: 0, value }),
        }
    }

    /// 現在の値の複製を返す。
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// 値を上書きし、新しいバージョンを返す。
    pub fn set(&self, value: T) -> u64 {
        let mut inner = self.lock();
        inner.version += 1;
        inner.value = value;
        inner.version
    }

    /// これまでの書き込み回数。
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Versioned<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
