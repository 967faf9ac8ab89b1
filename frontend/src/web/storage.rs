//! LocalStorage 封装模块
//!
//! 直接使用 `web_sys::Storage`，作为会话快照的浏览器端存储。

use admin_console_engine::SnapshotStorage;

/// 浏览器 LocalStorage
///
/// 无法访问 LocalStorage 时（例如隐私模式）读取返回 None，写入返回 false。
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl SnapshotStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> bool {
        Self::storage()
            .and_then(|s| s.set_item(key, value).ok())
            .is_some()
    }

    fn delete(&self, key: &str) -> bool {
        Self::storage()
            .and_then(|s| s.remove_item(key).ok())
            .is_some()
    }
}
