use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use admin_console_shared::{LoginRequest, LoginResponse, TokenPair, UserInfo};
use async_trait::async_trait;

use crate::error::ConsoleResult;

// =========================================================
// 抽象存储接口
// =========================================================

/// 会话快照的持久化存储（与浏览器 localStorage 语义一致）
pub trait SnapshotStorage {
    fn get(&self, key: &str) -> Option<String>;
    /// 写入成功返回 true
    fn set(&self, key: &str, value: &str) -> bool;
    fn delete(&self, key: &str) -> bool;
}

impl<T: SnapshotStorage + ?Sized> SnapshotStorage for Rc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }
}

// =========================================================
// 认证 API 接口
// =========================================================

#[async_trait(?Send)]
pub trait AuthApi {
    async fn login(&self, request: &LoginRequest) -> ConsoleResult<LoginResponse>;
    async fn logout(&self, token: &str) -> ConsoleResult<()>;
    async fn refresh_token(&self, refresh_token: &str) -> ConsoleResult<TokenPair>;
    /// 当前令牌对应的用户资料
    async fn current_user(&self, token: &str) -> ConsoleResult<UserInfo>;
}

#[async_trait(?Send)]
impl<T: AuthApi + ?Sized> AuthApi for Rc<T> {
    async fn login(&self, request: &LoginRequest) -> ConsoleResult<LoginResponse> {
        (**self).login(request).await
    }

    async fn logout(&self, token: &str) -> ConsoleResult<()> {
        (**self).logout(token).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConsoleResult<TokenPair> {
        (**self).refresh_token(refresh_token).await
    }

    async fn current_user(&self, token: &str) -> ConsoleResult<UserInfo> {
        (**self).current_user(token).await
    }
}

// =========================================================
// 内存实现
// =========================================================

/// 进程内存储，用于原生环境与测试
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key);
        true
    }
}
