//! 会话存储
//!
//! 持有当前登录身份（令牌对、用户信息、原始路由树）并负责其持久化生命周期。
//! 只有会话存储写入持久化快照；解析后的路由永不落盘。

pub mod adapter;
pub mod mock;


use std::cell::RefCell;
use std::rc::Rc;

use admin_console_shared::{
    LoginRequest, LoginResponse, RouteDescriptor, SessionSnapshot, Timestamp, UserInfo,
    UserInfoPatch,
};
use async_trait::async_trait;

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, ConsoleResult};
use adapter::{AuthApi, SnapshotStorage};

/// 会话结束通知
///
/// 在登出、会话被清空或被新登录替换时按注册顺序依次 await。
#[async_trait(?Send)]
pub trait SessionListener {
    async fn session_cleared(&self);
}

// =========================================================
// 会话
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub user_info: Option<UserInfo>,
    /// 服务端下发的原始路由树；None 表示尚未获取
    pub raw_routes: Option<Vec<RouteDescriptor>>,
    pub captured_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl Session {
    /// 令牌非空、身份存在且路由树已获取（可以为空列表）
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && self.user_info.is_some() && self.raw_routes.is_some()
    }

    fn from_login(response: LoginResponse, now: Timestamp) -> Self {
        Self {
            token: response.token,
            refresh_token: response.refresh_token,
            user_info: Some(response.user_info),
            raw_routes: Some(response.routes),
            captured_at: Some(now),
            expires_at: expiry(now, response.expires_in),
        }
    }

    /// 快照里的 `is_logged_in` 不参与恢复，有效性由其余字段重新推导
    fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            token: snapshot.token,
            refresh_token: snapshot.refresh_token,
            user_info: snapshot.user_info,
            raw_routes: snapshot.raw_routes,
            captured_at: snapshot.captured_at,
            expires_at: snapshot.expires_at,
        }
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token.clone(),
            refresh_token: self.refresh_token.clone(),
            user_info: self.user_info.clone(),
            is_logged_in: self.is_valid(),
            raw_routes: self.raw_routes.clone(),
            captured_at: self.captured_at,
            expires_at: self.expires_at,
        }
    }
}

fn expiry(now: Timestamp, expires_in: i64) -> Option<Timestamp> {
    (expires_in > 0).then(|| now.add_secs(expires_in))
}

// =========================================================
// 会话存储
// =========================================================

pub struct SessionStore<S: SnapshotStorage, A: AuthApi> {
    storage: S,
    api: A,
    storage_key: String,
    session: RefCell<Session>,
    listeners: RefCell<Vec<Rc<dyn SessionListener>>>,
}

impl<S: SnapshotStorage, A: AuthApi> SessionStore<S, A> {
    pub fn new(storage: S, api: A, config: &ConsoleConfig) -> Self {
        Self {
            storage,
            api,
            storage_key: config.storage_key.clone(),
            session: RefCell::new(Session::default()),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Rc<dyn SessionListener>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // --- Queries ---

    pub fn is_valid(&self) -> bool {
        self.session.borrow().is_valid()
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.borrow().to_snapshot()
    }

    pub fn token(&self) -> Option<String> {
        let session = self.session.borrow();
        (!session.token.is_empty()).then(|| session.token.clone())
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.session.borrow().user_info.clone()
    }

    pub fn raw_routes(&self) -> Vec<RouteDescriptor> {
        self.session.borrow().raw_routes.clone().unwrap_or_default()
    }

    pub fn has_permission(&self, tag: &str) -> bool {
        self.session
            .borrow()
            .user_info
            .as_ref()
            .is_some_and(|u| u.has_permission(tag))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.session
            .borrow()
            .user_info
            .as_ref()
            .is_some_and(|u| u.has_role(role))
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.session
            .borrow()
            .expires_at
            .is_some_and(|expires_at| now >= expires_at)
    }

    // --- Lifecycle ---

    pub async fn login(&self, request: &LoginRequest) -> ConsoleResult<UserInfo> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(ConsoleError::auth("username and password are required").in_op("session.login"));
        }

        let response = self
            .api
            .login(request)
            .await
            .map_err(|e| e.in_op_with("session.login", request.username.as_str()))?;

        // 旧会话的路由必须先卸载
        if self.is_valid() {
            log_info!("[Session] Replacing the current session");
            self.notify_cleared().await;
        }

        let user_info = response.user_info.clone();
        *self.session.borrow_mut() = Session::from_login(response, Timestamp::now());
        self.persist();

        log_info!("[Session] Logged in as '{}'", user_info.username);
        Ok(user_info)
    }

    /// 从持久化存储恢复，返回恢复后会话是否有效
    ///
    /// 快照缺失或损坏时会话保持为空；损坏的快照会被删除。
    pub fn restore(&self) -> bool {
        let restored = match self.read_snapshot() {
            Ok(Some(snapshot)) => Session::from_snapshot(snapshot),
            Ok(None) => Session::default(),
            Err(e) => {
                log_warn!("[Session] Discarding snapshot: {}", e);
                self.storage.delete(&self.storage_key);
                Session::default()
            }
        };

        let valid = restored.is_valid();
        *self.session.borrow_mut() = restored;
        if valid {
            log_info!("[Session] Session restored");
        }
        valid
    }

    /// 重新读取快照（例如其他标签页登出后），返回令牌是否发生变化
    ///
    /// 不通知监听者，由守卫的解析阶段观察者处理失效。
    pub fn sync_from_storage(&self) -> bool {
        let before = self.session.borrow().token.clone();
        self.restore();
        self.session.borrow().token != before
    }

    fn read_snapshot(&self) -> ConsoleResult<Option<SessionSnapshot>> {
        let Some(json) = self.storage.get(&self.storage_key) else {
            return Ok(None);
        };
        serde_json::from_str(&json).map(Some).map_err(|e| {
            ConsoleError::restore(format!("malformed session snapshot: {}", e))
                .with_source(e)
                .in_op_with("session.restore", self.storage_key.as_str())
        })
    }

    /// 登出：先尽力通知服务端，再无条件清空本地状态
    pub async fn logout(&self) -> ConsoleResult<()> {
        let token = {
            let session = self.session.borrow();
            session.is_valid().then(|| session.token.clone())
        };

        let api_result = match token {
            Some(token) => self.api.logout(&token).await,
            None => Ok(()),
        };

        self.clear().await;

        api_result.map_err(|e| {
            log_warn!("[Session] Server logout failed: {}", e);
            e.in_op("session.logout")
        })
    }

    /// 清空内存与持久化会话并通知监听者，不访问服务端
    pub async fn clear(&self) {
        *self.session.borrow_mut() = Session::default();
        if !self.storage.delete(&self.storage_key) {
            let err = ConsoleError::storage("failed to delete session snapshot")
                .in_op_with("session.clear", self.storage_key.as_str());
            log_error!("[Session] {}", err);
        }
        log_info!("[Session] Session cleared");
        self.notify_cleared().await;
    }

    pub fn update_user_info(&self, patch: UserInfoPatch) -> bool {
        {
            let mut session = self.session.borrow_mut();
            let Some(info) = session.user_info.as_mut() else {
                return false;
            };
            info.apply(patch);
        }
        self.persist();
        true
    }

    /// 从服务端重新拉取用户资料并持久化
    pub async fn reload_user_info(&self) -> ConsoleResult<UserInfo> {
        let token = {
            let session = self.session.borrow();
            session.is_valid().then(|| session.token.clone())
        };
        let Some(token) = token else {
            return Err(ConsoleError::auth("no active session").in_op("session.reload_user_info"));
        };

        let user = self
            .api
            .current_user(&token)
            .await
            .map_err(|e| e.in_op("session.reload_user_info"))?;

        {
            let mut session = self.session.borrow_mut();
            // 拉取期间会话已被替换或清空
            if session.token != token {
                return Ok(user);
            }
            session.user_info = Some(user.clone());
        }
        self.persist();
        Ok(user)
    }

    /// 用刷新令牌换取新的令牌对；刷新令牌被拒绝时清空会话
    pub async fn refresh_tokens(&self) -> ConsoleResult<()> {
        let refresh_token = self.session.borrow().refresh_token.clone();
        if refresh_token.is_empty() {
            return Err(ConsoleError::auth("no refresh token").in_op("session.refresh_tokens"));
        }

        match self.api.refresh_token(&refresh_token).await {
            Ok(pair) => {
                {
                    let mut session = self.session.borrow_mut();
                    // 刷新期间会话已被替换或清空
                    if session.refresh_token != refresh_token {
                        return Ok(());
                    }
                    session.token = pair.token;
                    session.refresh_token = pair.refresh_token;
                    session.expires_at = expiry(Timestamp::now(), pair.expires_in);
                }
                self.persist();
                Ok(())
            }
            Err(e) if e.is_auth() => {
                log_warn!("[Session] Refresh rejected, clearing session: {}", e);
                self.clear().await;
                Err(e.in_op("session.refresh_tokens"))
            }
            Err(e) => Err(e.in_op("session.refresh_tokens")),
        }
    }

    /// 令牌已过期时用刷新令牌续期，返回是否完成了刷新
    ///
    /// 刷新令牌被拒绝时会话已被清空；其他失败保留当前会话。
    pub async fn refresh_if_expired(&self, now: Timestamp) -> bool {
        if !self.is_valid() || !self.is_expired(now) {
            return false;
        }
        match self.refresh_tokens().await {
            Ok(()) => {
                log_info!("[Session] Expired token refreshed");
                true
            }
            Err(e) => {
                log_warn!("[Session] Token refresh failed: {}", e);
                false
            }
        }
    }

    // --- Internals ---

    /// 写入失败只记录日志
    fn persist(&self) {
        let snapshot = self.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if !self.storage.set(&self.storage_key, &json) {
                    let err = ConsoleError::storage("failed to write session snapshot")
                        .in_op_with("session.persist", self.storage_key.as_str());
                    log_error!("[Session] {}", err);
                }
            }
            Err(e) => {
                let err = ConsoleError::from(e).in_op("session.persist");
                log_error!("[Session] {}", err);
            }
        }
    }

    async fn notify_cleared(&self) {
        let listeners: Vec<Rc<dyn SessionListener>> = self.listeners.borrow().clone();
        for listener in listeners {
            listener.session_cleared().await;
        }
    }
}
