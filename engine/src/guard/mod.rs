//! 导航守卫 - 状态机
//!
//! `evaluate` 是纯函数：输入导航尝试、会话有效性与路由安装状态，输出下一步。
//! 安装路由、清空会话等 I/O 由 `driver::NavigationGuard` 根据结果执行。

pub mod driver;


use url::form_urlencoded;

use crate::config::ConsoleConfig;
use crate::route::normalize_path;
use crate::routing::InstallStatus;

pub use driver::{NavigationGuard, NoProgress, ProgressSink, Resolution};

/// 登录页上携带原始目标的查询参数
pub const REDIRECT_QUERY_KEY: &str = "redirect";

// =========================================================
// 位置
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub hash: Option<String>,
    /// 目标路由的 `meta.title`（由调用方从路由表中解析）
    pub title: Option<String>,
}

impl Location {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize_path(path),
            ..Default::default()
        }
    }

    /// 解析 `path?query#hash` 形式的地址
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.split_once('#') {
            Some((rest, hash)) => (rest, (!hash.is_empty()).then(|| hash.to_string())),
            None => (url, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (
                path,
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect(),
            ),
            None => (rest, Vec::new()),
        };

        Self {
            path: normalize_path(path),
            query,
            hash,
            title: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_hash(mut self, hash: &str) -> Self {
        self.hash = Some(hash.trim_start_matches('#').to_string());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 路径 + 百分号编码的查询串 + hash
    pub fn full_path(&self) -> String {
        let mut out = self.path.clone();
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            out.push('?');
            out.push_str(&query);
        }
        if let Some(hash) = &self.hash {
            out.push('#');
            out.push_str(hash);
        }
        out
    }
}

/// 一次导航尝试 `(from, to)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAttempt {
    /// 首次进入页面时为 None
    pub from: Option<Location>,
    pub to: Location,
}

impl NavigationAttempt {
    pub fn new(from: Option<Location>, to: Location) -> Self {
        Self { from, to }
    }

    pub fn initial(to: Location) -> Self {
        Self { from: None, to }
    }
}

// =========================================================
// 守卫配置
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub app_title: String,
    pub login_path: String,
    pub not_found_path: String,
    /// 已登录用户的默认落地页
    pub landing_path: String,
    /// 无需会话即可访问的路径
    pub allow_list: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        ConsoleConfig::default().guard()
    }
}

impl GuardConfig {
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.allow_list.iter().any(|p| normalize_path(p) == path)
    }

    pub fn is_login(&self, path: &str) -> bool {
        normalize_path(path) == normalize_path(&self.login_path)
    }

    pub fn page_title(&self, to: &Location) -> String {
        match to.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("{} - {}", title, self.app_title),
            None => self.app_title.clone(),
        }
    }

    /// 带回跳提示的登录页地址
    pub fn login_redirect(&self, to: &Location) -> Location {
        Location::new(&self.login_path).with_query(REDIRECT_QUERY_KEY, &to.full_path())
    }
}

/// 登录成功后的跳转目标
///
/// 只接受站内绝对路径（以 `/` 开头且不以 `//` 开头），否则回到落地页。
pub fn post_login_target(location: &Location, config: &GuardConfig) -> Location {
    location
        .query_value(REDIRECT_QUERY_KEY)
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .map(Location::parse)
        .filter(|target| !config.is_login(&target.path))
        .unwrap_or_else(|| Location::new(&config.landing_path))
}

// =========================================================
// 状态机
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    CheckingAllowlist,
    CheckingSession,
    InstallingRoutes,
    /// 导航继续
    Resolved,
    /// 导航被替换
    Redirecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// 按原样继续
    Proceed,
    /// 路由表已变化，用 replace 重新匹配原目标
    Replace(Location),
    Redirect(Location),
}

impl NavigationDecision {
    pub fn target(&self) -> Option<&Location> {
        match self {
            NavigationDecision::Proceed => None,
            NavigationDecision::Replace(location) | NavigationDecision::Redirect(location) => {
                Some(location)
            }
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, NavigationDecision::Redirect(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardStep {
    Decided(NavigationDecision),
    /// 需要由调用方执行安装
    InstallRoutes,
    /// 其他导航正在安装，等待其结果
    AwaitInstallation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub title: String,
    /// 本次评估经过的状态
    pub trail: Vec<GuardState>,
    pub step: GuardStep,
}

impl Evaluation {
    pub fn state(&self) -> GuardState {
        self.trail.last().copied().unwrap_or(GuardState::Idle)
    }
}

pub fn evaluate(
    attempt: &NavigationAttempt,
    session_valid: bool,
    status: InstallStatus,
    config: &GuardConfig,
) -> Evaluation {
    let to = &attempt.to;
    let title = config.page_title(to);
    let mut trail = vec![GuardState::Idle, GuardState::CheckingAllowlist];

    let step = if config.is_allowed(&to.path) {
        if config.is_login(&to.path) && session_valid {
            trail.push(GuardState::Redirecting);
            GuardStep::Decided(NavigationDecision::Redirect(Location::new(&config.landing_path)))
        } else {
            trail.push(GuardState::Resolved);
            GuardStep::Decided(NavigationDecision::Proceed)
        }
    } else {
        trail.push(GuardState::CheckingSession);
        if !session_valid {
            trail.push(GuardState::Redirecting);
            GuardStep::Decided(NavigationDecision::Redirect(config.login_redirect(to)))
        } else {
            match status {
                InstallStatus::NotInstalled => {
                    trail.push(GuardState::InstallingRoutes);
                    GuardStep::InstallRoutes
                }
                InstallStatus::Installing => {
                    trail.push(GuardState::InstallingRoutes);
                    GuardStep::AwaitInstallation
                }
                InstallStatus::Installed => {
                    trail.push(GuardState::Resolved);
                    GuardStep::Decided(NavigationDecision::Proceed)
                }
            }
        }
    };

    Evaluation { title, trail, step }
}
