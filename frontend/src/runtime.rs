//! 应用运行时
//!
//! 把引擎的各个部件装配在一起：会话存储、路由会话、路由表与进度展示。
//! 运行时不是 `Send`，通过 `StoredValue::new_local` 放入响应式上下文。

use std::rc::Rc;

use admin_console_engine::{
    ConsoleConfig, GuardConfig, Location, NavigationGuard, ProgressSink, RoutingSession,
    SessionStore,
};
use leptos::prelude::*;

use crate::api::ConsoleAuth;
use crate::views::{self, ViewFn};
use crate::web::BrowserStorage;
use crate::web::route::RouteTable;

pub type ConsoleSession = SessionStore<BrowserStorage, ConsoleAuth>;
pub type ConsoleRouting = RoutingSession<RouteTable<ViewFn>>;
pub type RuntimeHandle = StoredValue<Rc<ConsoleRuntime>, LocalStorage>;

/// 顶部进度条与错误提示
#[derive(Clone, Copy)]
pub struct PageProgress {
    pub loading: RwSignal<bool>,
    pub notice: RwSignal<Option<String>>,
}

impl PageProgress {
    fn new() -> Self {
        Self {
            loading: RwSignal::new(false),
            notice: RwSignal::new(None),
        }
    }
}

impl ProgressSink for PageProgress {
    fn start(&self) {
        self.loading.set(true);
    }

    fn finish(&self) {
        self.loading.set(false);
    }

    fn error(&self) {
        self.loading.set(false);
    }

    fn notify_error(&self, message: &str) {
        self.notice.set(Some(message.to_string()));
    }
}

pub struct ConsoleRuntime {
    pub guard_config: GuardConfig,
    pub session: ConsoleSession,
    pub routing: Rc<ConsoleRouting>,
    pub routes: RouteTable<ViewFn>,
    pub progress: PageProgress,
}

impl ConsoleRuntime {
    pub fn new(config: ConsoleConfig) -> Rc<Self> {
        let routes = RouteTable::new();
        let routing = Rc::new(RoutingSession::new(routes.clone(), views::registry(), &config));
        let session = SessionStore::new(BrowserStorage, ConsoleAuth::from_config(&config), &config);
        // 登出时卸载动态路由
        session.subscribe(routing.clone());

        if session.api().is_mock() {
            web_sys::console::log_1(&"[Runtime] Using the built-in demo backend".into());
        }

        Rc::new(Self {
            guard_config: config.guard(),
            session,
            routing,
            routes,
            progress: PageProgress::new(),
        })
    }

    pub fn guard(&self) -> NavigationGuard<'_, BrowserStorage, ConsoleAuth, RouteTable<ViewFn>> {
        NavigationGuard::new(&self.session, &self.routing, &self.progress, &self.guard_config)
    }

    /// 补全目标的 `meta.title`
    pub fn describe(&self, location: Location) -> Location {
        let title = if self.guard_config.is_login(&location.path) {
            Some(views::LOGIN_TITLE.to_string())
        } else if location.path == self.guard_config.not_found_path {
            Some(views::NOT_FOUND_TITLE.to_string())
        } else {
            self.routes.match_path(&location.path).and_then(|m| m.title)
        };

        match title {
            Some(title) => location.with_title(title),
            None => location,
        }
    }
}

/// 从 Context 获取运行时句柄（可在闭包间复制）
pub fn use_runtime_handle() -> RuntimeHandle {
    use_context::<RuntimeHandle>().expect("ConsoleRuntime should be provided")
}

pub fn use_runtime() -> Rc<ConsoleRuntime> {
    use_runtime_handle().get_value()
}
