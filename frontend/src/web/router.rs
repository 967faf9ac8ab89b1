//! 路由服务模块 - 核心引擎
//!
//! 封装了 web_sys 的 History API：所有对 window.history 的操作都集中在此模块。
//! 每次导航都交给引擎的导航守卫决策，再按决策推入、替换或重定向。

use admin_console_engine::{
    Location, MenuEntry, NavigationAttempt, NavigationDecision, post_login_target,
};
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::prelude::*;

use crate::auth::SessionContext;
use crate::runtime::RuntimeHandle;

/// 单次导航中允许的最大重定向次数
const MAX_REDIRECTS: usize = 8;

/// 获取当前浏览器地址（path + query + hash）
fn current_url() -> String {
    let Some(location) = web_sys::window().map(|w| w.location()) else {
        return "/".to_string();
    };
    let path = location.pathname().unwrap_or_else(|_| "/".to_string());
    let search = location.search().unwrap_or_default();
    let hash = location.hash().unwrap_or_default();
    format!("{}{}{}", path, search, hash)
}

/// 推送 History 状态（内部工具函数）
fn push_history_state(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(url));
        }
    }
}

/// 替换 History 状态（内部工具函数，用于重定向）
fn replace_history_state(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(url));
        }
    }
}

fn set_document_title(title: &str) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        document.set_title(title);
    }
}

/// 导航提交到浏览器历史的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryMode {
    Push,
    Replace,
    /// 后退/前进：地址栏已经变化
    Pop,
}

/// 路由器服务
///
/// 封装所有路由操作，通过 Signal 驱动界面更新。
#[derive(Clone, Copy)]
pub struct RouterService {
    /// 当前已提交的地址
    current: ReadSignal<Location>,
    set_current: WriteSignal<Location>,
    /// 当前会话的菜单
    menu: RwSignal<Vec<MenuEntry>>,
    /// 导航序号，只有最后一次导航的结果会被提交
    sequence: StoredValue<u64>,
    runtime: RuntimeHandle,
    session: SessionContext,
}

impl RouterService {
    fn new(runtime: RuntimeHandle, session: SessionContext) -> Self {
        let (current, set_current) = signal(Location::default());

        Self {
            current,
            set_current,
            menu: RwSignal::new(Vec::new()),
            sequence: StoredValue::new(0),
            runtime,
            session,
        }
    }

    /// 当前地址信号
    pub fn current(&self) -> ReadSignal<Location> {
        self.current
    }

    /// 当前菜单信号
    pub fn menu(&self) -> RwSignal<Vec<MenuEntry>> {
        self.menu
    }

    /// **核心方法：导航与守卫**
    pub fn navigate(&self, url: &str) {
        self.dispatch(Location::parse(url), HistoryMode::Push);
    }

    /// 流程：请求 -> 守卫决策 -> 提交 -> 解析阶段观察
    fn dispatch(&self, to: Location, mode: HistoryMode) {
        let sequence = self.sequence.get_value() + 1;
        self.sequence.set_value(sequence);

        let router = *self;
        spawn_local(async move {
            router.run(to, mode, sequence).await;
        });
    }

    async fn run(self, to: Location, mode: HistoryMode, sequence: u64) {
        let runtime = self.runtime.get_value();
        let is_initial = self.current.get_untracked().path.is_empty();
        let from = (!is_initial).then(|| self.current.get_untracked());

        let mut target = self.expand_root(to);
        let mut mode = mode;

        for _ in 0..MAX_REDIRECTS {
            let target_described = runtime.describe(target.clone());
            let attempt = NavigationAttempt::new(from.clone(), target_described);
            let resolution = runtime.guard().before_each(&attempt).await;

            // 已有更新的导航
            if self.sequence.get_value() != sequence {
                return;
            }
            self.session.sync(&runtime);

            match resolution.decision {
                NavigationDecision::Proceed => {
                    set_document_title(&resolution.title);
                    self.commit(target, mode);
                    if runtime.guard().after_each() {
                        web_sys::console::log_1(
                            &"[Router] Session ended elsewhere, routes marked stale".into(),
                        );
                    }
                    self.menu.set(runtime.routing.menu());
                    return;
                }
                NavigationDecision::Replace(location) => {
                    // 路由表已变化，重新匹配原目标
                    web_sys::console::log_1(
                        &format!("[Router] Routes mounted: {:?}", runtime.routes.names()).into(),
                    );
                    target = location;
                    mode = HistoryMode::Replace;
                }
                NavigationDecision::Redirect(location) => {
                    web_sys::console::log_1(
                        &format!("[Router] Redirecting to {}", location.full_path()).into(),
                    );
                    target = self.expand_root(location);
                    mode = HistoryMode::Replace;
                }
            }
        }

        web_sys::console::error_1(
            &format!("[Router] Too many redirects while navigating to {}", target.full_path())
                .into(),
        );
    }

    /// 根路径指向落地页
    fn expand_root(&self, to: Location) -> Location {
        if to.path == "/" {
            let runtime = self.runtime.get_value();
            let mut landing = Location::new(&runtime.guard_config.landing_path);
            landing.query = to.query;
            landing.hash = to.hash;
            landing
        } else {
            to
        }
    }

    fn commit(&self, target: Location, mode: HistoryMode) {
        let url = target.full_path();
        match mode {
            HistoryMode::Push => push_history_state(&url),
            HistoryMode::Replace => replace_history_state(&url),
            HistoryMode::Pop => {}
        }
        self.set_current.set(target);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let router = *self;

        let closure = Closure::<dyn Fn()>::new(move || {
            // popstate 时也执行守卫逻辑
            router.dispatch(Location::parse(&current_url()), HistoryMode::Pop);
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 其他标签页修改会话快照时重新读取
    fn init_storage_listener(&self) {
        let router = *self;

        let closure = Closure::<dyn Fn()>::new(move || {
            let runtime = router.runtime.get_value();
            if runtime.session.sync_from_storage() {
                web_sys::console::log_1(&"[Router] Session changed in another tab".into());
                // 令牌已变化，路由需要按新会话重新安装
                runtime.routing.mark_stale();
                router.session.sync(&runtime);
                router.dispatch(router.current.get_untracked(), HistoryMode::Replace);
            }
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref());
        }

        closure.forget();
    }

    /// 设置认证状态变化时的自动重定向
    fn setup_auth_redirect(&self) {
        let router = *self;
        let is_authenticated = self.session.is_authenticated_signal();

        Effect::new(move |previous: Option<bool>| {
            let is_auth = is_authenticated.get();
            let current = router.current.get_untracked();

            // 首次运行只记录状态，初始导航由 provide_router 发起
            if previous.is_some() && previous != Some(is_auth) && !current.path.is_empty() {
                let runtime = router.runtime.get_value();
                let guard_config = &runtime.guard_config;

                if is_auth {
                    // 用户刚登录，如果在登录页则跳转到回跳目标
                    if guard_config.is_login(&current.path) {
                        let target = post_login_target(&current, guard_config);
                        web_sys::console::log_1(
                            &"[Router] Auth state changed: logged in, leaving login page.".into(),
                        );
                        router.dispatch(target, HistoryMode::Replace);
                    }
                } else if !guard_config.is_allowed(&current.path) {
                    // 用户登出，受保护页面重新经过守卫
                    web_sys::console::log_1(
                        &"[Router] Auth state changed: logged out, re-checking route.".into(),
                    );
                    router.menu.set(Vec::new());
                    router.dispatch(current, HistoryMode::Replace);
                }
            }
            is_auth
        });
    }
}

/// 提供路由服务到 Context 并初始化
fn provide_router(runtime: RuntimeHandle, session: SessionContext) -> RouterService {
    let router = RouterService::new(runtime, session);

    // 初始化监听器
    router.init_popstate_listener();
    router.init_storage_listener();
    router.setup_auth_redirect();

    provide_context(router);

    // 首次进入页面
    router.dispatch(Location::parse(&current_url()), HistoryMode::Replace);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(
    runtime: RuntimeHandle,
    session: SessionContext,
    /// 子组件
    children: Children,
) -> impl IntoView {
    provide_router(runtime, session);

    children()
}

/// 路由出口组件
///
/// 根据当前地址渲染对应的视图。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前地址，返回对应视图
    matcher: fn(&Location) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || {
        let current = router.current().get();
        matcher(&current)
    }
}

#[component]
pub fn Link(
    /// 目标地址
    #[prop(into)]
    to: String,
    #[prop(optional, into)] class: String,
    /// 子内容
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class=class on:click=on_click>
            {children()}
        </a>
    }
}
