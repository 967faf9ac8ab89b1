//! 会话级路由安装状态
//!
//! 每个会话恰好安装一次动态路由。安装阶段由 `RoutingSession` 显式持有，
//! 第一个发起安装的导航拿到 `InstallTicket`，其他并发导航等待同一个完成信号。

use std::cell::{Cell, RefCell};

use admin_console_shared::RouteDescriptor;
use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::route::filter_permitted;
use crate::route::installer::{DynamicRouterInstaller, NavigationRegistry};
use crate::route::materializer::{Materializer, ViewRegistry};
use crate::route::menu::{self, MenuEntry};
use crate::route::MaterializedRoute;
use crate::session::SessionListener;

/// 对外可见的安装状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    NotInstalled,
    Installing,
    Installed,
}

enum InstallPhase {
    Pending,
    /// 完成信号：`true` 表示安装成功
    InFlight(Shared<oneshot::Receiver<bool>>),
    Installed,
}

/// 路由加载状态（供界面展示加载中 / 错误提示）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteLoadState {
    pub loading: bool,
    pub error: Option<String>,
}

// =========================================================
// 安装凭据
// =========================================================

/// 本次会话的安装权
///
/// 未调用 `finish` 就被丢弃（导航被取消）时，阶段回到 `Pending`，
/// 等待者收到取消信号后重新评估。
pub struct InstallTicket<'a> {
    phase: &'a RefCell<InstallPhase>,
    current_epoch: &'a Cell<u64>,
    epoch: u64,
    sender: Option<oneshot::Sender<bool>>,
}

impl InstallTicket<'_> {
    /// 发放凭据后会话是否被重置过
    pub fn is_current(&self) -> bool {
        self.current_epoch.get() == self.epoch
    }

    fn finish(mut self, installed: bool) {
        if self.is_current() {
            *self.phase.borrow_mut() = if installed {
                InstallPhase::Installed
            } else {
                InstallPhase::Pending
            };
        }
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(installed);
        }
    }
}

impl Drop for InstallTicket<'_> {
    fn drop(&mut self) {
        if self.sender.is_some() && self.is_current() {
            log_warn!("[Router] Route installation cancelled");
            *self.phase.borrow_mut() = InstallPhase::Pending;
        }
    }
}

// =========================================================
// 路由会话
// =========================================================

pub struct RoutingSession<R: NavigationRegistry> {
    installer: DynamicRouterInstaller<R>,
    materializer: Materializer<R::View>,
    phase: RefCell<InstallPhase>,
    routes: RefCell<Vec<MaterializedRoute<R::View>>>,
    menu: RefCell<Vec<MenuEntry>>,
    load_state: RefCell<RouteLoadState>,
    /// 每次重置递增，用于识别安装过程中发生的登出
    epoch: Cell<u64>,
}

impl<R: NavigationRegistry> RoutingSession<R> {
    pub fn new(registry: R, views: ViewRegistry<R::View>, config: &ConsoleConfig) -> Self {
        Self {
            installer: DynamicRouterInstaller::new(registry, &config.static_paths()),
            materializer: Materializer::new(views).with_default_sort(config.default_route_sort),
            phase: RefCell::new(InstallPhase::Pending),
            routes: RefCell::new(Vec::new()),
            menu: RefCell::new(Vec::new()),
            load_state: RefCell::new(RouteLoadState::default()),
            epoch: Cell::new(0),
        }
    }

    pub fn installer(&self) -> &DynamicRouterInstaller<R> {
        &self.installer
    }

    pub fn materializer(&self) -> &Materializer<R::View> {
        &self.materializer
    }

    pub fn status(&self) -> InstallStatus {
        match &*self.phase.borrow() {
            InstallPhase::Pending => InstallStatus::NotInstalled,
            InstallPhase::InFlight(_) => InstallStatus::Installing,
            InstallPhase::Installed => InstallStatus::Installed,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.status() == InstallStatus::Installed
    }

    pub fn routes(&self) -> Vec<MaterializedRoute<R::View>> {
        self.routes.borrow().clone()
    }

    pub fn menu(&self) -> Vec<MenuEntry> {
        self.menu.borrow().clone()
    }

    pub fn load_state(&self) -> RouteLoadState {
        self.load_state.borrow().clone()
    }

    /// 尝试取得安装权；已在安装中或已安装时返回 None
    ///
    /// 阶段切换是同步完成的，调用方在第一次 await 之前就已占住安装权。
    pub fn begin(&self) -> Option<InstallTicket<'_>> {
        let mut phase = self.phase.borrow_mut();
        if !matches!(*phase, InstallPhase::Pending) {
            return None;
        }

        let (sender, receiver) = oneshot::channel();
        *phase = InstallPhase::InFlight(receiver.shared());

        Some(InstallTicket {
            phase: &self.phase,
            current_epoch: &self.epoch,
            epoch: self.epoch.get(),
            sender: Some(sender),
        })
    }

    /// 等待正在进行的安装
    ///
    /// - `Some(true)`: 已安装
    /// - `Some(false)`: 安装失败
    /// - `None`: 安装被取消，或当前并无安装
    pub async fn wait_installed(&self) -> Option<bool> {
        let pending = match &*self.phase.borrow() {
            InstallPhase::InFlight(signal) => signal.clone(),
            InstallPhase::Installed => return Some(true),
            InstallPhase::Pending => return None,
        };
        pending.await.ok()
    }

    /// 权限过滤 + 物化 + 安装，成功后更新路由树与菜单
    pub async fn install_routes<F>(
        &self,
        ticket: InstallTicket<'_>,
        raw_routes: &[RouteDescriptor],
        granted: F,
    ) -> ConsoleResult<usize>
    where
        F: Fn(&str) -> bool,
    {
        *self.load_state.borrow_mut() = RouteLoadState {
            loading: true,
            error: None,
        };

        let result = self.try_install(&ticket, raw_routes, &granted).await;

        let installed = result.is_ok();
        if ticket.is_current() {
            *self.load_state.borrow_mut() = RouteLoadState {
                loading: false,
                error: result.as_ref().err().map(|e| e.message().to_string()),
            };
        }
        ticket.finish(installed);

        result.map_err(|e| e.in_op("routing.install_routes"))
    }

    async fn try_install<F>(
        &self,
        ticket: &InstallTicket<'_>,
        raw_routes: &[RouteDescriptor],
        granted: &F,
    ) -> ConsoleResult<usize>
    where
        F: Fn(&str) -> bool,
    {
        // 上一个会话遗留的记录（例如在其他标签页登出）
        self.installer.uninstall().await;

        let permitted = filter_permitted(raw_routes, granted);
        let materialization = self.materializer.materialize_descriptors(&permitted);
        if materialization.is_empty() {
            return Err(ConsoleError::route_install(
                "no usable routes after materialization",
            ));
        }

        let added = self.installer.install(&materialization.routes).await?;

        if !ticket.is_current() {
            self.installer.remove(&added).await;
            return Err(ConsoleError::route_install(
                "session ended while routes were being installed",
            ));
        }

        let count = materialization.routes.len();
        *self.menu.borrow_mut() = menu::project(&materialization.routes);
        *self.routes.borrow_mut() = materialization.routes;

        log_info!("[Router] Dynamic routes ready ({} top-level)", count);
        Ok(count)
    }

    /// 卸载全部动态路由并回到未安装状态
    pub async fn reset(&self) {
        self.epoch.set(self.epoch.get() + 1);
        *self.phase.borrow_mut() = InstallPhase::Pending;
        self.routes.borrow_mut().clear();
        self.menu.borrow_mut().clear();
        // 保留最近一次的错误信息供登录页展示
        self.load_state.borrow_mut().loading = false;

        self.installer.uninstall().await;
    }

    /// 会话在外部失效：下一次导航重新安装，遗留记录在那时卸载
    pub fn mark_stale(&self) -> bool {
        let mut phase = self.phase.borrow_mut();
        if matches!(*phase, InstallPhase::Installed) {
            *phase = InstallPhase::Pending;
            log_info!("[Router] Session ended externally, routes marked stale");
            true
        } else {
            false
        }
    }
}

#[async_trait(?Send)]
impl<R: NavigationRegistry> SessionListener for RoutingSession<R> {
    async fn session_cleared(&self) {
        self.reset().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleErrorStatus;
    use crate::route::installer::tests::{MockRegistry, RegistryContext};
    use std::rc::Rc;

    fn views() -> ViewRegistry<u8> {
        ViewRegistry::new()
            .with("dashboard/DashboardView", 1)
            .with("users/UserListView", 2)
            .with("content/ContentView", 3)
    }

    fn catalog() -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new("/dashboard", "Dashboard")
                .component("dashboard/DashboardView")
                .title("仪表盘")
                .sort(1),
            RouteDescriptor::new("/system", "System")
                .title("系统管理")
                .sort(3)
                .permission("system:view")
                .children(vec![
                    RouteDescriptor::new("list", "UserList").component("users/UserListView"),
                ]),
            RouteDescriptor::new("/content", "Content")
                .component("content/ContentView")
                .sort(2),
            RouteDescriptor::new("/login", "Login").component("dashboard/DashboardView").hidden(),
        ]
    }

    fn setup() -> (Rc<RegistryContext>, RoutingSession<MockRegistry>) {
        let ctx = Rc::new(RegistryContext::default());
        let session = RoutingSession::new(
            MockRegistry { ctx: ctx.clone() },
            views(),
            &ConsoleConfig::default(),
        );
        (ctx, session)
    }

    fn allow_all(_: &str) -> bool {
        true
    }

    #[tokio::test]
    async fn test_install_builds_routes_and_menu() {
        let (ctx, session) = setup();
        let ticket = session.begin().unwrap();
        assert_eq!(session.status(), InstallStatus::Installing);

        let count = session.install_routes(ticket, &catalog(), allow_all).await.unwrap();

        assert_eq!(count, 4);
        assert!(session.is_installed());
        // 静态路径 /login 不进入注册表
        assert_eq!(*ctx.routes.borrow(), vec!["Dashboard", "Content", "System"]);
        let menu_keys: Vec<String> = session.menu().into_iter().map(|e| e.key).collect();
        assert_eq!(menu_keys, vec!["/dashboard", "/content", "/system"]);
        assert_eq!(session.load_state(), RouteLoadState::default());
    }

    #[tokio::test]
    async fn test_permission_filter_applied_before_install() {
        let (ctx, session) = setup();
        let ticket = session.begin().unwrap();

        session
            .install_routes(ticket, &catalog(), |tag| tag != "system:view")
            .await
            .unwrap();

        assert!(!ctx.routes.borrow().contains(&"System".to_string()));
        assert!(session.menu().iter().all(|e| e.key != "/system"));
    }

    #[tokio::test]
    async fn test_begin_is_exclusive() {
        let (_ctx, session) = setup();
        let ticket = session.begin();
        assert!(ticket.is_some());
        assert!(session.begin().is_none());
    }

    #[tokio::test]
    async fn test_zero_usable_routes_fails() {
        let (ctx, session) = setup();
        let ticket = session.begin().unwrap();
        let raw = vec![RouteDescriptor::new("/ghost", "Ghost").component("missing/View")];

        let err = session.install_routes(ticket, &raw, allow_all).await.unwrap_err();

        assert_eq!(err.status, ConsoleErrorStatus::RouteInstall);
        assert_eq!(session.status(), InstallStatus::NotInstalled);
        assert!(ctx.log.borrow().is_empty());
        let state = session.load_state();
        assert!(!state.loading);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_waiter_sees_result_of_in_flight_install() {
        let (ctx, session) = setup();
        ctx.yield_on_add.set(true);
        let ticket = session.begin().unwrap();
        let raw = catalog();

        let (installed, waited) = futures::join!(
            session.install_routes(ticket, &raw, allow_all),
            session.wait_installed()
        );

        assert!(installed.is_ok());
        assert_eq!(waited, Some(true));
    }

    #[tokio::test]
    async fn test_dropped_ticket_resets_phase_and_cancels_waiters() {
        let (_ctx, session) = setup();
        let ticket = session.begin().unwrap();
        let mut waiter = Box::pin(session.wait_installed());
        assert!(futures::poll!(&mut waiter).is_pending());

        drop(ticket);

        assert_eq!(session.status(), InstallStatus::NotInstalled);
        assert_eq!(waiter.await, None);
        assert!(session.begin().is_some());
    }

    #[tokio::test]
    async fn test_reset_during_install_rolls_back() {
        let (ctx, session) = setup();
        ctx.yield_on_add.set(true);
        let ticket = session.begin().unwrap();
        let raw = catalog();

        let (result, ()) = futures::join!(session.install_routes(ticket, &raw, allow_all), async {
            tokio::task::yield_now().await;
            session.reset().await;
        });

        assert_eq!(result.unwrap_err().status, ConsoleErrorStatus::RouteInstall);
        assert_eq!(session.status(), InstallStatus::NotInstalled);
        assert!(ctx.routes.borrow().is_empty());
        assert!(session.installer().installed().is_empty());
        assert!(session.menu().is_empty());
    }

    #[tokio::test]
    async fn test_reset_uninstalls_and_allows_reinstall() {
        let (ctx, session) = setup();
        let ticket = session.begin().unwrap();
        session.install_routes(ticket, &catalog(), allow_all).await.unwrap();

        session.reset().await;

        assert_eq!(session.status(), InstallStatus::NotInstalled);
        assert!(ctx.routes.borrow().is_empty());
        assert!(session.routes().is_empty());
        assert!(session.menu().is_empty());

        let ticket = session.begin().unwrap();
        session.install_routes(ticket, &catalog(), allow_all).await.unwrap();
        assert_eq!(ctx.routes.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_mark_stale_then_reinstall_clears_leftovers() {
        let (ctx, session) = setup();
        let ticket = session.begin().unwrap();
        session.install_routes(ticket, &catalog(), allow_all).await.unwrap();

        assert!(session.mark_stale());
        assert!(!session.mark_stale());
        assert_eq!(session.status(), InstallStatus::NotInstalled);

        let ticket = session.begin().unwrap();
        session
            .install_routes(ticket, &catalog(), |tag| tag != "system:view")
            .await
            .unwrap();

        assert_eq!(*ctx.routes.borrow(), vec!["Dashboard", "Content"]);
        assert_eq!(ctx.log.borrow().iter().filter(|l| l.starts_with("remove:")).count(), 3);
    }
}
