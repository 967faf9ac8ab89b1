//! 路由表模块 - 领域模型
//!
//! 不依赖 DOM：保存动态安装的路由树，并把 URL path 匹配到视图。
//! 路由的增删只由引擎的安装器完成，这里只负责存放与查询。

use std::cell::RefCell;
use std::rc::Rc;

use admin_console_engine::route::{join_path, normalize_path};
use admin_console_engine::{ConsoleError, ConsoleResult, MaterializedRoute, NavigationRegistry};
use async_trait::async_trait;

/// 一次路径匹配的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<V> {
    pub name: String,
    pub full_path: String,
    pub title: Option<String>,
    /// 分组节点没有视图时取第一个可渲染的后代
    pub view: Option<V>,
    pub keep_alive: bool,
}

/// 当前已挂载的动态路由
///
/// 克隆共享同一张表：安装器持有一份，路由出口持有另一份。
#[derive(Debug)]
pub struct RouteTable<V> {
    routes: Rc<RefCell<Vec<MaterializedRoute<V>>>>,
}

impl<V> Clone for RouteTable<V> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
        }
    }
}

impl<V> Default for RouteTable<V> {
    fn default() -> Self {
        Self {
            routes: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<V: Clone> RouteTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 顶层路由名，按挂载顺序
    pub fn names(&self) -> Vec<String> {
        self.routes.borrow().iter().map(|r| r.name.clone()).collect()
    }

    /// 按完整路径查找路由
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<V>> {
        let path = normalize_path(path);
        let routes = self.routes.borrow();
        find_route(&routes, "/", &path)
    }
}

fn find_route<V: Clone>(
    routes: &[MaterializedRoute<V>],
    parent: &str,
    path: &str,
) -> Option<RouteMatch<V>> {
    for route in routes {
        let full_path = join_path(parent, &route.path);
        if full_path == path {
            return Some(RouteMatch {
                name: route.name.clone(),
                title: route.meta.title.clone().filter(|t| !t.is_empty()),
                view: route
                    .component
                    .clone()
                    .or_else(|| first_view(&route.children)),
                keep_alive: route.meta.keep_alive,
                full_path,
            });
        }
        if let Some(found) = find_route(&route.children, &full_path, path) {
            return Some(found);
        }
    }
    None
}

fn first_view<V: Clone>(routes: &[MaterializedRoute<V>]) -> Option<V> {
    routes.iter().find_map(|r| {
        r.component
            .clone()
            .or_else(|| first_view(&r.children))
    })
}

#[async_trait(?Send)]
impl<V: Clone> NavigationRegistry for RouteTable<V> {
    type View = V;

    async fn add_route(&self, route: &MaterializedRoute<V>) -> ConsoleResult<()> {
        let mut routes = self.routes.borrow_mut();
        if routes.iter().any(|r| r.name == route.name) {
            return Err(ConsoleError::route_install(format!(
                "route '{}' is already mounted",
                route.name
            )));
        }
        routes.push(route.clone());
        Ok(())
    }

    async fn remove_route(&self, name: &str) -> ConsoleResult<bool> {
        Ok(self.discard_route(name))
    }

    fn discard_route(&self, name: &str) -> bool {
        let mut routes = self.routes.borrow_mut();
        let before = routes.len();
        routes.retain(|r| r.name != name);
        routes.len() != before
    }

    fn has_route(&self, name: &str) -> bool {
        self.routes.borrow().iter().any(|r| r.name == name)
    }
}
