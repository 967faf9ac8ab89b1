//! 菜单投影
//!
//! 从物化后的路由树派生侧边栏菜单。纯函数，可在路由树变化时随时重算。

use serde::Serialize;

use super::{MaterializedRoute, join_path, normalize_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    /// 完整路径
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 仅当至少存在一个可见子节点时为 Some
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MenuEntry>>,
}

impl MenuEntry {
    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// 投影整棵路由树，隐藏节点连同其子树一起丢弃
pub fn project<V>(routes: &[MaterializedRoute<V>]) -> Vec<MenuEntry> {
    routes
        .iter()
        .filter(|r| !r.is_hidden())
        .map(|r| project_node(r, &normalize_path(&r.path)))
        .collect()
}

fn project_node<V>(route: &MaterializedRoute<V>, full_path: &str) -> MenuEntry {
    let children: Vec<MenuEntry> = route
        .children
        .iter()
        .filter(|c| !c.is_hidden())
        .map(|c| project_node(c, &join_path(full_path, &c.path)))
        .collect();

    MenuEntry {
        key: full_path.to_string(),
        label: route
            .meta
            .title
            .clone()
            .unwrap_or_else(|| route.name.clone()),
        icon: route.meta.icon.clone(),
        children: (!children.is_empty()).then_some(children),
    }
}

/// 查找 key 对应的菜单项
pub fn find<'a>(menu: &'a [MenuEntry], key: &str) -> Option<&'a MenuEntry> {
    menu.iter().find_map(|entry| {
        if entry.key == key {
            return Some(entry);
        }
        entry.children.as_deref().and_then(|c| find(c, key))
    })
}

/// 返回 `path` 所在菜单项的全部祖先 key（用于展开侧边栏），未命中时为空
pub fn open_keys(menu: &[MenuEntry], path: &str) -> Vec<String> {
    let target = normalize_path(path);
    let mut trail = Vec::new();
    if collect_ancestors(menu, &target, &mut trail) {
        trail
    } else {
        Vec::new()
    }
}

fn collect_ancestors(menu: &[MenuEntry], target: &str, trail: &mut Vec<String>) -> bool {
    for entry in menu {
        if entry.key == target {
            return true;
        }
        if let Some(children) = &entry.children {
            trail.push(entry.key.clone());
            if collect_ancestors(children, target, trail) {
                return true;
            }
            trail.pop();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::materializer::{Materializer, ViewRegistry};
    use admin_console_shared::RouteDescriptor;

    fn materialized() -> Vec<MaterializedRoute<u8>> {
        let views = ViewRegistry::new()
            .with("dashboard/DashboardView", 1)
            .with("users/UserListView", 2)
            .with("users/UserRolesView", 3)
            .with("template/form/BasicFormView", 4)
            .with("settings/SettingsView", 5);

        let tree = vec![
            RouteDescriptor::new("/dashboard/", "Dashboard")
                .component("dashboard/DashboardView")
                .title("仪表盘")
                .icon("dashboard")
                .sort(1),
            RouteDescriptor::new("/system", "System")
                .title("系统管理")
                .sort(3)
                .children(vec![
                    RouteDescriptor::new("/list/", "UserList")
                        .component("users/UserListView")
                        .title("用户列表"),
                    RouteDescriptor::new("roles", "UserRoles")
                        .component("users/UserRolesView")
                        .hidden(),
                ]),
            RouteDescriptor::new("template", "Template").sort(4).children(vec![
                RouteDescriptor::new("form", "Form").title("表单").children(vec![
                    RouteDescriptor::new("basic", "BasicForm")
                        .component("template/form/BasicFormView")
                        .title("基础表单"),
                ]),
            ]),
            RouteDescriptor::new("/settings", "Settings")
                .hidden()
                .sort(7)
                .children(vec![
                    RouteDescriptor::new("general", "General")
                        .component("settings/SettingsView")
                        .title("通用设置"),
                ]),
        ];

        Materializer::new(views).materialize_descriptors(&tree).routes
    }

    fn all_keys(menu: &[MenuEntry], out: &mut Vec<String>) {
        for entry in menu {
            out.push(entry.key.clone());
            if let Some(children) = &entry.children {
                all_keys(children, out);
            }
        }
    }

    #[test]
    fn test_project_full_paths_and_labels() {
        let menu = project(&materialized());

        let keys: Vec<&str> = menu.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["/dashboard", "/system", "/template"]);

        assert_eq!(menu[0].label, "仪表盘");
        assert_eq!(menu[0].icon.as_deref(), Some("dashboard"));
        assert!(menu[0].children.is_none());

        // 未设置标题时回退为路由名称
        assert_eq!(menu[2].label, "Template");

        let form = find(&menu, "/template/form").unwrap();
        assert_eq!(form.children.as_ref().unwrap()[0].key, "/template/form/basic");
    }

    #[test]
    fn test_hidden_subtree_never_projected() {
        let menu = project(&materialized());
        let mut keys = Vec::new();
        all_keys(&menu, &mut keys);

        assert!(!keys.iter().any(|k| k.starts_with("/settings")));
        assert!(!keys.contains(&"/system/roles".to_string()));
        assert!(keys.contains(&"/system/list".to_string()));
    }

    #[test]
    fn test_children_absent_when_all_hidden() {
        let views = ViewRegistry::new().with("a/View", 1u8);
        let tree = vec![
            RouteDescriptor::new("/profile", "Profile")
                .component("a/View")
                .children(vec![
                    RouteDescriptor::new("edit", "ProfileEdit").component("a/View").hidden(),
                ]),
        ];
        let routes = Materializer::new(views).materialize_descriptors(&tree).routes;
        let menu = project(&routes);

        assert_eq!(menu.len(), 1);
        assert!(menu[0].children.is_none());
        assert!(!menu[0].has_children());
    }

    #[test]
    fn test_open_keys() {
        let menu = project(&materialized());
        assert_eq!(
            open_keys(&menu, "/template/form/basic"),
            vec!["/template".to_string(), "/template/form".to_string()]
        );
        assert_eq!(open_keys(&menu, "/system/list/"), vec!["/system".to_string()]);
        assert!(open_keys(&menu, "/dashboard").is_empty());
        assert!(open_keys(&menu, "/nowhere").is_empty());
    }

    #[test]
    fn test_menu_serializes_without_empty_fields() {
        let entry = MenuEntry {
            key: "/dashboard".into(),
            label: "仪表盘".into(),
            icon: None,
            children: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"key":"/dashboard","label":"仪表盘"}"#);
    }
}
