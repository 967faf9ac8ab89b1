//! 内置的演示认证后端
//!
//! 在没有真实服务端时提供三个演示账号和一份完整的路由目录。

use std::cell::{Cell, RefCell};

use admin_console_shared::{
    LoginRequest, LoginResponse, RouteDescriptor, Timestamp, TokenPair, UserInfo,
};
use async_trait::async_trait;

use super::adapter::AuthApi;
use crate::error::{ConsoleError, ConsoleResult};

/// 访问令牌有效期（秒）
const TOKEN_TTL_SECS: i64 = 7200;

struct DemoAccount {
    username: &'static str,
    password: &'static str,
    nickname: &'static str,
    role: &'static str,
    permissions: &'static [&'static str],
}

const ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        username: "admin",
        password: "admin123",
        nickname: "超级管理员",
        role: "admin",
        permissions: &["*"],
    },
    DemoAccount {
        username: "user",
        password: "user123",
        nickname: "普通用户",
        role: "user",
        permissions: &["dashboard:view", "user:list", "content:view"],
    },
    DemoAccount {
        username: "test",
        password: "test123",
        nickname: "访客",
        role: "guest",
        permissions: &["dashboard:view"],
    },
];

#[derive(Debug, Clone)]
struct IssuedTokens {
    account: usize,
    token: String,
    refresh_token: String,
}

#[derive(Default)]
pub struct MockAuthApi {
    counter: Cell<u64>,
    issued: RefCell<Vec<IssuedTokens>>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_pair(&self, account: usize) -> IssuedTokens {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        let now = Timestamp::now().as_millis();
        let pair = IssuedTokens {
            account,
            token: format!("mock_token_{}_{}", now, n),
            refresh_token: format!("mock_refresh_{}_{}", now, n),
        };
        self.issued.borrow_mut().push(pair.clone());
        pair
    }

    /// 当前仍有效的令牌数
    pub fn active_tokens(&self) -> usize {
        self.issued.borrow().len()
    }

    /// 演示路由目录
    pub fn route_catalog() -> Vec<RouteDescriptor> {
        vec![
            RouteDescriptor::new("/dashboard", "Dashboard")
                .component("dashboard/DashboardView")
                .title("仪表盘")
                .icon("DashboardOutlined")
                .sort(1),
            RouteDescriptor::new("/system", "System")
                .title("系统管理")
                .icon("SettingOutlined")
                .sort(3)
                .children(vec![
                    RouteDescriptor::new("list", "UserList")
                        .component("users/UserListView")
                        .title("用户列表")
                        .icon("TeamOutlined")
                        .permission("user:list"),
                    RouteDescriptor::new("roles", "UserRoles")
                        .component("users/UserRolesView")
                        .title("用户角色")
                        .icon("SafetyCertificateOutlined")
                        .permission("user:roles"),
                    RouteDescriptor::new("menu", "MenuManagement")
                        .component("system/MenuManagementView")
                        .title("菜单管理")
                        .icon("MenuOutlined")
                        .permission("system:menu"),
                ]),
            RouteDescriptor::new("/template", "Template")
                .title("模板示例")
                .icon("TemplateOutlined")
                .sort(4)
                .children(vec![
                    RouteDescriptor::new("form", "Form")
                        .title("表单页")
                        .icon("FormOutlined")
                        .sort(4)
                        .children(vec![
                            RouteDescriptor::new("basic", "BasicForm")
                                .component("template/form/BasicFormView")
                                .title("基础表单"),
                            RouteDescriptor::new("advanced", "AdvancedForm")
                                .component("template/form/AdvancedFormView")
                                .title("高级表单"),
                        ]),
                    RouteDescriptor::new("table", "Table")
                        .title("表格页")
                        .icon("TableOutlined")
                        .sort(5)
                        .children(vec![
                            RouteDescriptor::new("basic", "BasicTable")
                                .component("template/table/BasicTableView")
                                .title("基础表格"),
                            RouteDescriptor::new("advanced", "AdvancedTable")
                                .component("template/table/AdvancedTableView")
                                .title("高级表格"),
                        ]),
                    RouteDescriptor::new("charts", "Charts")
                        .title("图表页")
                        .icon("BarChartOutlined")
                        .sort(6)
                        .children(vec![
                            RouteDescriptor::new("bar", "BarChart")
                                .component("template/charts/BarChartView")
                                .title("柱状图"),
                            RouteDescriptor::new("line", "LineChart")
                                .component("template/charts/LineChartView")
                                .title("折线图"),
                        ]),
                    RouteDescriptor::new("message", "MessageExample")
                        .component("template/message/MessageExample")
                        .title("消息提示")
                        .icon("NotificationOutlined"),
                ]),
            RouteDescriptor::new("/settings", "Settings")
                .component("settings/SettingsView")
                .title("设置")
                .icon("ToolOutlined")
                .sort(7)
                .hidden(),
            RouteDescriptor::new("/profile", "Profile")
                .component("profile/ProfileView")
                .title("个人中心")
                .icon("UserOutlined")
                .sort(8)
                .hidden(),
            RouteDescriptor::new("/login", "Login")
                .component("auth/LoginView")
                .title("登录")
                .hidden(),
            RouteDescriptor::new("/404", "NotFound")
                .component("error/NotFoundView")
                .title("页面未找到")
                .hidden(),
        ]
    }

    /// 目录中出现的全部视图引用
    pub fn catalog_view_keys() -> Vec<String> {
        fn collect(routes: &[RouteDescriptor], out: &mut Vec<String>) {
            for route in routes {
                if let Some(component) = &route.component {
                    out.push(component.clone());
                }
                collect(route.child_routes(), out);
            }
        }

        let mut keys = Vec::new();
        collect(&Self::route_catalog(), &mut keys);
        keys
    }
}

fn user_info(index: usize, account: &DemoAccount) -> UserInfo {
    UserInfo {
        id: (index + 1).to_string(),
        username: account.username.to_string(),
        nickname: account.nickname.to_string(),
        avatar: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            account.username
        )),
        email: Some(format!("{}@example.com", account.username)),
        phone: None,
        roles: vec![account.role.to_string()],
        permissions: account.permissions.iter().map(|p| p.to_string()).collect(),
        department_id: None,
        department_name: None,
    }
}

#[async_trait(?Send)]
impl AuthApi for MockAuthApi {
    async fn login(&self, request: &LoginRequest) -> ConsoleResult<LoginResponse> {
        let (index, account) = ACCOUNTS
            .iter()
            .enumerate()
            .find(|(_, a)| a.username == request.username && a.password == request.password)
            .ok_or_else(|| ConsoleError::auth("用户名或密码错误").in_op("mock.login"))?;

        let pair = self.next_pair(index);
        Ok(LoginResponse {
            token: pair.token,
            refresh_token: pair.refresh_token,
            user_info: user_info(index, account),
            routes: Self::route_catalog(),
            expires_in: TOKEN_TTL_SECS,
        })
    }

    async fn logout(&self, token: &str) -> ConsoleResult<()> {
        self.issued.borrow_mut().retain(|p| p.token != token);
        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConsoleResult<TokenPair> {
        let account = self
            .issued
            .borrow()
            .iter()
            .find(|p| p.refresh_token == refresh_token)
            .map(|p| p.account)
            .ok_or_else(|| ConsoleError::auth("refresh token expired").in_op("mock.refresh_token"))?;

        self.issued
            .borrow_mut()
            .retain(|p| p.refresh_token != refresh_token);
        let pair = self.next_pair(account);
        Ok(TokenPair {
            token: pair.token,
            refresh_token: pair.refresh_token,
            expires_in: TOKEN_TTL_SECS,
        })
    }

    async fn current_user(&self, token: &str) -> ConsoleResult<UserInfo> {
        let account = self
            .issued
            .borrow()
            .iter()
            .find(|p| p.token == token)
            .map(|p| p.account)
            .ok_or_else(|| ConsoleError::auth("token expired").in_op("mock.current_user"))?;
        Ok(user_info(account, &ACCOUNTS[account]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_demo_accounts() {
        let api = MockAuthApi::new();

        let admin = api.login(&LoginRequest::new("admin", "admin123")).await.unwrap();
        assert_eq!(admin.user_info.permissions, vec!["*"]);
        assert_eq!(admin.expires_in, 7200);
        assert!(admin.token.starts_with("mock_token_"));

        let guest = api.login(&LoginRequest::new("test", "test123")).await.unwrap();
        assert_eq!(guest.user_info.roles, vec!["guest"]);
        assert_ne!(admin.token, guest.token);

        let err = api.login(&LoginRequest::new("test", "wrong")).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let api = MockAuthApi::new();
        let login = api.login(&LoginRequest::new("user", "user123")).await.unwrap();

        let pair = api.refresh_token(&login.refresh_token).await.unwrap();
        assert_ne!(pair.token, login.token);

        // 旧的刷新令牌只能用一次
        assert!(api.refresh_token(&login.refresh_token).await.unwrap_err().is_auth());
        assert_eq!(api.active_tokens(), 1);

        api.logout(&pair.token).await.unwrap();
        assert_eq!(api.active_tokens(), 0);
    }

    #[test]
    fn test_catalog_names_unique() {
        fn names(routes: &[RouteDescriptor], out: &mut Vec<String>) {
            for r in routes {
                out.push(r.name.clone());
                names(r.child_routes(), out);
            }
        }
        let mut all = Vec::new();
        names(&MockAuthApi::route_catalog(), &mut all);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert!(MockAuthApi::catalog_view_keys().contains(&"dashboard/DashboardView".to_string()));
    }
}
