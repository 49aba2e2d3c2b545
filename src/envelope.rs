//! Response Envelope: the JSON object returned by every GET and POST.

use serde::Serialize;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const POLICY_NAME: &str = "LocalNetworkAccessRestrictionsEnabled";

/// Common envelope fields plus the method-specific `details`, flattened into
/// the same JSON object.
#[derive(Debug, Serialize)]
pub struct Envelope<D: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub client_ip: String,
    #[serde(flatten)]
    pub details: D,
}

impl<D: Serialize> Envelope<D> {
    pub fn success(
        message: impl Into<String>,
        timestamp: impl Into<String>,
        client_ip: impl Into<String>,
        details: D,
    ) -> Self {
        Self {
            status: "success",
            message: message.into(),
            timestamp: timestamp.into(),
            client_ip: client_ip.into(),
            details,
        }
    }

    /// Two-space indented UTF-8 JSON. Non-ASCII text is written as-is.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// GET details served by the policy variant.
#[derive(Debug, Serialize)]
pub struct PolicyDetails {
    pub requested_path: String,
    pub server_info: PolicyServerInfo,
    pub test_info: TestInfo,
}

#[derive(Debug, Serialize)]
pub struct PolicyServerInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub purpose: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TestInfo {
    pub policy: &'static str,
    pub description: &'static str,
    pub expected_behavior: ExpectedBehavior,
}

/// What the tester should observe with the policy on and off.
#[derive(Debug, Serialize)]
pub struct ExpectedBehavior {
    pub policy_enabled: &'static str,
    pub policy_disabled: &'static str,
}

impl PolicyDetails {
    pub const MESSAGE: &'static str = "LocalNetworkAccessRestrictionsEnabled テストサーバー";

    pub fn new(requested_path: impl Into<String>) -> Self {
        Self {
            requested_path: requested_path.into(),
            server_info: PolicyServerInfo {
                name: "Test HTTP Server",
                version: SERVER_VERSION,
                purpose: "Microsoft Edge ポリシーテスト用",
            },
            test_info: TestInfo {
                policy: POLICY_NAME,
                description: "ローカルネットワークアクセス制限テスト",
                expected_behavior: ExpectedBehavior {
                    policy_enabled: "この要求はブロックされるべき",
                    policy_disabled: "この要求は成功し、この応答が表示される",
                },
            },
        }
    }
}

/// GET details served by the simple variant.
#[derive(Debug, Serialize)]
pub struct SimpleDetails {
    pub server_info: SimpleServerInfo,
    pub request_info: RequestInfo,
}

#[derive(Debug, Serialize)]
pub struct SimpleServerInfo {
    pub server: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RequestInfo {
    pub path: String,
    pub method: String,
    pub user_agent: String,
}

impl SimpleDetails {
    pub const MESSAGE: &'static str = "ローカルネットワークアクセステスト成功";

    pub fn new(path: impl Into<String>, method: impl Into<String>, user_agent: Option<&str>) -> Self {
        Self {
            server_info: SimpleServerInfo {
                server: "simple-test-server",
                version: SERVER_VERSION,
            },
            request_info: RequestInfo {
                path: path.into(),
                method: method.into(),
                user_agent: user_agent.unwrap_or("Unknown").to_string(),
            },
        }
    }
}

/// POST details: the decoded request body.
#[derive(Debug, Serialize)]
pub struct PostDetails {
    pub received_body: String,
}

impl PostDetails {
    pub const MESSAGE: &'static str = "POST要求を受信しました";
}
