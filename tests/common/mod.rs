#![allow(dead_code)]

use kotoba_gateway::http::DynHttpTransport;
use kotoba_gateway::http::reqwest::default_dyn_transport;
use tracing_subscriber::EnvFilter;

/// 初始化测试日志，`RUST_LOG=kotoba_gateway=debug` 可查看流解码细节
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn transport() -> DynHttpTransport {
    init_tracing();
    default_dyn_transport().expect("reqwest transport")
}

/// 将若干 `data:` 负载拼接为 SSE 响应体
pub fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|payload| format!("data: {payload}\n\n"))
        .collect()
}

/// 读取环境变量，缺失或为空时返回 None
pub fn load_env_var(name: &str) -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
