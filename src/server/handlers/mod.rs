pub mod auditor;
pub mod reports;
pub mod session;

pub async fn healthz() -> &'static str {
    "ok"
}
