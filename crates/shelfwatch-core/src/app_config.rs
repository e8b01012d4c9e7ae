#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    /// Master switch; when false no timer is registered regardless of the
    /// per-loop switches below.
    pub enable_scheduler: bool,
    pub enable_check_scheduler: bool,
    pub enable_email_scheduler: bool,
    pub enable_tracking_scheduler: bool,
    pub enable_retention_scheduler: bool,

    pub check_interval_minutes: u64,
    pub email_delivery_interval_minutes: u64,
    pub tracking_interval_minutes: u64,
    pub retention_interval_hours: u64,
    pub retention_days: u32,

    pub min_check_interval_minutes: u32,
    pub max_products_per_run: i64,
    pub check_lock_timeout_seconds: u64,
    pub tracking_concurrency: usize,

    pub disable_rendered_fetch: bool,
    pub fetch_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub fetch_deadline_secs: u64,
    pub fetch_user_agent: String,

    pub worker_port: u16,
    pub email_webhook_url: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("enable_scheduler", &self.enable_scheduler)
            .field("enable_check_scheduler", &self.enable_check_scheduler)
            .field("enable_email_scheduler", &self.enable_email_scheduler)
            .field("enable_tracking_scheduler", &self.enable_tracking_scheduler)
            .field(
                "enable_retention_scheduler",
                &self.enable_retention_scheduler,
            )
            .field("check_interval_minutes", &self.check_interval_minutes)
            .field(
                "email_delivery_interval_minutes",
                &self.email_delivery_interval_minutes,
            )
            .field("tracking_interval_minutes", &self.tracking_interval_minutes)
            .field("retention_interval_hours", &self.retention_interval_hours)
            .field("retention_days", &self.retention_days)
            .field(
                "min_check_interval_minutes",
                &self.min_check_interval_minutes,
            )
            .field("max_products_per_run", &self.max_products_per_run)
            .field("check_lock_timeout_seconds", &self.check_lock_timeout_seconds)
            .field("tracking_concurrency", &self.tracking_concurrency)
            .field("disable_rendered_fetch", &self.disable_rendered_fetch)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("fetch_deadline_secs", &self.fetch_deadline_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("worker_port", &self.worker_port)
            .field(
                "email_webhook_url",
                &self.email_webhook_url.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
