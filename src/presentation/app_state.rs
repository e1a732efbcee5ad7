// Application state for HTTP handlers
use crate::application::query_service::MetricsQueryService;
use crate::application::settings_service::SettingsService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub query_service: MetricsQueryService,
    pub settings_service: Arc<SettingsService>,
}
