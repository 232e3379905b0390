pub mod ai_service;
pub mod analytics_service;
pub mod auth_service;
pub mod expense_service;
pub mod export_service;

use std::sync::Arc;

pub use ai_service::AiService;
pub use analytics_service::{AnalyticsService, DateRange, DEFAULT_TREND_DAYS};
pub use auth_service::AuthService;
pub use expense_service::ExpenseService;
pub use export_service::{ExportBlob, ExportFormat, ExportPeriod, ExportRequest, ExportService, ExportedFile};

use crate::config::ClientConfig;
use crate::gateway::RequestGateway;
use crate::session::SessionManager;

/// Every endpoint wrapper over one shared gateway and session
#[derive(Debug, Clone)]
pub struct Services {
    pub gateway: RequestGateway,
    pub auth: AuthService,
    pub expenses: ExpenseService,
    pub analytics: AnalyticsService,
    pub ai: AiService,
    pub export: ExportService,
}

impl Services {
    pub fn new(config: &ClientConfig, session: Arc<SessionManager>) -> Result<Self, reqwest::Error> {
        Ok(Self::from_gateway(RequestGateway::new(config, session)?))
    }

    pub fn from_gateway(gateway: RequestGateway) -> Self {
        Self {
            auth: AuthService::new(gateway.clone()),
            expenses: ExpenseService::new(gateway.clone()),
            analytics: AnalyticsService::new(gateway.clone()),
            ai: AiService::new(gateway.clone()),
            export: ExportService::new(gateway.clone()),
            gateway,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.gateway.session()
    }
}
