pub mod ai;
pub mod billing;
pub mod clients;
pub mod common;
pub mod customers;
pub mod estimates;
pub mod labor;
pub mod materials;
pub mod projects;
pub mod roles;
pub mod users;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    assistant::{AssistantApi, AssistantService},
    billing::{BillingService, PaymentProviderApi},
    clients::ClientService,
    customers::CustomerService,
    estimates::EstimateService,
    labor::LaborService,
    materials::MaterialService,
    projects::ProjectService,
    roles::RoleService,
    supplier::SupplierApi,
    users::UserService,
};
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub estimates: Arc<EstimateService>,
    pub labor: Arc<LaborService>,
    pub materials: Arc<MaterialService>,
    pub clients: Arc<ClientService>,
    pub projects: Arc<ProjectService>,
    pub customers: Arc<CustomerService>,
    pub users: Arc<UserService>,
    pub roles: Arc<RoleService>,
    pub billing: Arc<BillingService>,
    pub assistant: Arc<AssistantService>,
}

impl AppServices {
    /// Wires every service against the shared pool, event channel, and the
    /// external collaborator clients.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        supplier: Arc<dyn SupplierApi>,
        payment_provider: Arc<dyn PaymentProviderApi>,
        assistant_api: Arc<dyn AssistantApi>,
        config: &AppConfig,
    ) -> Self {
        let estimates = Arc::new(EstimateService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let labor = Arc::new(LaborService::new(db_pool.clone()));
        let materials = Arc::new(MaterialService::new(
            db_pool.clone(),
            supplier,
            Some(event_sender.clone()),
        ));
        let clients = Arc::new(ClientService::new(db_pool.clone()));
        let projects = Arc::new(ProjectService::new(db_pool.clone()));
        let customers = Arc::new(CustomerService::new(db_pool.clone()));
        let users = Arc::new(UserService::new(db_pool.clone()));
        let roles = Arc::new(RoleService::new(db_pool.clone()));
        let billing = Arc::new(BillingService::new(
            db_pool.clone(),
            payment_provider,
            config.billing_webhook_secret.clone(),
            Some(event_sender.clone()),
        ));
        let assistant = Arc::new(AssistantService::new(
            db_pool,
            assistant_api,
            config.assistant_id.clone(),
            Duration::from_millis(config.assistant_poll_interval_ms),
            config.assistant_max_poll_attempts,
            Some(event_sender),
        ));

        Self {
            estimates,
            labor,
            materials,
            clients,
            projects,
            customers,
            users,
            roles,
            billing,
            assistant,
        }
    }
}
