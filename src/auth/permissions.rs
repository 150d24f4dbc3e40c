//! Permission string constants used when gating routes.

pub mod consts {
    // Estimates
    pub const ESTIMATES_READ: &str = "estimates:read";
    pub const ESTIMATES_CREATE: &str = "estimates:create";
    pub const ESTIMATES_UPDATE: &str = "estimates:update";
    pub const ESTIMATES_DELETE: &str = "estimates:delete";

    // Labor rates
    pub const LABOR_MANAGE: &str = "labor:manage";

    // Material catalog
    pub const MATERIALS_SYNC: &str = "materials:sync";

    // Tenancy administration
    pub const CLIENTS_MANAGE: &str = "clients:manage";
    pub const PROJECTS_MANAGE: &str = "projects:manage";
    pub const CUSTOMERS_MANAGE: &str = "customers:manage";
    pub const USERS_MANAGE: &str = "users:manage";
    pub const ROLES_MANAGE: &str = "roles:manage";

    // Billing
    pub const BILLING_MANAGE: &str = "billing:manage";

    // AI assistant
    pub const AI_USE: &str = "ai:use";
}
