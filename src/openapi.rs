use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EffiBuild API",
        version = "0.3.0",
        description = r#"
# EffiBuild Construction Estimation API

Backend for the EffiBuild platform: estimates with material line items, labor
cost calculation, a supplier-synchronized material catalog, billing, and
AI-assisted blueprint analysis.

## Authentication

All API endpoints (except `/status`, `/health`, and the billing webhook)
require a bearer token issued by the identity provider:

```
Authorization: Bearer <token>
```

Mutating endpoints additionally require the matching resource permission
(e.g. `estimates:create`). The `master_admin` role bypasses permission checks.
"#
    ),
    paths(
        crate::handlers::estimates::create_estimate,
        crate::handlers::estimates::get_estimate,
        crate::handlers::estimates::update_estimate,
        crate::handlers::labor::calculate_labor,
        crate::handlers::materials::sync_material,
        crate::handlers::ai::analyze_blueprint,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::services::estimates::CreateEstimateRequest,
        crate::services::estimates::UpdateEstimateRequest,
        crate::services::estimates::EstimateMaterialInput,
        crate::services::estimates::EstimateResponse,
        crate::services::estimates::EstimateMaterialResponse,
        crate::services::estimates::EstimateStatus,
        crate::services::labor::CalculateLaborRequest,
        crate::services::labor::LaborCalculation,
        crate::services::labor::LaborBreakdown,
        crate::services::labor::FactorAdjustment,
        crate::services::labor::Complexity,
        crate::services::materials::SyncOutcome,
        crate::services::materials::SyncReport,
        crate::services::assistant::AnalyzeBlueprintRequest,
        crate::services::assistant::BlueprintAnalysis,
        crate::services::assistant::RecommendedMaterial,
        crate::services::assistant::LaborEstimateSummary,
        crate::handlers::materials::SyncMaterialRequest,
    )),
    tags(
        (name = "estimates", description = "Estimate lifecycle and PDF export"),
        (name = "labor", description = "Labor cost calculation and rates"),
        (name = "materials", description = "Material catalog and supplier sync"),
        (name = "ai", description = "Assistant-backed blueprint analysis")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
