//! AI assistant collaborator.
//!
//! Thread-based analysis of processed blueprint data. The only contract with
//! the assistant is: given blueprint JSON, it returns candidate materials and
//! a labor estimate, which are shape-validated and flagged `ai_recommended`.
//! Run polling is bounded; exceeding the bound surfaces a Timeout distinct
//! from a failed run.

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::blueprint::{
        ActiveModel as BlueprintActiveModel, Entity as BlueprintEntity, Model as BlueprintModel,
    },
    entities::project::Entity as ProjectEntity,
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RunState {
    pub id: String,
    pub status: String,
}

impl RunState {
    fn is_terminal(&self) -> bool {
        !matches!(self.status.as_str(), "queued" | "in_progress")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantMessage {
    pub id: String,
    pub role: String,
    pub content: String,
}

#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_thread(&self) -> Result<String, ServiceError>;
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), ServiceError>;
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
        -> Result<String, ServiceError>;
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunState, ServiceError>;
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, ServiceError>;
}

/// Assistants-API HTTP client.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    data: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    role: String,
    content: Vec<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    text: Option<RawText>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    value: String,
}

impl OpenAiClient {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: cfg.assistant_api_url.trim_end_matches('/').to_string(),
            api_key: cfg.assistant_api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ServiceError> {
        self.api_key.as_deref().ok_or_else(|| {
            ServiceError::ExternalServiceError("assistant API key is not configured".to_string())
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "assistant request failed");
                ServiceError::ExternalServiceError(format!("assistant request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "assistant API returned {} for {endpoint}",
                response.status()
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("assistant response malformed: {e}"))
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, ServiceError> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint, "assistant request failed");
                ServiceError::ExternalServiceError(format!("assistant request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "assistant API returned {} for {endpoint}",
                response.status()
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("assistant response malformed: {e}"))
        })
    }
}

#[async_trait]
impl AssistantApi for OpenAiClient {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        let thread: IdResponse = self.post("/threads", json!({})).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), ServiceError> {
        let _: IdResponse = self
            .post(
                &format!("/threads/{thread_id}/messages"),
                json!({"role": "user", "content": content}),
            )
            .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, ServiceError> {
        let run: IdResponse = self
            .post(
                &format!("/threads/{thread_id}/runs"),
                json!({"assistant_id": assistant_id}),
            )
            .await?;
        Ok(run.id)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunState, ServiceError> {
        self.get(&format!("/threads/{thread_id}/runs/{run_id}")).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, ServiceError> {
        let raw: MessageListResponse = self.get(&format!("/threads/{thread_id}/messages")).await?;
        Ok(raw
            .data
            .into_iter()
            .map(|m| AssistantMessage {
                id: m.id,
                role: m.role,
                content: m
                    .content
                    .into_iter()
                    .filter_map(|c| c.text.map(|t| t.value))
                    .collect::<Vec<_>>()
                    .join("\n"),
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendedMaterial {
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit: String,
    #[serde(default)]
    pub ai_recommended: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LaborEstimateSummary {
    #[serde(default)]
    pub hours: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlueprintAnalysis {
    #[serde(default)]
    pub materials: Vec<RecommendedMaterial>,
    #[serde(default)]
    pub labor_estimate: LaborEstimateSummary,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeBlueprintRequest {
    pub blueprint_id: Uuid,
}

/// Registers blueprint data that has already been processed upstream (text
/// extraction happens outside this service).
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterBlueprintRequest {
    pub project_id: Uuid,
    pub file_name: String,
    pub processed_data: serde_json::Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub thread_id: String,
    pub content: String,
}

#[derive(Clone)]
pub struct AssistantService {
    db_pool: Arc<DbPool>,
    api: Arc<dyn AssistantApi>,
    assistant_id: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
    event_sender: Option<Arc<EventSender>>,
}

impl AssistantService {
    pub fn new(
        db_pool: Arc<DbPool>,
        api: Arc<dyn AssistantApi>,
        assistant_id: Option<String>,
        poll_interval: Duration,
        max_poll_attempts: u32,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            api,
            assistant_id,
            poll_interval,
            max_poll_attempts,
            event_sender,
        }
    }

    fn assistant_id(&self) -> Result<&str, ServiceError> {
        self.assistant_id.as_deref().ok_or_else(|| {
            ServiceError::ExternalServiceError("assistant id is not configured".to_string())
        })
    }

    /// Polls the run until it reaches a terminal status, bounded by the
    /// configured attempt budget.
    async fn run_to_completion(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunState, ServiceError> {
        for _ in 0..self.max_poll_attempts {
            let run = self.api.get_run(thread_id, run_id).await?;
            if run.is_terminal() {
                return Ok(run);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(ServiceError::Timeout("assistant run".to_string()))
    }

    async fn run_and_fetch_reply(&self, thread_id: &str) -> Result<AssistantMessage, ServiceError> {
        let assistant_id = self.assistant_id()?.to_string();
        let run_id = self.api.create_run(thread_id, &assistant_id).await?;
        let run = self.run_to_completion(thread_id, &run_id).await?;

        if run.status != "completed" {
            return Err(ServiceError::ExternalServiceError(format!(
                "assistant run ended with status {}",
                run.status
            )));
        }

        // Messages come back newest first
        self.api
            .list_messages(thread_id)
            .await?
            .into_iter()
            .find(|m| m.role == "assistant")
            .ok_or_else(|| {
                ServiceError::ExternalServiceError("assistant produced no reply".to_string())
            })
    }

    /// Stores a processed blueprint so it can be analyzed.
    #[instrument(skip(self, request), fields(project_id = %request.project_id))]
    pub async fn register_blueprint(
        &self,
        request: RegisterBlueprintRequest,
    ) -> Result<BlueprintModel, ServiceError> {
        if request.file_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "file_name is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        ProjectEntity::find_by_id(request.project_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))?;

        let model = BlueprintActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(request.project_id),
            file_name: Set(request.file_name),
            processed_data: Set(request.processed_data),
            ai_analysis: Set(None),
            status: Set("processed".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(blueprint_id = %model.id, "blueprint registered");
        Ok(model)
    }

    /// Analyzes a processed blueprint: posts its data to a fresh thread, runs
    /// the assistant, parses the recommendation payload, and persists it on
    /// the blueprint row.
    #[instrument(skip(self, request), fields(blueprint_id = %request.blueprint_id))]
    pub async fn analyze_blueprint(
        &self,
        request: AnalyzeBlueprintRequest,
    ) -> Result<BlueprintAnalysis, ServiceError> {
        let db = &*self.db_pool;
        let blueprint = BlueprintEntity::find_by_id(request.blueprint_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Blueprint not found".to_string()))?;

        let thread_id = self.api.create_thread().await?;
        let prompt = format!(
            "Please analyze this blueprint data and provide material and labor estimates. \
             The blueprint is from {}:\n\n{}",
            blueprint.file_name,
            serde_json::to_string_pretty(&blueprint.processed_data)?
        );
        self.api.add_message(&thread_id, &prompt).await?;

        let reply = self.run_and_fetch_reply(&thread_id).await?;
        let mut analysis = parse_analysis(&reply.content)?;
        for material in &mut analysis.materials {
            material.ai_recommended = true;
        }

        let analysis_json = serde_json::to_value(&analysis)?;
        let mut active: BlueprintActiveModel = blueprint.into();
        active.ai_analysis = Set(Some(analysis_json));
        active.status = Set("analyzed".to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await?;

        info!(blueprint_id = %request.blueprint_id, materials = analysis.materials.len(), "blueprint analyzed");
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::BlueprintAnalyzed(request.blueprint_id))
                .await
            {
                warn!(error = %e, "Failed to send blueprint event");
            }
        }

        Ok(analysis)
    }

    /// Opens a new conversation thread for the dashboard assistant.
    pub async fn create_thread(&self) -> Result<String, ServiceError> {
        self.api.create_thread().await
    }

    /// Sends a message on an existing thread and returns the assistant reply.
    #[instrument(skip(self, request), fields(thread_id = %request.thread_id))]
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<AssistantMessage, ServiceError> {
        if request.content.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "message content is required".to_string(),
            ));
        }
        self.api
            .add_message(&request.thread_id, &request.content)
            .await?;
        self.run_and_fetch_reply(&request.thread_id).await
    }

    pub async fn list_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<AssistantMessage>, ServiceError> {
        self.api.list_messages(thread_id).await
    }
}

/// Parses the assistant's reply into a `BlueprintAnalysis`. Replies often
/// arrive wrapped in prose or markdown fences, so fall back to the outermost
/// JSON object before giving up.
fn parse_analysis(content: &str) -> Result<BlueprintAnalysis, ServiceError> {
    if let Ok(analysis) = serde_json::from_str::<BlueprintAnalysis>(content) {
        return Ok(analysis);
    }

    let start = content.find('{');
    let end = content.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(analysis) = serde_json::from_str::<BlueprintAnalysis>(&content[start..=end]) {
                return Ok(analysis);
            }
        }
    }

    Err(ServiceError::ExternalServiceError(
        "assistant reply did not contain a parsable analysis".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn parses_clean_json() {
        let content = r#"{
            "materials": [
                {"name": "2x4 Lumber", "quantity": 120, "unit_price": 3.5, "unit": "piece"}
            ],
            "labor_estimate": {"hours": 40, "rate": 75, "total": 3000},
            "recommendations": ["Order 10% extra lumber"]
        }"#;

        let analysis = parse_analysis(content).expect("should parse");
        assert_eq!(analysis.materials.len(), 1);
        assert_eq!(analysis.materials[0].quantity, dec!(120));
        assert_eq!(analysis.labor_estimate.total, dec!(3000));
        assert_eq!(analysis.recommendations.len(), 1);
    }

    #[test]
    fn parses_fenced_json() {
        let content = "Here is the analysis:\n```json\n{\"materials\": [], \"recommendations\": []}\n```";
        let analysis = parse_analysis(content).expect("should parse fenced JSON");
        assert!(analysis.materials.is_empty());
    }

    #[test]
    fn garbage_reply_is_an_error() {
        assert!(matches!(
            parse_analysis("I could not analyze this blueprint."),
            Err(ServiceError::ExternalServiceError(_))
        ));
    }

    struct StubApi {
        polls_until_complete: u32,
        polls: AtomicU32,
    }

    #[async_trait]
    impl AssistantApi for StubApi {
        async fn create_thread(&self) -> Result<String, ServiceError> {
            Ok("thread_1".to_string())
        }

        async fn add_message(&self, _thread_id: &str, _content: &str) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str,
        ) -> Result<String, ServiceError> {
            Ok("run_1".to_string())
        }

        async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<RunState, ServiceError> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            let status = if polls >= self.polls_until_complete {
                "completed"
            } else {
                "in_progress"
            };
            Ok(RunState {
                id: run_id.to_string(),
                status: status.to_string(),
            })
        }

        async fn list_messages(
            &self,
            _thread_id: &str,
        ) -> Result<Vec<AssistantMessage>, ServiceError> {
            Ok(vec![AssistantMessage {
                id: "msg_1".to_string(),
                role: "assistant".to_string(),
                content: "{\"materials\": [], \"recommendations\": []}".to_string(),
            }])
        }
    }

    fn service_with(api: StubApi, max_attempts: u32) -> AssistantService {
        AssistantService::new(
            Arc::new(sea_orm::DatabaseConnection::Disconnected),
            Arc::new(api),
            Some("asst_test".to_string()),
            Duration::from_millis(0),
            max_attempts,
            None,
        )
    }

    #[tokio::test]
    async fn polling_finishes_when_run_completes() {
        let service = service_with(
            StubApi {
                polls_until_complete: 3,
                polls: AtomicU32::new(0),
            },
            10,
        );

        let run = service
            .run_to_completion("thread_1", "run_1")
            .await
            .expect("run should complete");
        assert_eq!(run.status, "completed");
    }

    #[tokio::test]
    async fn polling_times_out_after_attempt_budget() {
        let service = service_with(
            StubApi {
                polls_until_complete: u32::MAX,
                polls: AtomicU32::new(0),
            },
            3,
        );

        assert!(matches!(
            service.run_to_completion("thread_1", "run_1").await,
            Err(ServiceError::Timeout(_))
        ));
    }
}
