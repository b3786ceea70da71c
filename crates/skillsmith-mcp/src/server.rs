//! MCP server implementation - exposes the tool surface (spec §6.3) over
//! the Model Context Protocol, so an MCP-speaking agent can search,
//! inspect, recommend, compare, validate, and install skills.

use crate::stores::Stores;
use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError,
    handler::server::{
        router::{tool::ToolRoute, Router},
        ServerHandler,
    },
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion,
        ServerCapabilities, ServerInfo, Tool,
    },
    ServiceExt,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::Deserialize;
use skillsmith_core::{
    compare, recommend::recommend, suggest_install, sync,
    validate::{self, ValidationOptions},
    AuthMode, Filters, GitHubProvider, Query, RecommendationContext, SyncMode, SyncOptions,
    TrustTier,
};
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

/// Server state: the open catalog/quarantine/audit stores and the
/// process-wide config snapshot they were opened from.
pub struct McpServer {
    stores: Arc<Stores>,
}

impl McpServer {
    /// Open the server against the persisted state named by `config_path`
    /// (or the default `~/.skillsmith` layout when `None`).
    pub async fn open(config_path: Option<&std::path::Path>) -> Result<Self> {
        let stores = Stores::open(config_path).await.context("failed to open stores")?;
        Ok(Self { stores: Arc::new(stores) })
    }

    /// Run the MCP server over stdio.
    pub async fn run(self) -> Result<()> {
        tracing::info!("starting skillsmith MCP server on stdio");

        let router = Router::new(self)
            .with_tool(search_tool_route())
            .with_tool(get_skill_tool_route())
            .with_tool(recommend_tool_route())
            .with_tool(compare_tool_route())
            .with_tool(validate_tool_route())
            .with_tool(suggest_install_tool_route())
            .with_tool(sync_tool_route());

        router.serve(stdio()).await?.waiting().await?;

        Ok(())
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Skillsmith MCP server - search, inspect, recommend, compare, validate, \
                 and sync agent skill documents. Use `search` to find candidates, \
                 `suggest_install` to check whether one is safe to install, and `sync` \
                 to refresh the catalog from upstream."
                    .to_string(),
            ),
        }
    }
}

fn json_ok(value: impl serde::Serialize) -> std::result::Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize response: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn tool_error(err: skillsmith_core::CoreError) -> McpError {
    use skillsmith_core::ErrorKind;
    match err.kind() {
        ErrorKind::Input => McpError::invalid_params(err.to_string(), None),
        _ => McpError::internal_error(err.to_string(), None),
    }
}

// === search ===

/// Request to search the skill catalog (spec §6.3 `search`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchRequest {
    text: Option<String>,
    category: Option<String>,
    trust_tier: Option<String>,
    min_score: Option<u32>,
    safe_only: Option<bool>,
    max_risk: Option<f64>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    20
}

fn search_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "text": {"type": "string", "description": "Free-text query"},
            "category": {"type": "string", "description": "Restrict to a category"},
            "trust_tier": {"type": "string", "description": "Restrict to a trust tier (local, unknown, experimental, community, curated, verified)"},
            "min_score": {"type": "integer", "description": "Minimum composite score (0-100)"},
            "safe_only": {"type": "boolean", "description": "Only return skills whose last scan was safe"},
            "max_risk": {"type": "number", "description": "Maximum risk score (0-100)"},
            "limit": {"type": "integer", "description": "Maximum results to return", "minimum": 1},
            "offset": {"type": "integer", "description": "Offset into the result set", "minimum": 0}
        }
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("search"),
        title: None,
        description: Some(Cow::Borrowed("Search the skill catalog by text and/or filters")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: SearchRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let trust_tier = request
                .trust_tier
                .as_deref()
                .map(TrustTier::from_str)
                .transpose()
                .map_err(|e| McpError::invalid_params(e, None))?;

            let query = Query {
                text: request.text,
                filters: Filters {
                    category: request.category,
                    trust_tier,
                    min_score: request.min_score,
                    max_risk: request.max_risk,
                    safe_only: request.safe_only,
                    compatibility: None,
                },
                limit: request.limit,
                offset: request.offset,
            };

            let engine = skillsmith_core::SearchEngine::new(&ctx.service.stores.catalog, &ctx.service.stores.quarantine);
            let response = engine.search(&query, &[]).await.map_err(tool_error)?;
            json_ok(response)
        }
        .boxed()
    })
}

// === get_skill ===

/// Request to fetch a single skill's catalog record (spec §6.3 `get_skill`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSkillRequest {
    skill_id: String,
}

fn get_skill_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "skill_id": {"type": "string", "description": "Skill id, author/name"}
        },
        "required": ["skill_id"]
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("get_skill"),
        title: None,
        description: Some(Cow::Borrowed("Fetch a single skill's full catalog record")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: GetSkillRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let skill = ctx
                .service
                .stores
                .catalog
                .get_skill(&request.skill_id)
                .await
                .map_err(tool_error)?
                .ok_or_else(|| McpError::invalid_params("skill not found", None))?;
            json_ok(skill)
        }
        .boxed()
    })
}

// === recommend ===

/// Request for contextual recommendations (spec §6.3 `recommend`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecommendRequest {
    role: Option<String>,
    project_description: Option<String>,
    #[serde(default)]
    installed_skills: Vec<String>,
    #[serde(default = "default_recommend_limit")]
    limit: usize,
}

fn default_recommend_limit() -> usize {
    5
}

fn recommend_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "role": {"type": "string", "description": "Caller's declared role (e.g. backend, frontend, devops)"},
            "project_description": {"type": "string", "description": "Free-text project description"},
            "installed_skills": {"type": "array", "items": {"type": "string"}, "description": "Skill ids already installed"},
            "limit": {"type": "integer", "description": "Maximum recommendations to return", "minimum": 1}
        }
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("recommend"),
        title: None,
        description: Some(Cow::Borrowed("Recommend skills for a project context")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: RecommendRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let recommend_ctx = RecommendationContext {
                project_description: request.project_description,
                installed_skills: request.installed_skills.into_iter().collect(),
                role: request.role,
                stack: None,
            };

            let response = recommend(
                &ctx.service.stores.catalog,
                &ctx.service.stores.quarantine,
                &recommend_ctx,
                request.limit,
            )
            .await
            .map_err(tool_error)?;
            json_ok(response)
        }
        .boxed()
    })
}

// === compare ===

/// Request to compare two catalog skills head to head (spec §6.3 `compare`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompareRequest {
    skill_a: String,
    skill_b: String,
}

fn compare_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "skill_a": {"type": "string", "description": "First skill id"},
            "skill_b": {"type": "string", "description": "Second skill id"}
        },
        "required": ["skill_a", "skill_b"]
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("compare"),
        title: None,
        description: Some(Cow::Borrowed("Compare two catalog skills head to head")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: CompareRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let response = compare(&ctx.service.stores.catalog, &request.skill_a, &request.skill_b)
                .await
                .map_err(tool_error)?;
            json_ok(response)
        }
        .boxed()
    })
}

// === validate ===

/// Request to validate a skill document's shape (spec §6.3 `validate`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateRequest {
    content: String,
    #[serde(default)]
    strict: bool,
}

fn validate_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "content": {"type": "string", "description": "Markdown document content"},
            "strict": {"type": "boolean", "description": "Enforce strict mode (frontmatter name required, etc.)"}
        },
        "required": ["content"]
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("validate"),
        title: None,
        description: Some(Cow::Borrowed(
            "Validate a skill document's shape. Never errors: a malformed document is a \
             successful response with valid=false and reasons.",
        )),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: ValidateRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let options = ValidationOptions { strict: request.strict, ..ValidationOptions::default() };
            let response = match validate::validate(request.content.as_bytes(), &options) {
                Ok(_) => serde_json::json!({"valid": true, "reasons": []}),
                Err(e) => serde_json::json!({"valid": false, "reasons": [e.to_string()]}),
            };
            json_ok(response)
        }
        .boxed()
    })
}

// === suggest_install ===

/// Request to check install eligibility (spec §6.3 `suggest-install`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestInstallRequest {
    skill_id: String,
    caller_trust: Option<String>,
}

fn suggest_install_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "skill_id": {"type": "string", "description": "Skill id, author/name"},
            "caller_trust": {"type": "string", "description": "Minimum trust tier the caller accepts (local, unknown, experimental, community, curated, verified)"}
        },
        "required": ["skill_id"]
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("suggest_install"),
        title: None,
        description: Some(Cow::Borrowed("Check whether a skill is allowed to be installed right now")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: SuggestInstallRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let caller_trust = request
                .caller_trust
                .as_deref()
                .map(TrustTier::from_str)
                .transpose()
                .map_err(|e| McpError::invalid_params(e, None))?;

            let response = suggest_install::suggest_install(
                &ctx.service.stores.catalog,
                &ctx.service.stores.quarantine,
                &request.skill_id,
                caller_trust,
            )
            .await
            .map_err(tool_error)?;
            json_ok(response)
        }
        .boxed()
    })
}

// === sync ===

/// Request to run a sync pass against upstream (spec §6.3 `sync`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SyncRequest {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn sync_tool_route() -> ToolRoute<McpServer> {
    use futures::FutureExt;
    use rmcp::handler::server::tool::ToolCallContext;

    let schema: serde_json::Map<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
        "type": "object",
        "properties": {
            "mode": {"type": "string", "description": "'full' or 'differential' (default: differential)"},
            "dry_run": {"type": "boolean", "description": "Fetch and scan but do not persist catalog or checkpoint changes"}
        }
    }))
    .unwrap();

    let tool = Tool {
        name: Cow::Borrowed("sync"),
        title: None,
        description: Some(Cow::Borrowed("Run a differential or full refresh against upstream")),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    };

    ToolRoute::new_dyn(tool, |ctx: ToolCallContext<'_, McpServer>| {
        async move {
            let args = ctx.arguments.clone().unwrap_or_default();
            let request: SyncRequest = serde_json::from_value(serde_json::Value::Object(args))
                .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;

            let mode = match request.mode.as_deref() {
                Some("full") => SyncMode::Full,
                _ => SyncMode::Differential,
            };

            let stores = &ctx.service.stores;
            let auth = AuthMode::select(
                stores.config.auth.app_id.as_deref(),
                stores.config.auth.app_installation_id.as_deref(),
                stores.config.auth.app_private_key.as_deref(),
                stores.config.auth.personal_access_token.as_deref(),
            );
            let provider = GitHubProvider::new(auth);
            let options = SyncOptions { mode, dry_run: request.dry_run, ..SyncOptions::default() };

            let report = sync::sync(
                &provider,
                &stores.catalog,
                &stores.quarantine,
                &stores.audit,
                &stores.config.sync_state_path(),
                &options,
            )
            .await
            .map_err(tool_error)?;
            json_ok(report)
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_twenty() {
        assert_eq!(default_limit(), 20);
    }

    #[test]
    fn default_recommend_limit_is_five() {
        assert_eq!(default_recommend_limit(), 5);
    }
}
