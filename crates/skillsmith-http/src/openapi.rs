//! OpenAPI specification generation for the Skillsmith HTTP API.

use utoipa::OpenApi;

use crate::types::*;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Skillsmith API",
        version = "1.0.0",
        description = "REST API for discovering, vetting, and recommending agent skills",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        ),
        contact(
            name = "Skillsmith",
            url = "https://github.com/kubiyabot/skillsmith"
        )
    ),
    servers(
        (url = "http://localhost:3000/api", description = "Local development server"),
    ),
    components(
        schemas(
            ApiError,
            SearchParams,
            RecommendRequest,
            CompareRequest,
            ValidateRequest,
            ValidateResponse,
            SuggestInstallParams,
            SyncRequest,
            HealthResponse,
            VersionResponse,
        )
    ),
    tags(
        (name = "search", description = "Catalog search and discovery"),
        (name = "skills", description = "Individual skill lookup and install gating"),
        (name = "sync", description = "Upstream registry synchronization"),
        (name = "system", description = "System health and version"),
    )
)]
pub struct ApiDoc;

/// Generate the OpenAPI specification as JSON.
pub fn generate_openapi_json() -> String {
    ApiDoc::openapi().to_pretty_json().expect("Failed to serialize OpenAPI spec")
}
