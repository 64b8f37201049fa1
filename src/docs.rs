use std::sync::Arc;

use aide::{
    axum::{
        routing::{get, get_with},
        ApiRouter, IntoApiResponse,
    },
    openapi::{OpenApi, Tag},
    redoc::Redoc,
    transform::TransformOpenApi,
};
use axum::{response::IntoResponse, Extension, Json};

fn tag(name: &str, description: &str) -> Tag {
    Tag {
        name: name.into(),
        description: Some(description.into()),
        ..Default::default()
    }
}

pub fn api_docs(api: TransformOpenApi) -> TransformOpenApi {
    api.title("coffee-passport")
        .summary("Loyalty passport for coffee shops")
        .description("Browse cafes, rate them, collect one stamp per visited cafe and follow your favourites.")
        .tag(tag("auth", "Login, registration and session checks"))
        .tag(tag("cafes", "Cafe catalog and its administration"))
        .tag(tag("opinions", "Ratings and comments"))
        .tag(tag("passport", "Stamps and the profile of the caller"))
        .tag(tag("follows", "Followed cafes"))
        .security_scheme(
            "SessionToken",
            aide::openapi::SecurityScheme::Http {
                scheme: "bearer".into(),
                bearer_format: Some("JWT".into()),
                description: Some("Token returned by `POST /api/login`.".into()),
                extensions: Default::default(),
            },
        )
}

pub fn docs_routes() -> ApiRouter {
    // Infer the response of the redoc page so it is documented as `text/html`.
    aide::gen::infer_responses(true);

    let router = ApiRouter::new()
        .api_route(
            "/",
            get_with(
                Redoc::new("/docs/api.json")
                    .with_title("coffee-passport")
                    .axum_handler(),
                |op| op.description("This documentation page."),
            ),
        )
        .route("/api.json", get(serve_docs));

    aide::gen::infer_responses(false);

    router
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
    Json(api).into_response()
}
