use utoipa::OpenApi;

use crate::routes::{health, v1};

#[derive(OpenApi)]
#[openapi(info(
    title = "parley-server",
    description = "parley chat API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(v1::api_docs());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn docs_cover_every_api_path() {
        let docs = get_docs();
        for path in [
            "/health",
            "/api/v1/users",
            "/api/v1/users/{id}",
            "/api/v1/conversations",
            "/api/v1/conversations/{id}",
            "/api/v1/conversations/{id}/messages",
        ] {
            assert!(docs.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
