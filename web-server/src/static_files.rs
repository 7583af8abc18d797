// web-server/src/static_files.rs
use actix_web::{web, HttpRequest, HttpResponse, Result, Error};
use actix_files::{Files, NamedFile};
use common::StaticFilesConfig;
use std::path::PathBuf;

// Resolved location of the built admin front-end
#[derive(Clone)]
struct SpaRoot {
    root_path: PathBuf,
    index_file: String,
}

// Async handler function for SPA fallback
async fn spa_index(req: HttpRequest, root: web::Data<SpaRoot>) -> Result<HttpResponse, Error> {
    // API routes are proxied elsewhere; never answer them with the app shell
    if req.path().starts_with("/api/") {
        return Ok(HttpResponse::NotFound().finish());
    }

    // For all other unmatched routes, serve the index file (client-side routing)
    let index_path = root.root_path.join(&root.index_file);
    let file = NamedFile::open(index_path)?;
    Ok(file.into_response(&req))
}

// Configure static file serving with SPA support
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    let root = SpaRoot {
        root_path: PathBuf::from(&config.path),
        index_file: config.index.clone(),
    };

    cfg.app_data(web::Data::new(root.clone()))
        .service(
            Files::new("/", &root.root_path)
                .index_file(&root.index_file)
                .prefer_utf8(true)
                .use_etag(true)
                .use_last_modified(true)
                .default_handler(web::to(spa_index)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    fn site() -> (tempfile::TempDir, StaticFilesConfig) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>zenow admin</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('ok')").unwrap();
        let config = StaticFilesConfig {
            path: dir.path().display().to_string(),
            index: "index.html".to_string(),
        };
        (dir, config)
    }

    #[actix_web::test]
    async fn test_serves_assets_and_falls_back_to_index() {
        let (_dir, config) = site();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &config))).await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/app.js").to_request()).await;
        assert_eq!(res.status(), 200);

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/dashboard/courses/3").to_request(),
        )
        .await;
        assert_eq!(res.status(), 200);
        let body = test::read_body(res).await;
        assert_eq!(body, "<html>zenow admin</html>");
    }

    #[actix_web::test]
    async fn test_api_paths_are_not_rewritten() {
        let (_dir, config) = site();
        let app = test::init_service(App::new().configure(|cfg| configure(cfg, &config))).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/admin/courses").to_request(),
        )
        .await;
        assert_eq!(res.status(), 404);
    }
}
