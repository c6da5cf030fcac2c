//! HTTP 层集成测试
//!
//! 通过 `tower::ServiceExt::oneshot` 直接驱动路由

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use site_deploy_agent::api;
use site_deploy_agent::config::env::constants::MAX_BODY_BYTES;
use site_deploy_agent::config::EnvConfig;
use site_deploy_agent::state::AppState;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "test-deploy-token";
const BOUNDARY: &str = "----site-deploy-boundary";

struct TestServer {
    router: Router,
    root: PathBuf,
    _temp_dir: TempDir,
}

impl TestServer {
    fn new(allowed_origin: Option<&str>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().unwrap();
        let config = EnvConfig {
            auth_token: TOKEN.to_string(),
            deployment_path: root.clone(),
            port: 0,
            allowed_origins: allowed_origin.map(str::to_string),
            log_path: root.join("logs"),
            export_type: None,
            templates_dir: None,
        };
        let state = Arc::new(AppState::new(config));
        Self {
            router: api::router(state),
            root,
            _temp_dir: temp_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        write!(body, "--{}\r\n", BOUNDARY).unwrap();
        match part {
            Part::Text(name, value) => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    name, value
                )
                .unwrap();
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                write!(
                    body,
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    name, filename, content_type
                )
                .unwrap();
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    write!(body, "--{}--\r\n", BOUNDARY).unwrap();
    body
}

fn deploy_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/deploy")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_health_with_token() {
    let server = TestServer::new(None);
    let response = server.send(get("/health", Some(TOKEN))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Server is running properly");
}

#[tokio::test]
async fn test_health_without_token() {
    let server = TestServer::new(None);
    let response = server.send(get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid authentication");
}

#[tokio::test]
async fn test_health_with_wrong_token() {
    let server = TestServer::new(None);
    let response = server.send(get("/health", Some("test-deploy-tokeN"))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_info() {
    let server = TestServer::new(None);
    let response = server.send(get("/info", Some(TOKEN))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["deployment_path"], server.root.display().to_string());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    let server_time = body["server_time"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(server_time).is_ok());
}

#[tokio::test]
async fn test_upload_files() {
    let server = TestServer::new(None);
    let a = [b'a'; 10];
    let b = [b'b'; 20];
    let request = deploy_request(&[
        Part::Text("export_type", "hugo"),
        Part::File {
            name: "files",
            filename: "a.txt",
            content_type: "text/plain",
            data: &a,
        },
        Part::File {
            name: "files",
            filename: "b.txt",
            content_type: "text/plain",
            data: &b,
        },
    ]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["path"], "a.txt");
    assert_eq!(files[0]["size"], 10);
    assert_eq!(files[0]["content_type"], "text/plain");
    assert_eq!(files[1]["path"], "b.txt");
    assert_eq!(files[1]["size"], 20);
    assert_eq!(std::fs::read(server.root.join("hugo/a.txt")).unwrap(), a);
    assert_eq!(std::fs::read(server.root.join("hugo/b.txt")).unwrap(), b);
}

#[tokio::test]
async fn test_upload_fields_after_files() {
    let server = TestServer::new(None);
    let request = deploy_request(&[
        Part::File {
            name: "files",
            filename: "post.md",
            content_type: "text/markdown",
            data: b"# post",
        },
        Part::Text("relative_path", "blog/posts"),
        Part::Text("export_type", "jekyll"),
    ]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["files"][0]["path"], "blog/posts/post.md");
    assert!(server.root.join("jekyll/blog/posts/post.md").is_file());
}

#[tokio::test]
async fn test_init_with_template_zip() {
    let server = TestServer::new(None);
    let zip = build_zip(&[
        ("index.html", "<html></html>"),
        ("assets/style.css", "body { margin: 0 }"),
    ]);
    let request = deploy_request(&[
        Part::Text("export_type", "hugo"),
        Part::Text("init", "true"),
        Part::File {
            name: "template_zip",
            filename: "site.zip",
            content_type: "application/zip",
            data: &zip,
        },
    ]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let deploy_path = server.root.join("hugo");
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        format!(
            "Successfully initialized hugo site template at {}",
            deploy_path.display()
        )
    );
    assert!(body.get("files").is_none());
    assert!(deploy_path.join("index.html").is_file());
    assert_eq!(
        std::fs::read(deploy_path.join("assets/style.css")).unwrap(),
        b"body { margin: 0 }"
    );
}

#[tokio::test]
async fn test_init_with_zip_slip_archive() {
    let server = TestServer::new(None);
    let zip = build_zip(&[("../../evil.txt", "pwned")]);
    let request = deploy_request(&[
        Part::Text("init", "true"),
        Part::File {
            name: "template_zip",
            filename: "evil.zip",
            content_type: "application/zip",
            data: &zip,
        },
    ]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Error extracting ZIP file"));
    assert!(!server.root.join("evil.txt").exists());
    assert!(!server.root.parent().unwrap().join("evil.txt").exists());
}

#[tokio::test]
async fn test_traversal_relative_path() {
    let server = TestServer::new(None);
    let request = deploy_request(&[
        Part::Text("relative_path", "../../etc"),
        Part::File {
            name: "files",
            filename: "a.txt",
            content_type: "text/plain",
            data: b"x",
        },
    ]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid relative path");
    assert!(!server.root.join("hugo").exists());
}

#[tokio::test]
async fn test_body_over_limit_rejected() {
    let server = TestServer::new(None);
    let data = vec![b'x'; MAX_BODY_BYTES + 10];
    let request = deploy_request(&[Part::File {
        name: "files",
        filename: "big.bin",
        content_type: "application/octet-stream",
        data: &data,
    }]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(!server.root.join("hugo").exists());
}

#[tokio::test]
async fn test_no_files() {
    let server = TestServer::new(None);
    let request = deploy_request(&[Part::Text("export_type", "hugo")]);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "No files sent");
}

#[tokio::test]
async fn test_deploy_requires_token() {
    let server = TestServer::new(None);
    let mut request = deploy_request(&[Part::File {
        name: "files",
        filename: "a.txt",
        content_type: "text/plain",
        data: b"x",
    }]);
    request.headers_mut().remove(header::AUTHORIZATION);

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!server.root.join("hugo").exists());
}

#[tokio::test]
async fn test_deploy_wrong_method() {
    let server = TestServer::new(None);
    let response = server.send(get("/deploy", Some(TOKEN))).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Method not allowed");
}

#[tokio::test]
async fn test_deploy_not_multipart() {
    let server = TestServer::new(None);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/deploy")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_preflight_with_cors() {
    let server = TestServer::new(Some("https://example.com"));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/deploy")
        .body(Body::empty())
        .unwrap();

    let response = server.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://example.com"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "POST, GET, OPTIONS"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_cors_headers_on_rejection() {
    let server = TestServer::new(Some("https://example.com"));
    let response = server.send(get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://example.com"
    );
}

#[tokio::test]
async fn test_no_cors_headers_without_origin() {
    let server = TestServer::new(None);
    let response = server.send(get("/health", Some(TOKEN))).await;

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
