use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use desk_shell::{AccessToken, Error, GithubClient, GithubConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GithubClient {
    let config = GithubConfig::new("client-123", "tauri://localhost".parse().unwrap())
        .with_api_url(server.uri().parse().unwrap());
    GithubClient::new(config)
}

#[tokio::test]
async fn repo_info_strips_git_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "hello",
            "full_name": "octocat/hello",
            "private": true,
            "default_branch": "main"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = client(&server)
        .repo_info(None, "octocat", "hello.git")
        .await
        .unwrap();
    assert_eq!(repo.full_name, "octocat/hello");
    assert!(repo.private);
    assert_eq!(repo.default_branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn missing_repo_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .repo_info(None, "octocat", "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(ref msg) if msg.contains("octocat/ghost")));
}

#[tokio::test]
async fn contents_of_single_file_is_one_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello/contents/src/main.rs"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "main.rs",
            "path": "src/main.rs",
            "type": "file",
            "size": 42
        })))
        .mount(&server)
        .await;

    let entries = client(&server)
        .repo_contents(Some(&AccessToken::new("tok")), "octocat", "hello", "src/main.rs")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "file");
    assert_eq!(entries[0].size, 42);
}

#[tokio::test]
async fn root_contents_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "src", "path": "src", "type": "dir" },
            { "name": "README.md", "path": "README.md", "type": "file", "size": 10 }
        ])))
        .mount(&server)
        .await;

    let entries = client(&server)
        .repo_contents(None, "octocat", "hello", "")
        .await
        .unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["src", "README.md"]);
}

#[tokio::test]
async fn file_content_is_base64_decoded() {
    let server = MockServer::start().await;
    let encoded = STANDARD.encode("fn main() {\n    println!(\"hi\");\n}\n");
    // GitHub wraps base64 content at 60 columns
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect::<Vec<_>>()
        .join("\n");

    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello/contents/src/main.rs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": wrapped,
            "encoding": "base64"
        })))
        .mount(&server)
        .await;

    let text = client(&server)
        .file_content(None, "octocat", "hello", "src/main.rs")
        .await
        .unwrap();
    assert_eq!(text, "fn main() {\n    println!(\"hi\");\n}\n");
}

#[tokio::test]
async fn fallback_token_used_when_none_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octocat/hello"))
        .and(header("authorization", "Bearer public-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "hello",
            "full_name": "octocat/hello"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = GithubConfig::new("client-123", "tauri://localhost".parse().unwrap())
        .with_api_url(server.uri().parse().unwrap())
        .with_fallback_token(AccessToken::new("public-tok"));
    let repo = GithubClient::new(config)
        .repo_info(None, "octocat", "hello")
        .await
        .unwrap();
    assert_eq!(repo.id, 7);
}

#[tokio::test]
async fn remote_error_carries_github_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .get_user(&AccessToken::new("expired"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Remote { operation: "user info", status: 401, ref detail } if detail == "Bad credentials"
    ));
}
