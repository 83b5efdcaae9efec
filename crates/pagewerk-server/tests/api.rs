// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests of the HTTP API against an in-process router.

use std::io::{Cursor, Read};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pagewerk_core::ServiceConfig;
use pagewerk_document::pdf::fixtures::{fixture_width, page_widths, sample_pdf, sample_png};
use pagewerk_server::{AppState, router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "pagewerk-test-boundary";

enum Part<'a> {
    File(&'a str, &'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServiceConfig {
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("merged"),
            ..ServiceConfig::default()
        };
        let state = AppState::new(config).expect("state");
        let router = router(state.clone());
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
        self.send(request).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn post_form(&self, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("request");
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    /// Upload `data` and return the stored name.
    async fn upload(&self, file_name: &str, data: &[u8], session: Option<&str>) -> String {
        let mut parts = vec![Part::File("file", file_name, data)];
        if let Some(session) = session {
            parts.push(Part::Text("session_id", session));
        }
        let (status, body) = self.post_form("/upload", &parts).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["original_name"].as_str().expect("stored name").to_string()
    }

    /// Fetch the artifact a page endpoint published.
    async fn download(&self, body: &Value) -> Vec<u8> {
        let url = body["url"].as_str().expect("url");
        let (status, bytes) = self.get(url).await;
        assert_eq!(status, StatusCode::OK);
        bytes
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn widths(indices: &[usize]) -> Vec<f32> {
    indices.iter().map(|&i| fixture_width(i)).collect()
}

#[tokio::test]
async fn health_reports_version() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, _) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn split_keeps_selected_pages_and_reports_dropped() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(5), None).await;

    let (status, body) = app
        .post_json("/split", json!({ "filename": name, "page_ranges": "1,3-5,99" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["page_count"], 4);
    assert_eq!(body["dropped"], json!([{ "index": 98, "page_count": 5 }]));

    let pdf = app.download(&body).await;
    assert_eq!(page_widths(&pdf), widths(&[0, 2, 3, 4]));
}

#[tokio::test]
async fn split_separate_zips_one_pdf_per_page() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(4), None).await;

    let (status, body) = app
        .post_json(
            "/split",
            json!({ "filename": name, "page_ranges": "1,3", "mode": "separate" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["url"].as_str().expect("url").ends_with(".zip"));

    let zip = app.download(&body).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(zip)).expect("zip");
    assert_eq!(archive.len(), 2);
    let mut third = Vec::new();
    archive
        .by_name("page_3.pdf")
        .expect("entry")
        .read_to_end(&mut third)
        .expect("read");
    assert_eq!(page_widths(&third), widths(&[2]));
}

#[tokio::test]
async fn malformed_range_is_rejected_before_any_lookup() {
    let app = TestApp::new();
    // The file does not exist; the range error must win.
    let (status, body) = app
        .post_json("/extract", json!({ "filename": "missing.pdf", "pages": "3-1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_range");
}

#[tokio::test]
async fn removing_every_page_is_an_empty_result() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(3), None).await;

    let (status, body) = app
        .post_json("/remove", json!({ "filename": name, "pages": "1-3" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_result");

    let (status, body) = app
        .post_json("/remove", json!({ "filename": name, "pages": "2" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page_widths(&app.download(&body).await), widths(&[0, 2]));
}

#[tokio::test]
async fn organize_follows_the_index_list() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(5), None).await;

    let (status, body) = app
        .post_json(
            "/organize",
            json!({ "filename": name, "page_indices": [2, 0, 0, 4, 99] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["page_count"], 4);
    assert_eq!(body["dropped"][0]["index"], 99);
    assert_eq!(page_widths(&app.download(&body).await), widths(&[2, 0, 0, 4]));
}

#[tokio::test]
async fn merge_concatenates_in_list_order() {
    let app = TestApp::new();
    let a = app.upload("a.pdf", &sample_pdf(3), None).await;
    let b = app.upload("b.pdf", &sample_pdf(2), None).await;

    let (status, body) = app.post_json("/merge", json!({ "files": [a, b] })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["page_count"], 5);
    assert!(body.get("dropped").is_none());
    assert_eq!(
        page_widths(&app.download(&body).await),
        widths(&[0, 1, 2, 0, 1])
    );
}

#[tokio::test]
async fn outputs_can_feed_further_operations() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(4), None).await;

    let (_, rotated) = app
        .post_json("/rotate", json!({ "filename": name, "angle": 90, "pages": "1" }))
        .await;
    let output = rotated["url"]
        .as_str()
        .and_then(|url| url.strip_prefix("/download/"))
        .expect("output name")
        .to_string();

    let (status, body) = app
        .post_json("/extract", json!({ "filename": output, "pages": "1" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reader = pagewerk_document::PdfReader::from_bytes(&app.download(&body).await).expect("pdf");
    assert_eq!(reader.rotation(0), 180);
}

#[tokio::test]
async fn bad_rotation_and_crop_are_client_errors() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(1), None).await;

    let (status, body) = app
        .post_json("/rotate", json!({ "filename": name, "angle": 45 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameter");

    let (status, _) = app
        .post_json(
            "/crop",
            json!({ "filename": name, "left": 80, "right": 80 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn page_numbers_and_annotations_produce_pdfs() {
    let app = TestApp::new();
    let name = app.upload("doc.pdf", &sample_pdf(3), None).await;

    let (status, body) = app
        .post_json(
            "/page-numbers",
            json!({ "filename": name, "template": "{n} / {total}", "pages": "2-3" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["page_count"], 3);

    let (status, body) = app
        .post_json(
            "/annotate",
            json!({
                "filename": name,
                "annotations": [
                    { "page": 1, "text": "checked", "x": 10, "y": 20 },
                    { "page": 9, "text": "nowhere", "x": 0, "y": 0 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["dropped"][0]["index"], 8);
}

#[tokio::test]
async fn watermark_validates_position() {
    let app = TestApp::new();
    let pdf = sample_pdf(2);

    let (status, body) = app
        .post_form(
            "/watermark",
            &[
                Part::File("file", "doc.pdf", &pdf),
                Part::Text("position", "tiled"),
                Part::Text("repeat_x", "2"),
                Part::Text("color", "not-a-colour"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(page_widths(&app.download(&body).await), widths(&[0, 1]));

    let (status, body) = app
        .post_form(
            "/watermark",
            &[
                Part::File("file", "doc.pdf", &pdf),
                Part::Text("position", "upside-down"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parameter");
}

#[tokio::test]
async fn compress_reports_sizes() {
    let app = TestApp::new();
    let pdf = sample_pdf(3);
    let (status, body) = app
        .post_form("/compress", &[Part::File("file", "doc.pdf", &pdf)])
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["original_size"], pdf.len());
    assert!(body["compressed_size"].as_u64().is_some());
    assert!(body["reduction_percent"].as_f64().is_some());
}

#[tokio::test]
async fn images_become_one_page_each() {
    let app = TestApp::new();
    let red = sample_png(40, 30);
    let (status, body) = app
        .post_form(
            "/images-to-pdf",
            &[Part::File("files", "a.png", &red), Part::File("files", "b.png", &red)],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(page_widths(&app.download(&body).await).len(), 2);
}

#[tokio::test]
async fn plain_text_converts_without_an_office_suite() {
    let app = TestApp::new();
    let (status, body) = app
        .post_form(
            "/office-to-pdf",
            &[Part::File("file", "notes.txt", b"hello\nworld")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(!page_widths(&app.download(&body).await).is_empty());
}

#[tokio::test]
async fn unreadable_documents_are_unprocessable() {
    let app = TestApp::new();
    let name = app.upload("junk.pdf", b"not a pdf", None).await;
    let (status, body) = app
        .post_json("/extract", json!({ "filename": name, "pages": "1" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unreadable_document");
}

#[tokio::test]
async fn tool_endpoints_reject_non_pdfs_before_spawning() {
    let app = TestApp::new();
    let junk: &[u8] = b"not a pdf";
    for uri in ["/protect", "/pdf-to-images", "/pdf-to-word", "/ocr"] {
        let (status, body) = app
            .post_form(
                uri,
                &[
                    Part::File("file", "junk.pdf", junk),
                    Part::Text("password", "secret"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}: {body}");
        assert_eq!(body["error"], "unreadable_document", "{uri}");
    }
}

#[tokio::test]
async fn watermarking_twice_keeps_both_stamps() {
    let app = TestApp::new();
    let pdf = sample_pdf(1);
    let (status, body) = app
        .post_form(
            "/watermark",
            &[
                Part::File("file", "doc.pdf", &pdf),
                Part::Text("text", "FIRST"),
                Part::Text("opacity", "0.2"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let once = app.download(&body).await;

    let (status, body) = app
        .post_form(
            "/watermark",
            &[
                Part::File("file", "once.pdf", &once),
                Part::Text("text", "SECOND"),
                Part::Text("opacity", "0.9"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let twice = app.download(&body).await;

    let doc = lopdf::Document::load_mem(&twice).expect("reload");
    let page_id = *doc.get_pages().get(&1).expect("page");
    let states = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Resources"))
        .and_then(lopdf::Object::as_dict)
        .and_then(|resources| resources.get(b"ExtGState"))
        .and_then(lopdf::Object::as_dict)
        .expect("graphics states");
    let mut opacities: Vec<f32> = states
        .iter()
        .filter_map(|(_, state)| state.as_dict().ok()?.get(b"ca").ok()?.as_float().ok())
        .collect();
    opacities.sort_by(f32::total_cmp);
    assert_eq!(opacities.len(), 2);
    assert!((opacities[0] - 0.2).abs() < 1e-4 && (opacities[1] - 0.9).abs() < 1e-4);
}

#[tokio::test]
async fn unknown_and_traversal_names_are_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .post_json("/extract", json!({ "filename": "nope.pdf", "pages": "1" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app.get("/download/..%2Fuploads").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let app = TestApp::new();
    let (status, body) = app.post_json("/merge", json!({ "files": "a.pdf" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn cleanup_removes_session_files() {
    let app = TestApp::new();
    let first = app.upload("a.pdf", &sample_pdf(1), Some("s1")).await;
    let second = app.upload("b.pdf", &sample_pdf(1), None).await;

    let (status, body) = app
        .post_json("/cleanup", json!({ "session_id": "s1", "files": [second] }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["deleted"], 2);
    assert_eq!(body["session_id"], "s1");

    assert!(app.state.store.upload_path(&first).is_err());
    assert!(app.state.sessions.is_empty().await);
    let (status, _) = app.get(&format!("/uploads/{second}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_previewable_inline() {
    let app = TestApp::new();
    let pdf = sample_pdf(1);
    let name = app.upload("a.pdf", &pdf, None).await;

    let request = Request::builder()
        .uri(format!("/uploads/{name}"))
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii")
            .starts_with("inline")
    );
}
