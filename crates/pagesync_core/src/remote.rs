use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::json;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::filter::PageRecord;

pub const LIST_PAGES_PATH: &str = "i/pages";
pub const SHOW_PAGE_PATH: &str = "pages/show";
pub const UPDATE_PAGE_PATH: &str = "pages/update";

/// Field carrying the API token in request bodies.
pub const TOKEN_FIELD: &str = "i";
/// Field carrying the page id in show and update requests.
pub const PAGE_ID_FIELD: &str = "pageId";

/// The three remote operations the workflows depend on.
pub trait PageApi {
    /// Every page owned by the authenticated identity.
    fn list_pages(&mut self) -> Result<Vec<PageRecord>>;
    fn get_page(&mut self, id: &str) -> Result<PageRecord>;
    /// Replace a page. `payload` already carries the token and page id.
    fn update_page(&mut self, payload: &PageRecord) -> Result<()>;
    fn request_count(&self) -> usize;
}

/// Blocking HTTP implementation of [`PageApi`]. No retries; transport
/// errors surface as [`SyncError::Http`].
pub struct PageClient {
    client: Client,
    token: String,
    list_url: Url,
    show_url: Url,
    update_url: Url,
    request_count: usize,
}

impl PageClient {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
            list_url: config.endpoint(LIST_PAGES_PATH)?,
            show_url: config.endpoint(SHOW_PAGE_PATH)?,
            update_url: config.endpoint(UPDATE_PAGE_PATH)?,
            request_count: 0,
        })
    }

    fn post_json<T: Serialize + ?Sized>(&mut self, url: &Url, body: &T) -> Result<Response> {
        self.request_count += 1;
        tracing::debug!("POST {url}");
        let response = self.client.post(url.clone()).json(body).send()?;
        tracing::debug!("POST {url} -> {}", response.status());
        Ok(response)
    }
}

impl PageApi for PageClient {
    fn list_pages(&mut self) -> Result<Vec<PageRecord>> {
        let url = self.list_url.clone();
        let body = json!({ TOKEN_FIELD: self.token });
        let response = self.post_json(&url, &body)?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected_status(&url, StatusCode::OK, status, response));
        }

        let pages = response.json::<Vec<PageRecord>>()?;
        if pages.is_empty() {
            return Err(SyncError::EmptyListing);
        }
        Ok(pages)
    }

    fn get_page(&mut self, id: &str) -> Result<PageRecord> {
        let url = self.show_url.clone();
        let body = json!({ PAGE_ID_FIELD: id });
        let response = self.post_json(&url, &body)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(unexpected_status(&url, StatusCode::OK, status, response));
        }

        Ok(response.json::<PageRecord>()?)
    }

    fn update_page(&mut self, payload: &PageRecord) -> Result<()> {
        let url = self.update_url.clone();
        let response = self.post_json(&url, payload)?;
        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(unexpected_status(
                &url,
                StatusCode::NO_CONTENT,
                status,
                response,
            ));
        }
        Ok(())
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

fn unexpected_status(
    url: &Url,
    expected: StatusCode,
    status: StatusCode,
    response: Response,
) -> SyncError {
    SyncError::UnexpectedStatus {
        endpoint: url.path().to_string(),
        expected,
        status,
        body: response.text().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use reqwest::StatusCode;
    use serde_json::json;

    use super::{PageApi, PageClient};
    use crate::config::SyncConfig;
    use crate::error::SyncError;

    /// Serves exactly one canned response and hands back the raw request.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let mut response = format!("HTTP/1.1 {status_line}\r\nConnection: close\r\n");
            if !status_line.starts_with("204") {
                response.push_str("Content-Type: application/json\r\n");
                response.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            response.push_str("\r\n");
            response.push_str(body);
            stream.write_all(response.as_bytes()).expect("write response");
            request
        });
        (format!("http://{addr}/api"), handle)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = stream.read(&mut chunk).expect("read");
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }

    fn client(base_url: &str) -> PageClient {
        let config = SyncConfig::from_lookup(None, |key| match key {
            "TOKEN" => Some("secret-token".to_string()),
            "BASE_URL" => Some(base_url.to_string()),
            _ => None,
        })
        .expect("config");
        PageClient::new(&config).expect("client")
    }

    #[test]
    fn list_pages_posts_token_and_decodes_array() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"[{"id":"p1","title":"One","summary":null,"script":"a"}]"#,
        );
        let mut api = client(&base_url);

        let pages = api.list_pages().expect("list");
        let request = server.join().expect("server");

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].get("id"), Some(&json!("p1")));
        assert!(request.starts_with("POST /api/i/pages "));
        assert!(request.contains(r#"{"i":"secret-token"}"#));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/json")
        );
        assert_eq!(api.request_count(), 1);
    }

    #[test]
    fn malformed_response_body_is_a_transport_error() {
        let (base_url, server) = serve_once("200 OK", r#"{"id":"#);
        let mut api = client(&base_url);

        let err = api.get_page("p1").expect_err("must fail");
        server.join().expect("server");
        assert!(matches!(err, SyncError::Http(_)));
    }

    #[test]
    fn list_pages_rejects_empty_listing() {
        let (base_url, server) = serve_once("200 OK", "[]");
        let mut api = client(&base_url);

        let err = api.list_pages().expect_err("must fail");
        server.join().expect("server");
        assert!(matches!(err, SyncError::EmptyListing));
    }

    #[test]
    fn get_page_sends_page_id() {
        let (base_url, server) = serve_once("200 OK", r#"{"id":"p1","title":"One"}"#);
        let mut api = client(&base_url);

        let page = api.get_page("p1").expect("get");
        let request = server.join().expect("server");

        assert_eq!(page.get("title"), Some(&json!("One")));
        assert!(request.starts_with("POST /api/pages/show "));
        assert!(request.contains(r#"{"pageId":"p1"}"#));
    }

    #[test]
    fn get_page_fails_on_non_ok_status() {
        let (base_url, server) = serve_once("400 Bad Request", r#"{"error":"NO_SUCH_PAGE"}"#);
        let mut api = client(&base_url);

        let err = api.get_page("nope").expect_err("must fail");
        server.join().expect("server");
        match err {
            SyncError::UnexpectedStatus {
                endpoint,
                expected,
                status,
                body,
            } => {
                assert_eq!(endpoint, "/api/pages/show");
                assert_eq!(expected, StatusCode::OK);
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body.contains("NO_SUCH_PAGE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn update_page_accepts_only_no_content() {
        let (base_url, server) = serve_once("204 No Content", "");
        let mut api = client(&base_url);
        let payload = json!({ "title": "One", "i": "secret-token", "pageId": "p1" })
            .as_object()
            .cloned()
            .expect("object");

        api.update_page(&payload).expect("update");
        let request = server.join().expect("server");
        assert!(request.starts_with("POST /api/pages/update "));
        assert!(request.contains(r#""pageId":"p1""#));

        let (base_url, server) = serve_once("200 OK", "{}");
        let mut api = client(&base_url);
        let err = api.update_page(&payload).expect_err("200 is not a success here");
        server.join().expect("server");
        assert!(matches!(
            err,
            SyncError::UnexpectedStatus { status, .. } if status == StatusCode::OK
        ));
    }
}
