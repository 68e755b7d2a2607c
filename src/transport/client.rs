use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};

use crate::config::ScrapeSettings;

/// What we asked for. API calls carry XHR-style headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Page,
    Api,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A request that never produced a status line.
#[derive(Debug, Clone)]
pub enum HttpFailure {
    Timeout(String),
    Connection(String),
}

/// One blocking GET. The session (cookies, default headers) lives behind it.
pub trait HttpClient {
    fn get(&self, url: &str, kind: RequestKind) -> Result<HttpResponse, HttpFailure>;
}

impl<T: HttpClient + ?Sized> HttpClient for Box<T> {
    fn get(&self, url: &str, kind: RequestKind) -> Result<HttpResponse, HttpFailure> {
        (**self).get(url, kind)
    }
}

pub struct ReqwestClient {
    client: Client,
    referer: String,
}

impl ReqwestClient {
    pub fn new(settings: &ScrapeSettings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            referer: format!("{}/", settings.base_url),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, kind: RequestKind) -> Result<HttpResponse, HttpFailure> {
        let mut request = self.client.get(url);

        if kind == RequestKind::Api {
            request = request
                .header(ACCEPT, "application/json, text/plain, */*")
                .header(REFERER, self.referer.as_str())
                .header("X-Requested-With", "XMLHttpRequest");
        }

        let resp = request.send().map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(classify)?;

        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> HttpFailure {
    if err.is_timeout() {
        HttpFailure::Timeout(err.to_string())
    } else {
        HttpFailure::Connection(err.to_string())
    }
}
