use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Context, Result};
use crate::fetch::{AccessToken, RetryPolicy, REQUEST_TIMEOUT, USER_AGENT};

const EXPIRES_HEADER: &str = "expires";
const PAGES_HEADER: &str = "x-pages";

/// One decoded page of a resource together with its cache lifetime.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub expires: DateTime<Utc>,
    pub records: T,
}

/// Headers-only view of a paginated resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceMeta {
    pub pages: u32,
    pub expires: DateTime<Utc>,
}

/// Thin wrapper over a shared HTTP client. Issues single authenticated
/// requests and classifies failures; retry scheduling belongs to the
/// pagination engine.
#[derive(Debug, Clone)]
pub struct EsiClient {
    http: Client,
    pub retry: RetryPolicy,
}

impl EsiClient {
    pub fn new(retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to construct upstream HTTP client")?;
        Ok(Self { http, retry })
    }

    /// The underlying client, for requests outside the ESI surface
    /// such as the SSO token exchange.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch and decode one page of a resource. `page` is 1-indexed;
    /// `None` requests the resource without a page parameter.
    pub async fn fetch_page<T>(
        &self,
        url: &str,
        page: Option<u32>,
        token: &AccessToken,
    ) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let mut request = self.http.get(url).bearer_auth(&token.token);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }

        let response = check_status(request.send().await?)?;
        let expires = parse_expires(response.headers())?;
        let records = response.json::<T>().await?;

        Ok(Page { expires, records })
    }

    /// Metadata probe: a HEAD request exposing the page count and
    /// cache lifetime without transferring a body.
    pub async fn probe(&self, url: &str, token: &AccessToken) -> Result<ResourceMeta> {
        let response = self.http.head(url).bearer_auth(&token.token).send().await?;
        let response = check_status(response)?;

        let headers = response.headers();
        let expires = parse_expires(headers)?;
        let pages = parse_pages(headers)?;

        Ok(ResourceMeta { pages, expires })
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(AppError::Status {
            code: status.as_u16(),
        });
    }
    Ok(response)
}

fn parse_expires(headers: &HeaderMap) -> Result<DateTime<Utc>> {
    let raw = header_str(headers, EXPIRES_HEADER, "Expires")?;
    let parsed = DateTime::parse_from_rfc2822(raw).map_err(|_| AppError::HeaderParse {
        name: "Expires",
        value: raw.to_string(),
    })?;
    Ok(parsed.with_timezone(&Utc))
}

fn parse_pages(headers: &HeaderMap) -> Result<u32> {
    let raw = header_str(headers, PAGES_HEADER, "X-Pages")?;
    raw.trim().parse::<u32>().map_err(|_| AppError::HeaderParse {
        name: "X-Pages",
        value: raw.to_string(),
    })
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    key: &str,
    display_name: &'static str,
) -> Result<&'a str> {
    headers
        .get(key)
        .ok_or(AppError::MissingHeader { name: display_name })?
        .to_str()
        .map_err(|_| AppError::HeaderParse {
            name: display_name,
            value: "<non-printable>".to_string(),
        })
}
