//! Jolokia HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.
//! [`MBeanServer`] 구현을 통해 collector에 MBean 조회 기능을 제공합니다.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::parser::{parse_response, parse_search_response, JolokiaResult};
use crate::error::JmxError;
use crate::jmx::{AttributeList, AttributeValue, MBeanServer, ObjectName, ObjectNamePattern};

/// Jolokia HTTP 클라이언트
#[derive(Clone)]
pub struct JolokiaClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
    auth: Option<(String, String)>,
}

/// Jolokia 요청 구조체
#[derive(Debug, Serialize)]
struct JolokiaRequest<'a> {
    #[serde(rename = "type")]
    request_type: &'static str,
    mbean: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<AttributeSpec<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AttributeSpec<'a> {
    Single(&'a str),
    Multiple(&'a [&'a str]),
}

impl<'a> AttributeSpec<'a> {
    fn from_names(names: &'a [&'a str]) -> Self {
        match names {
            [one] => AttributeSpec::Single(*one),
            _ => AttributeSpec::Multiple(names),
        }
    }
}

impl JolokiaClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `base_url` - Jolokia 엔드포인트 URL (예: "http://localhost:8778/jolokia")
    /// * `timeout_ms` - 요청 타임아웃 (밀리초)
    ///
    /// # Example
    /// ```ignore
    /// let client = JolokiaClient::new("http://localhost:8778/jolokia", 5000)?;
    /// ```
    pub fn new(base_url: &str, timeout_ms: u64) -> JolokiaResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(JmxError::HttpClientInit)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
            auth: None,
        })
    }

    /// Basic Auth 설정
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Some((username.to_string(), password.to_string()));
        self
    }

    /// 엔드포인트 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 요청 전송 후 응답 본문 반환
    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> JolokiaResult<String> {
        let mut req = self.client.post(&self.base_url).json(body);

        if let Some((username, password)) = &self.auth {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JmxError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(JmxError::HttpResponse)
    }

    fn transport_error(&self, err: reqwest::Error) -> JmxError {
        if err.is_timeout() {
            JmxError::timeout_with_duration(self.timeout_ms)
        } else {
            JmxError::from(err)
        }
    }

    /// MBean 검색 (search)
    #[instrument(skip(self))]
    pub async fn search(&self, pattern: &str) -> JolokiaResult<Vec<String>> {
        let request = JolokiaRequest {
            request_type: "search",
            mbean: pattern,
            attribute: None,
        };

        debug!("Sending Jolokia search request");
        let body = self.post(&request).await?;
        parse_search_response(&body)
    }

    /// 단일 MBean 속성 조회 (read)
    #[instrument(skip(self, mbean, attributes), fields(mbean = %mbean, count = attributes.len()))]
    pub async fn read(&self, mbean: &str, attributes: &[&str]) -> JolokiaResult<AttributeList> {
        if attributes.is_empty() {
            return Ok(AttributeList::new());
        }

        let request = JolokiaRequest {
            request_type: "read",
            mbean,
            attribute: Some(AttributeSpec::from_names(attributes)),
        };

        debug!("Sending Jolokia read request");
        let body = self.post(&request).await?;
        parse_response(&body)?.into_attributes(attributes)
    }

    /// 속성별 개별 조회 - 부분 실패 허용
    ///
    /// 없는 속성은 결과에서 빠집니다. MBean이 사라졌거나 통신 오류가 나면
    /// 즉시 에러를 반환합니다.
    async fn read_each(&self, mbean: &str, attributes: &[&str]) -> JolokiaResult<AttributeList> {
        let mut values = AttributeList::with_capacity(attributes.len());
        for attribute in attributes {
            match self.read(mbean, std::slice::from_ref(attribute)).await {
                Ok(single) => values.extend(single),
                Err(e) if e.is_attribute_not_found() => {
                    debug!(mbean = %mbean, attribute = %attribute, "Attribute not found");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }
}

#[async_trait]
impl MBeanServer for JolokiaClient {
    async fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, JmxError> {
        let raw = self.search(pattern.as_str()).await?;

        let mut names = Vec::with_capacity(raw.len());
        for s in raw {
            match ObjectName::parse(&s) {
                Ok(name) if pattern.matches(&name) => names.push(name),
                Ok(_) => {}
                Err(e) => warn!(mbean = %s, error = %e, "Skipping unparseable MBean name"),
            }
        }
        Ok(names)
    }

    async fn get_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, JmxError> {
        let mbean = name.to_string();
        let mut values = self.read(&mbean, &[attribute]).await?;
        values
            .remove(attribute)
            .ok_or_else(|| JmxError::AttributeNotFound {
                object: mbean,
                attribute: attribute.to_string(),
            })
    }

    async fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[&str],
    ) -> Result<AttributeList, JmxError> {
        let mbean = name.to_string();
        match self.read(&mbean, attributes).await {
            Err(e) if e.is_attribute_not_found() && attributes.len() > 1 => {
                debug!(mbean = %mbean, error = %e, "Bulk read failed, reading attributes one by one");
                self.read_each(&mbean, attributes).await
            }
            result => result,
        }
    }
}
