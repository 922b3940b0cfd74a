//! Jolokia JSON 응답 파서
//!
//! Jolokia API 응답을 파싱하여 [`AttributeValue`] 기반 구조로 변환합니다.

use serde::Deserialize;
use serde_json::Value;

use crate::error::JmxError;
use crate::jmx::{AttributeList, AttributeValue};

/// Jolokia 작업 결과 타입
pub type JolokiaResult<T> = Result<T, JmxError>;

/// Jolokia API 응답 구조체
#[derive(Debug, Clone, Deserialize)]
pub struct JolokiaResponse {
    /// 요청 정보
    pub request: RequestInfo,
    /// 응답 값 (에러 응답이면 없음)
    #[serde(default)]
    pub value: Option<Value>,
    /// 응답 상태 코드
    pub status: u16,
    /// 타임스탬프 (Unix epoch)
    #[serde(default)]
    pub timestamp: u64,
    /// 에러 메시지 (실패 시)
    #[serde(default)]
    pub error: Option<String>,
    /// 에러 타입 (실패 시, 예: "javax.management.InstanceNotFoundException")
    #[serde(default)]
    pub error_type: Option<String>,
}

/// 요청 정보
#[derive(Debug, Clone, Deserialize)]
pub struct RequestInfo {
    /// MBean ObjectName 또는 검색 패턴
    #[serde(default)]
    pub mbean: String,
    /// 조회한 속성 (단일 또는 복수)
    #[serde(default)]
    pub attribute: Option<Value>,
    /// 요청 타입
    #[serde(rename = "type")]
    pub request_type: String,
}

impl JolokiaResponse {
    /// 성공 여부
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// 에러 응답을 [`JmxError`]로 변환
    ///
    /// `attribute`는 속성 에러 메시지에 들어갈 속성 이름입니다.
    pub fn error_for(&self, attribute: Option<&str>) -> JmxError {
        let error_type = self.error_type.as_deref().unwrap_or_default();
        let message = self
            .error
            .clone()
            .unwrap_or_else(|| format!("{} request failed", self.request.request_type));

        if error_type.ends_with("InstanceNotFoundException") {
            JmxError::InstanceNotFound(self.request.mbean.clone())
        } else if error_type.ends_with("AttributeNotFoundException") {
            JmxError::AttributeNotFound {
                object: self.request.mbean.clone(),
                attribute: attribute
                    .map(str::to_string)
                    .unwrap_or_else(|| attribute_from_message(&message)),
            }
        } else {
            JmxError::Jolokia {
                status: self.status,
                message,
            }
        }
    }

    /// 성공 응답의 값 추출, 실패 응답은 에러로 변환
    pub fn into_value(self, attribute: Option<&str>) -> JolokiaResult<Value> {
        if !self.is_success() {
            return Err(self.error_for(attribute));
        }
        Ok(self.value.unwrap_or(Value::Null))
    }

    /// 속성 read 응답을 속성 맵으로 변환
    ///
    /// 속성 하나만 요청하면 Jolokia는 값 자체를 돌려주고, 여러 개를 요청하면
    /// 속성 이름을 키로 하는 객체를 돌려줍니다.
    pub fn into_attributes(self, requested: &[&str]) -> JolokiaResult<AttributeList> {
        let single = match requested {
            [one] => Some(*one),
            _ => None,
        };
        let value = self.into_value(single)?;

        if let Some(name) = single {
            let mut values = AttributeList::with_capacity(1);
            values.insert(name.to_string(), AttributeValue::from(value));
            return Ok(values);
        }

        match value {
            Value::Object(map) => Ok(map
                .into_iter()
                .filter(|(k, _)| requested.contains(&k.as_str()))
                .map(|(k, v)| (k, AttributeValue::from(v)))
                .collect()),
            Value::Null => Ok(AttributeList::new()),
            other => Err(JmxError::JsonParse(format!(
                "Expected attribute map, got {}",
                other
            ))),
        }
    }
}

/// 단일 응답 파싱
pub fn parse_response(json: &str) -> JolokiaResult<JolokiaResponse> {
    serde_json::from_str(json).map_err(|e| JmxError::JsonParse(e.to_string()))
}

/// search 응답에서 ObjectName 문자열 목록 추출
pub fn parse_search_response(json: &str) -> JolokiaResult<Vec<String>> {
    let response = parse_response(json)?;
    match response.into_value(None)? {
        Value::Array(names) => names
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                other => Err(JmxError::JsonParse(format!(
                    "Expected MBean name, got {}",
                    other
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(JmxError::JsonParse(format!(
            "Expected MBean name list, got {}",
            other
        ))),
    }
}

// "No such attribute: maxTotal" 형태의 메시지에서 속성 이름 추출
fn attribute_from_message(message: &str) -> String {
    message
        .rsplit(':')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_attribute_response() {
        let json = r#"{
            "request": {
                "mbean": "Catalina:type=ThreadPool,name=\"http-nio-8080\"",
                "attribute": "maxThreads",
                "type": "read"
            },
            "value": 200,
            "timestamp": 1609459200,
            "status": 200
        }"#;

        let response = parse_response(json).unwrap();
        assert!(response.is_success());
        let values = response.into_attributes(&["maxThreads"]).unwrap();
        assert_eq!(values.get("maxThreads"), Some(&AttributeValue::Integer(200)));
    }

    #[test]
    fn test_parse_multi_attribute_response() {
        let json = r#"{
            "request": {
                "mbean": "Catalina:type=ThreadPool,name=\"http-nio-8080\"",
                "attribute": ["maxThreads", "currentThreadCount"],
                "type": "read"
            },
            "value": {
                "maxThreads": 200,
                "currentThreadCount": 10,
                "connectionCount": 3
            },
            "timestamp": 1609459200,
            "status": 200
        }"#;

        let values = parse_response(json)
            .unwrap()
            .into_attributes(&["maxThreads", "currentThreadCount"])
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(
            values.get("currentThreadCount"),
            Some(&AttributeValue::Integer(10))
        );
    }

    #[test]
    fn test_parse_instance_not_found() {
        let json = r#"{
            "request": {
                "mbean": "Catalina:type=Manager,context=/gone,host=localhost",
                "type": "read"
            },
            "error_type": "javax.management.InstanceNotFoundException",
            "error": "javax.management.InstanceNotFoundException : Catalina:type=Manager,context=/gone,host=localhost",
            "status": 404
        }"#;

        let err = parse_response(json)
            .unwrap()
            .into_attributes(&["activeSessions", "maxActive"])
            .unwrap_err();
        assert!(err.is_instance_not_found());
    }

    #[test]
    fn test_parse_attribute_not_found() {
        let json = r#"{
            "request": {
                "mbean": "Catalina:type=DataSource,class=javax.sql.DataSource,name=\"jdbc/app\"",
                "attribute": ["maxTotal", "numIdle"],
                "type": "read"
            },
            "error_type": "javax.management.AttributeNotFoundException",
            "error": "javax.management.AttributeNotFoundException : No such attribute: numIdle",
            "status": 404
        }"#;

        match parse_response(json)
            .unwrap()
            .into_attributes(&["maxTotal", "numIdle"])
            .unwrap_err()
        {
            JmxError::AttributeNotFound { attribute, .. } => assert_eq!(attribute, "numIdle"),
            other => panic!("Expected AttributeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_other_error() {
        let json = r#"{
            "request": {"mbean": "Catalina:type=Server", "type": "read"},
            "error_type": "java.lang.SecurityException",
            "error": "Access denied",
            "status": 403
        }"#;

        match parse_response(json).unwrap().into_value(None).unwrap_err() {
            JmxError::Jolokia { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Access denied");
            }
            other => panic!("Expected Jolokia error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "request": {"mbean": "Catalina:type=ThreadPool,*", "type": "search"},
            "value": [
                "Catalina:name=\"http-nio-8080\",type=ThreadPool",
                "Catalina:name=\"ajp-nio-8009\",type=ThreadPool"
            ],
            "timestamp": 1609459200,
            "status": 200
        }"#;

        let names = parse_search_response(json).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].contains("http-nio-8080"));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_response("not json"),
            Err(JmxError::JsonParse(_))
        ));
    }
}
