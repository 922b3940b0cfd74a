//! MBean attribute values

use std::collections::HashMap;

use serde_json::Value;

/// 개별 속성 값
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// 정수
    Integer(i64),
    /// 실수
    Float(f64),
    /// 문자열
    String(String),
    /// 불리언
    Boolean(bool),
    /// Null
    Null,
    /// 중첩 객체 (CompositeData)
    Object(HashMap<String, AttributeValue>),
    /// 배열
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// 숫자로 변환 시도
    ///
    /// # Precision Warning
    /// When converting `Integer(i64)` to `f64`, precision loss may occur
    /// for values > 2^53 (9,007,199,254,740,992).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => {
                if i.unsigned_abs() > (1u64 << 53) {
                    tracing::warn!(
                        value = i,
                        "Large integer may lose precision when converted to f64"
                    );
                }
                Some(*i as f64)
            }
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 문자열로 변환
    pub fn as_string(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Float(f) => Some(f.to_string()),
            AttributeValue::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                // u64 above i64::MAX and non-integers end up here
                None => n
                    .as_f64()
                    .map(AttributeValue::Float)
                    .unwrap_or(AttributeValue::Null),
            },
            Value::String(s) => AttributeValue::String(s),
            Value::Array(arr) => {
                AttributeValue::Array(arr.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(map) => AttributeValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Integer(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_f64() {
        assert_eq!(AttributeValue::Integer(42).as_f64(), Some(42.0));
        assert_eq!(AttributeValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(AttributeValue::String(" 7 ".into()).as_f64(), Some(7.0));
        assert_eq!(AttributeValue::String("STARTED".into()).as_f64(), None);
        assert_eq!(AttributeValue::Boolean(true).as_f64(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn test_as_f64_extreme_integers() {
        assert_eq!(
            AttributeValue::from(json!(i64::MIN)).as_f64(),
            Some(i64::MIN as f64)
        );
        assert_eq!(
            AttributeValue::Integer(i64::MAX).as_f64(),
            Some(i64::MAX as f64)
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(AttributeValue::from(json!(5)), AttributeValue::Integer(5));
        assert_eq!(AttributeValue::from(json!(0.25)), AttributeValue::Float(0.25));
        assert_eq!(
            AttributeValue::from(json!("STARTED")),
            AttributeValue::String("STARTED".into())
        );
        assert!(AttributeValue::from(json!(null)).is_null());

        match AttributeValue::from(json!({"used": 10, "max": 20})) {
            AttributeValue::Object(map) => {
                assert_eq!(map.get("used"), Some(&AttributeValue::Integer(10)));
            }
            other => panic!("Expected Object, got {:?}", other),
        }
    }
}
