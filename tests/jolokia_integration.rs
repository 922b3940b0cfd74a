//! Jolokia 어댑터 통합 테스트
//!
//! wiremock을 사용한 HTTP 모킹 테스트

use std::sync::Arc;

use rtomcat_exporter::collector::{Collector, PoolCollector};
use rtomcat_exporter::error::JmxError;
use rtomcat_exporter::jmx::{AttributeValue, MBeanServer, ObjectName, ObjectNamePattern};
use rtomcat_exporter::jolokia::JolokiaClient;
use rtomcat_exporter::registry::Registry;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POOL_PATTERN: &str =
    "tomcat.jdbc:type=ConnectionPool,class=org.apache.tomcat.jdbc.pool.DataSource,*";
const POOL_NAME: &str =
    "tomcat.jdbc:type=ConnectionPool,class=org.apache.tomcat.jdbc.pool.DataSource,name=\"jdbc/TestDB\",context=/app";

fn client(server: &MockServer) -> JolokiaClient {
    JolokiaClient::new(&format!("{}/jolokia", server.uri()), 5000).unwrap()
}

fn ok(request: Value, value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "request": request,
        "value": value,
        "timestamp": 1609459200,
        "status": 200
    }))
}

fn failure(request: Value, status: u16, error_type: &str, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "request": request,
        "error_type": error_type,
        "error": error,
        "status": status
    }))
}

/// Searches not mocked explicitly find nothing
async fn mount_empty_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "search"})))
        .respond_with(ok(json!({"type": "search", "mbean": "*:*"}), json!([])))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_pool_search(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "search", "mbean": POOL_PATTERN})))
        .respond_with(ok(
            json!({"type": "search", "mbean": POOL_PATTERN}),
            json!([
                POOL_NAME,
                format!("{},connections=PooledConnection1", POOL_NAME)
            ]),
        ))
        .with_priority(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_query_names_filters_by_pattern() {
    let server = MockServer::start().await;
    mount_pool_search(&server).await;

    let client = client(&server);
    let pattern = ObjectNamePattern::parse(POOL_PATTERN).unwrap();
    let names = client.query_names(&pattern).await.unwrap();

    assert_eq!(names.len(), 2);
    assert_eq!(names[0], ObjectName::parse(POOL_NAME).unwrap());
}

#[tokio::test]
async fn test_query_names_keeps_name_ending_in_escaped_backslash() {
    let server = MockServer::start().await;
    let escaped = "tomcat.jdbc:type=ConnectionPool,class=org.apache.tomcat.jdbc.pool.DataSource,name=\"jdbc\\\\\",context=/app";
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "search"})))
        .respond_with(ok(
            json!({"type": "search", "mbean": POOL_PATTERN}),
            json!([escaped]),
        ))
        .mount(&server)
        .await;

    let client = client(&server);
    let pattern = ObjectNamePattern::parse(POOL_PATTERN).unwrap();
    let names = client.query_names(&pattern).await.unwrap();

    assert_eq!(names.len(), 1);
    assert_eq!(names[0].key_property("name"), Some("\"jdbc\\\\\""));
}

#[tokio::test]
async fn test_get_attribute_single_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({
            "type": "read",
            "mbean": "Catalina:type=Server",
            "attribute": "serverNumber"
        })))
        .respond_with(ok(
            json!({"type": "read", "mbean": "Catalina:type=Server", "attribute": "serverNumber"}),
            json!("9.0.85.0"),
        ))
        .mount(&server)
        .await;

    let client = client(&server);
    let value = client
        .get_attribute(&ObjectName::parse("Catalina:type=Server").unwrap(), "serverNumber")
        .await
        .unwrap();
    assert_eq!(value, AttributeValue::String("9.0.85.0".to_string()));
}

#[tokio::test]
async fn test_get_attributes_bulk_read() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "read", "mbean": POOL_NAME})))
        .respond_with(ok(
            json!({"type": "read", "mbean": POOL_NAME, "attribute": ["MaxActive", "Active"]}),
            json!({"MaxActive": 100, "Active": 3, "Unrequested": 1}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let values = client
        .get_attributes(&ObjectName::parse(POOL_NAME).unwrap(), &["MaxActive", "Active"])
        .await
        .unwrap();

    assert_eq!(values.len(), 2);
    assert_eq!(values["MaxActive"].as_f64(), Some(100.0));
    assert_eq!(values["Active"].as_f64(), Some(3.0));
}

#[tokio::test]
async fn test_bulk_attribute_error_falls_back_to_single_reads() {
    let server = MockServer::start().await;
    let read = json!({"type": "read", "mbean": POOL_NAME});

    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({
            "type": "read",
            "mbean": POOL_NAME,
            "attribute": ["MaxActive", "Size"]
        })))
        .respond_with(failure(
            read.clone(),
            404,
            "javax.management.AttributeNotFoundException",
            "javax.management.AttributeNotFoundException : No such attribute: Size",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "read", "attribute": "MaxActive"})))
        .respond_with(ok(read.clone(), json!(100)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "read", "attribute": "Size"})))
        .respond_with(failure(
            read,
            404,
            "javax.management.AttributeNotFoundException",
            "javax.management.AttributeNotFoundException : No such attribute: Size",
        ))
        .mount(&server)
        .await;

    let client = client(&server);
    let values = client
        .get_attributes(&ObjectName::parse(POOL_NAME).unwrap(), &["MaxActive", "Size"])
        .await
        .unwrap();

    assert_eq!(values.len(), 1);
    assert_eq!(values["MaxActive"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_instance_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .respond_with(failure(
            json!({"type": "read", "mbean": "Catalina:type=Server"}),
            404,
            "javax.management.InstanceNotFoundException",
            "javax.management.InstanceNotFoundException : Catalina:type=Server",
        ))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .get_attributes(
            &ObjectName::parse("Catalina:type=Server").unwrap(),
            &["serverNumber", "serverBuilt"],
        )
        .await
        .unwrap_err();
    assert!(err.is_instance_not_found());
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.search("Catalina:type=Server").await.unwrap_err();
    assert!(matches!(err, JmxError::HttpStatus(503)));
    assert!(err.is_communication());
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ok(json!({"type": "search", "mbean": "*:type=Server"}), json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).with_auth("user", "pass");
    let names = client.search("*:type=Server").await.unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_pool_collection_through_jolokia() {
    let server = MockServer::start().await;
    mount_empty_search(&server).await;
    mount_pool_search(&server).await;

    Mock::given(method("POST"))
        .and(path("/jolokia"))
        .and(body_partial_json(json!({"type": "read", "mbean": POOL_NAME})))
        .respond_with(ok(
            json!({"type": "read", "mbean": POOL_NAME}),
            json!({
                "MaxActive": 100,
                "Active": 3,
                "Idle": 7,
                "MaxIdle": 10,
                "MinIdle": 2,
                "Size": 10,
                "WaitCount": 0,
                "BorrowedCount": 1500,
                "ReturnedCount": 1497,
                "CreatedCount": 12,
                "ReleasedCount": 2,
                "ReconnectedCount": 0,
                "RemoveAbandonedCount": 0,
                "ReleasedIdleCount": null
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let jolokia: Arc<dyn MBeanServer> = Arc::new(client(&server));
    let registry = Registry::new();
    let families = PoolCollector::new(jolokia, "tomcat", "Catalina")
        .collect(&registry)
        .await;

    let value = |name: &str| {
        families
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value(&["jdbc/TestDB", "/app"]))
    };
    assert_eq!(value("tomcat_pool_connections_max"), Some(100.0));
    assert_eq!(value("tomcat_pool_connections_borrowed_total"), Some(1500.0));
    // null is absent
    assert_eq!(value("tomcat_pool_connections_releasedidle_total"), None);
    assert_eq!(families.len(), 13);
}
