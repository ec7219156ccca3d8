//! End-to-end calls against a mock server.

use std::time::Duration;

use bbb_client::{BbbClient, ClientConfig, ClientError, ErrorKind, ParamSet, PresentationModules, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/bigbluebutton/api";
const SECRET: &str = "8cd8ef52e8e101574e400365b55e11a6";

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}{}", server.uri(), API), SECRET).unwrap()
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/xml")
        .set_body_string(body)
}

fn index(version: &str) -> ResponseTemplate {
    xml(&format!(
        "<response><returncode>SUCCESS</returncode><version>{}</version></response>",
        version
    ))
}

async fn client(server: &MockServer, version: &str) -> BbbClient {
    BbbClient::connect(config(server).with_version(version))
        .await
        .unwrap()
}

#[tokio::test]
async fn connect_detects_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(index("0.9"))
        .expect(1)
        .mount(&server)
        .await;

    let client = BbbClient::connect(config(&server)).await.unwrap();
    assert_eq!(client.version().as_str(), "0.9");
}

#[tokio::test]
async fn connect_clamps_newer_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(index("5.0"))
        .mount(&server)
        .await;

    let client = BbbClient::connect(config(&server)).await.unwrap();
    assert_eq!(client.version().as_str(), "1.0");
}

#[tokio::test]
async fn connect_rejects_old_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(index("0.5"))
        .mount(&server)
        .await;

    let err = BbbClient::connect(config(&server)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn explicit_version_skips_detection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(index("0.9"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    assert_eq!(client.version().as_str(), "0.81");
}

#[tokio::test]
async fn create_meeting_formats_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/create", API)))
        .and(query_param("name", "Demo Meeting"))
        .and(query_param("meetingID", "abc-123"))
        .and(query_param("record", "true"))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><meetingID>abc-123</meetingID><attendeePW>ap</attendeePW><moderatorPW>mp</moderatorPW><createTime>1389464535956</createTime><hasBeenForciblyEnded>false</hasBeenForciblyEnded><messageKey></messageKey><message></message></response>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    let options = ParamSet::new().with("record", true);
    let response = client
        .create_meeting("Demo Meeting", "abc-123", options, None)
        .await
        .unwrap();

    let data = &response.data;
    assert_eq!(data.get_bool("returncode"), Some(true));
    assert_eq!(data.get_str("moderatorPW"), Some("mp"));
    assert_eq!(data.get_int("createTime"), Some(1389464535956));
    assert_eq!(data.get_bool("hasBeenForciblyEnded"), Some(false));
    assert_eq!(data.get_str("messageKey"), Some(""));
    assert_eq!(response.exchange.status, 200);
    assert!(response.exchange.url.as_str().contains("checksum="));
}

#[tokio::test]
async fn failed_returncode_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getMeetingInfo", API)))
        .respond_with(xml(
            "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey><message>We could not find a meeting with that meeting ID</message></response>",
        ))
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    let err = client
        .get_meeting_info("missing", "mp", ParamSet::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.message_key(), Some("notFound"));
    assert_eq!(
        err.to_string(),
        "We could not find a meeting with that meeting ID, messageKey: notFound"
    );
}

#[tokio::test]
async fn empty_body_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/end", API)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client(&server, "0.9").await;
    let response = client.end_meeting("m1", "mp", ParamSet::new()).await.unwrap();
    assert_eq!(response.data.get_bool("returncode"), Some(true));
    assert_eq!(response.data.get_str("message"), Some(""));
    assert_eq!(response.exchange.body, "");
}

#[tokio::test]
async fn malformed_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getMeetings", API)))
        .respond_with(xml("<html><body>502 Bad Gateway"))
        .mount(&server)
        .await;

    let client = client(&server, "0.9").await;
    let err = client.get_meetings(ParamSet::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn missing_returncode_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getMeetings", API)))
        .respond_with(xml("<response><meetings/></response>"))
        .mount(&server)
        .await;

    let client = client(&server, "0.9").await;
    let err = client.get_meetings(ParamSet::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { .. }));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let config = ClientConfig::new("http://127.0.0.1:1/bigbluebutton/api", SECRET)
        .unwrap()
        .with_version("0.9")
        .with_timeout(Duration::from_secs(2));
    let client = BbbClient::new(config).unwrap();

    let err = client.get_meetings(ParamSet::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getMeetings", API)))
        .respond_with(index("0.9").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = config(&server)
        .with_version("0.9")
        .with_timeout(Duration::from_millis(200));
    let client = BbbClient::new(config).unwrap();
    let err = client.get_meetings(ParamSet::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[tokio::test]
async fn get_meetings_lists_meetings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getMeetings", API)))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><meetings><meeting><meetingID>a</meetingID><running>true</running><participantCount>3</participantCount></meeting><meeting><meetingID>b</meetingID><running>false</running></meeting></meetings></response>",
        ))
        .mount(&server)
        .await;

    let client = client(&server, "1.0").await;
    let response = client.get_meetings(ParamSet::new()).await.unwrap();
    let meetings = response.data.get_list("meetings").unwrap();
    assert_eq!(meetings.len(), 2);

    let first = meetings[0].as_map().unwrap();
    assert_eq!(first.get_bool("running"), Some(true));
    assert_eq!(first.get_int("participantCount"), Some(3));
    assert_eq!(meetings[1].as_map().unwrap().get_int("participantCount"), Some(0));

    let json = serde_json::to_value(&response.data).unwrap();
    assert_eq!(json["meetings"][0]["meetingID"], "a");
}

#[tokio::test]
async fn is_meeting_running_returns_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/isMeetingRunning", API)))
        .and(query_param("meetingID", "m1"))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><running>true</running></response>",
        ))
        .mount(&server)
        .await;

    let client = client(&server, "0.8").await;
    assert!(client.is_meeting_running("m1", ParamSet::new()).await.unwrap());
}

#[tokio::test]
async fn get_recordings_joins_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/getRecordings", API)))
        .and(query_param("meetingID", "a,b"))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><recordings><recording><recordID>r1</recordID><meetingID>a</meetingID><published>true</published><startTime>1321618219268</startTime><endTime>1321618345268</endTime><metadata><course/></metadata><playback><format><type>slides</type><length>64</length></format><format><type>podcast</type><length>12</length></format></playback></recording></recordings></response>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    let response = client
        .get_recordings(&["a", "b"], ParamSet::new())
        .await
        .unwrap();

    let recordings = response.data.get_list("recordings").unwrap();
    assert_eq!(recordings.len(), 1);
    let recording = recordings[0].as_map().unwrap();
    assert_eq!(recording.get_bool("published"), Some(true));
    assert!(recording.get_datetime("endTime").is_some());
    assert_eq!(
        recording.get_map("metadata").unwrap().get("course"),
        Some(&Value::Str(String::new()))
    );
    let formats = recording
        .get_map("playback")
        .unwrap()
        .get_list("format")
        .unwrap();
    assert_eq!(formats[1].as_map().unwrap().get_int("length"), Some(12));
}

#[tokio::test]
async fn set_config_xml_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/setConfigXML", API)))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("checksum="))
        .and(body_string_contains("configXML=%3Cconfig%3E"))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><configToken>tok-1</configToken></response>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    let token = client
        .set_config_xml("m1", "<config></config>", ParamSet::new())
        .await
        .unwrap();
    assert_eq!(token, "tok-1");
}

#[tokio::test]
async fn create_with_modules_posts_xml() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/create", API)))
        .and(header("content-type", "application/xml"))
        .and(query_param("meetingID", "m1"))
        .and(body_string_contains(
            r#"<module name="presentation"><document url="http://example.com/a.pdf"/>"#,
        ))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><meetingID>m1</meetingID></response>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut modules = PresentationModules::new();
    modules.add_url("http://example.com/a.pdf");

    let client = client(&server, "0.9").await;
    let response = client
        .create_meeting("Demo", "m1", ParamSet::new(), Some(&modules))
        .await
        .unwrap();
    assert_eq!(response.data.get_str("meetingID"), Some("m1"));
}

#[tokio::test]
async fn configured_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .and(header("x-forwarded-for", "10.0.0.1"))
        .respond_with(index("0.81"))
        .expect(2)
        .mount(&server)
        .await;

    let config = config(&server).with_header("X-Forwarded-For", "10.0.0.1");
    let client = BbbClient::connect(config).await.unwrap();
    assert!(client.test_connection().await.unwrap());
}

#[tokio::test]
async fn get_api_version_reports_server_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(index("1.1"))
        .mount(&server)
        .await;

    let client = BbbClient::connect(config(&server)).await.unwrap();
    assert_eq!(client.version().as_str(), "1.0");
    assert_eq!(client.get_api_version().await.unwrap(), "1.1");
}

#[tokio::test]
async fn default_config_xml_is_raw() {
    let server = MockServer::start().await;
    let body = "<?xml version=\"1.0\"?><config><modules/></config>";
    Mock::given(method("GET"))
        .and(path(format!("{}/getDefaultConfigXML", API)))
        .respond_with(xml(body))
        .mount(&server)
        .await;

    let client = client(&server, "0.81").await;
    assert_eq!(
        client.get_default_config_xml(ParamSet::new()).await.unwrap(),
        body
    );
}

#[tokio::test]
async fn legacy_server_drops_unknown_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/create", API)))
        .respond_with(xml(
            "<response><returncode>SUCCESS</returncode><meetingID>m1</meetingID><createTime>123</createTime></response>",
        ))
        .mount(&server)
        .await;

    let client = client(&server, "0.7").await;
    let options = ParamSet::new().with("record", true).with("voiceBridge", "70000");
    let response = client
        .create_meeting("Demo", "m1", options, None)
        .await
        .unwrap();

    let query = response.exchange.url.query().unwrap_or_default().to_string();
    assert!(!query.contains("record="));
    assert!(query.contains("voiceBridge=70000"));
    assert_eq!(response.data.get_str("createTime"), Some("123"));
}
