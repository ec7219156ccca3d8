//! Endpoint helpers.
//!
//! Each helper fills in the parameters its call requires, overlays the
//! caller's `options` and hands over to [`BbbClient::call`]. Response
//! formatting happens in the protocol layer.

use url::Url;

use bbb_protocol::request::{CHECK, INDEX};
use bbb_protocol::{ParamSet, ParamValue};

use crate::client::{ApiResponse, BbbClient};
use crate::error::{ClientError, ClientResult};
use crate::modules::PresentationModules;

/// Layouts shipped with a default server install.
pub const DEFAULT_LAYOUTS: &[&str] = &[
    "Default",
    "Video Chat",
    "Meeting",
    "Webinar",
    "Lecture assistant",
    "Lecture",
];

fn with_options(required: ParamSet, options: ParamSet) -> ParamSet {
    let mut params = required;
    params.merge(options);
    params
}

fn joined(ids: &[&str]) -> String {
    ids.join(",")
}

impl BbbClient {
    /// Creates a meeting, optionally preloading presentations.
    ///
    /// A boolean `record` option is sent as `"true"`/`"false"`.
    pub async fn create_meeting(
        &self,
        name: &str,
        meeting_id: &str,
        options: ParamSet,
        modules: Option<&PresentationModules>,
    ) -> ClientResult<ApiResponse> {
        let required = ParamSet::new()
            .with("name", name)
            .with("meetingID", meeting_id);
        let mut params = with_options(required, options);
        if let Some(ParamValue::Bool(record)) = params.get("record") {
            let record = record.to_string();
            params.insert("record", record);
        }

        let payload = match modules {
            Some(modules) if !modules.is_empty() => Some(modules.to_xml().map_err(|e| {
                ClientError::protocol(&self.config().url, bbb_protocol::ProtocolError::Xml(e))
            })?),
            _ => None,
        };
        self.call_with_body("create", params, payload).await
    }

    /// Signed URL a user opens to join a meeting. Nothing is sent.
    pub fn join_meeting_url(
        &self,
        meeting_id: &str,
        user_name: &str,
        password: &str,
        options: ParamSet,
    ) -> ClientResult<Url> {
        let required = ParamSet::new()
            .with("meetingID", meeting_id)
            .with("password", password)
            .with("fullName", user_name);
        self.request_url("join", with_options(required, options))
    }

    pub async fn end_meeting(
        &self,
        meeting_id: &str,
        moderator_password: &str,
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let required = ParamSet::new()
            .with("meetingID", meeting_id)
            .with("password", moderator_password);
        self.call("end", with_options(required, options)).await
    }

    /// Whether at least one participant is in the meeting.
    pub async fn is_meeting_running(&self, meeting_id: &str, options: ParamSet) -> ClientResult<bool> {
        let required = ParamSet::new().with("meetingID", meeting_id);
        let response = self
            .call("isMeetingRunning", with_options(required, options))
            .await?;
        Ok(response.data.get_bool("running").unwrap_or(false))
    }

    pub async fn get_meeting_info(
        &self,
        meeting_id: &str,
        password: &str,
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let required = ParamSet::new()
            .with("meetingID", meeting_id)
            .with("password", password);
        self.call("getMeetingInfo", with_options(required, options))
            .await
    }

    pub async fn get_meetings(&self, options: ParamSet) -> ClientResult<ApiResponse> {
        self.call("getMeetings", options).await
    }

    /// Version reported by the server, which may differ from the one this
    /// client speaks.
    pub async fn get_api_version(&self) -> ClientResult<String> {
        let response = self.call(INDEX, ParamSet::new()).await?;
        Ok(response.data.get_str("version").unwrap_or_default().to_string())
    }

    /// Recordings for the given meetings, or for all meetings when `meeting_ids`
    /// is empty.
    pub async fn get_recordings(
        &self,
        meeting_ids: &[&str],
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let mut required = ParamSet::new();
        if !meeting_ids.is_empty() {
            required.insert("meetingID", joined(meeting_ids));
        }
        self.call("getRecordings", with_options(required, options))
            .await
    }

    pub async fn publish_recordings(
        &self,
        record_ids: &[&str],
        publish: bool,
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let required = ParamSet::new()
            .with("recordID", joined(record_ids))
            .with("publish", publish.to_string());
        self.call("publishRecordings", with_options(required, options))
            .await
    }

    /// Updates recording attributes; `meta` follows the `create` metadata
    /// format.
    pub async fn update_recordings(
        &self,
        record_ids: &[&str],
        meta: Option<&str>,
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let mut required = ParamSet::new().with("recordID", joined(record_ids));
        required.insert_opt("meta", meta);
        self.call("updateRecordings", with_options(required, options))
            .await
    }

    pub async fn delete_recordings(
        &self,
        record_ids: &[&str],
        options: ParamSet,
    ) -> ClientResult<ApiResponse> {
        let required = ParamSet::new().with("recordID", joined(record_ids));
        self.call("deleteRecordings", with_options(required, options))
            .await
    }

    /// The server's default `config.xml`, unparsed.
    pub async fn get_default_config_xml(&self, options: ParamSet) -> ClientResult<String> {
        let exchange = self.call_raw("getDefaultConfigXML", options).await?;
        Ok(exchange.body)
    }

    /// Stores a `config.xml` for a meeting and returns the token to pass as
    /// `configToken` when joining.
    pub async fn set_config_xml(
        &self,
        meeting_id: &str,
        config_xml: &str,
        options: ParamSet,
    ) -> ClientResult<String> {
        let required = ParamSet::new()
            .with("meetingID", meeting_id)
            .with("configXML", config_xml);
        let response = self
            .call("setConfigXML", with_options(required, options))
            .await?;
        Ok(response
            .data
            .get_str("configToken")
            .unwrap_or_default()
            .to_string())
    }

    /// Whether the server answers the index call successfully.
    pub async fn test_connection(&self) -> ClientResult<bool> {
        let response = self.call(INDEX, ParamSet::new()).await?;
        Ok(response.data.get_bool("returncode").unwrap_or(false))
    }

    /// URL of the server's health check.
    pub fn check_url(&self) -> ClientResult<Url> {
        self.request_url(CHECK, ParamSet::new())
    }

    pub fn default_layouts() -> &'static [&'static str] {
        DEFAULT_LAYOUTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn client() -> BbbClient {
        let config = ClientConfig::new("https://demo.example.com/bigbluebutton/api", "secret123")
            .unwrap()
            .with_version("0.9");
        BbbClient::new(config).unwrap()
    }

    #[test]
    fn join_url_merges_options() {
        let options = ParamSet::new().with("userID", "u1").with("fullName", "Override");
        let url = client()
            .join_meeting_url("m1", "Ann", "ap", options)
            .unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["fullName", "meetingID", "password", "userID", "checksum"]);
        assert_eq!(query[0].1, "Override");
    }

    #[test]
    fn check_url_is_host_root() {
        assert_eq!(
            client().check_url().unwrap().as_str(),
            "https://demo.example.com/check"
        );
    }

    #[test]
    fn default_layouts_list() {
        assert_eq!(BbbClient::default_layouts().len(), 6);
        assert_eq!(BbbClient::default_layouts()[0], "Default");
    }
}
