//! Per-version protocol behaviour.
//!
//! Supported versions fall into four generations. Each one fixes how
//! requests are signed, which parameters a call accepts and which response
//! fields exist. The generation is chosen once, when the client is built;
//! nothing below re-checks version strings.

use tracing::debug;

use bbb_core::ResponseMap;

use crate::format::{self, Formatter};
use crate::params::ParamSet;
use crate::version::ProtocolVersion;

/// A family of protocol versions sharing the same wire rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// 0.64: checksum without the method name, fixed parameter lists.
    Legacy,
    /// 0.7: method name enters the checksum.
    Classic,
    /// 0.8 and 0.81: recordings, creation times and metadata.
    Recording,
    /// 0.9 and later: parameters sorted before signing.
    Modern,
}

impl Generation {
    pub fn for_version(version: &ProtocolVersion) -> Self {
        match version.parts() {
            [0, minor, ..] if *minor < 7 => Self::Legacy,
            [0, 7, ..] => Self::Classic,
            [0, 8, ..] => Self::Recording,
            _ => Self::Modern,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Classic => "classic",
            Self::Recording => "recording",
            Self::Modern => "modern",
        }
    }
}

const LEGACY_CREATE: &[&str] = &[
    "name",
    "meetingID",
    "moderatorPW",
    "attendeePW",
    "welcome",
    "dialNumber",
    "logoutURL",
    "maxParticipants",
];
const CLASSIC_CREATE: &[&str] = &[
    "name",
    "meetingID",
    "moderatorPW",
    "attendeePW",
    "welcome",
    "dialNumber",
    "logoutURL",
    "maxParticipants",
    "voiceBridge",
];
const LEGACY_JOIN: &[&str] = &["meetingID", "password", "fullName", "redirectImmediately"];
const CLASSIC_JOIN: &[&str] = &["meetingID", "password", "fullName", "userID", "webVoiceConf"];
const END: &[&str] = &["meetingID", "password"];
const IS_MEETING_RUNNING: &[&str] = &["meetingID"];
const GET_MEETING_INFO: &[&str] = &["meetingID", "password"];
const LEGACY_GET_MEETINGS: &[&str] = &[];
const CLASSIC_GET_MEETINGS: &[&str] = &["random"];

/// Decision table for one protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolPolicy {
    version: ProtocolVersion,
    generation: Generation,
}

impl ProtocolPolicy {
    pub fn for_version(version: ProtocolVersion) -> Self {
        let generation = Generation::for_version(&version);
        Self {
            version,
            generation,
        }
    }

    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether the method name is hashed together with the parameters.
    pub fn checksum_includes_method(&self) -> bool {
        self.generation != Generation::Legacy
    }

    /// Whether parameters are sorted by name before signing.
    pub fn sorts_params(&self) -> bool {
        self.generation == Generation::Modern
    }

    /// Whether parameters outside a method's fixed list are sent.
    pub fn forwards_unknown_params(&self) -> bool {
        matches!(self.generation, Generation::Recording | Generation::Modern)
    }

    /// Whether responses carry `createTime`, `recording` and `metadata`.
    pub fn supports_recording_fields(&self) -> bool {
        self.forwards_unknown_params()
    }

    /// The fixed parameter list for `method`, if this generation has one.
    pub fn allowed_params(&self, method: &str) -> Option<&'static [&'static str]> {
        let classic = match self.generation {
            Generation::Legacy => false,
            Generation::Classic => true,
            Generation::Recording | Generation::Modern => return None,
        };
        let list = match method {
            "create" if classic => CLASSIC_CREATE,
            "create" => LEGACY_CREATE,
            "join" if classic => CLASSIC_JOIN,
            "join" => LEGACY_JOIN,
            "end" => END,
            "isMeetingRunning" => IS_MEETING_RUNNING,
            "getMeetingInfo" => GET_MEETING_INFO,
            "getMeetings" if classic => CLASSIC_GET_MEETINGS,
            "getMeetings" => LEGACY_GET_MEETINGS,
            _ => return None,
        };
        Some(list)
    }

    /// Drops the parameters `method` does not accept on this generation.
    pub fn filter_params(&self, method: &str, mut params: ParamSet) -> ParamSet {
        if let Some(allowed) = self.allowed_params(method) {
            params.retain(|key| {
                let keep = allowed.contains(&key);
                if !keep {
                    debug!(
                        method,
                        param = key,
                        version = %self.version,
                        "parameter not supported by this API version, dropping it"
                    );
                }
                keep
            });
        }
        params
    }

    /// Applies the per-call formatting for `method`.
    ///
    /// Expects [`format::default_formatting`] to have run already. Methods
    /// without dedicated rules are left as they are.
    pub fn format_response(&self, method: &str, map: &mut ResponseMap) {
        let gated = self.supports_recording_fields();
        match method {
            "create" => {
                let mut f = Formatter::new(map);
                f.to_string("meetingID");
                f.to_string("moderatorPW");
                f.to_string("attendeePW");
                f.to_boolean("hasBeenForciblyEnded");
                if gated {
                    f.to_int("createTime");
                }
            }
            "getMeetingInfo" => {
                let mut f = Formatter::new(map);
                f.flatten("attendees", "attendee");
                for field in ["meetingID", "moderatorPW", "attendeePW", "meetingName"] {
                    f.to_string(field);
                }
                f.to_boolean("hasBeenForciblyEnded");
                f.to_boolean("running");
                f.to_datetime("startTime");
                f.to_datetime("endTime");
                for field in ["participantCount", "moderatorCount", "maxUsers", "voiceBridge"] {
                    f.to_int(field);
                }
                if gated {
                    f.to_int("createTime");
                    f.to_boolean("recording");
                    f.clean_metadata("metadata");
                }
                format::format_each(map, "attendees", format::format_attendee);
            }
            "getMeetings" => {
                Formatter::new(map).flatten("meetings", "meeting");
                format::format_each(map, "meetings", |meeting| {
                    format::format_meeting(meeting, gated)
                });
            }
            "isMeetingRunning" => {
                Formatter::new(map).to_boolean("running");
            }
            "getRecordings" => {
                Formatter::new(map).flatten("recordings", "recording");
                format::format_each(map, "recordings", format::format_recording);
            }
            "publishRecordings" => {
                Formatter::new(map).to_boolean("published");
            }
            "deleteRecordings" => {
                Formatter::new(map).to_boolean("deleted");
            }
            "updateRecordings" => {
                Formatter::new(map).to_boolean("updated");
            }
            "setConfigXML" => {
                Formatter::new(map).to_string("configToken");
            }
            "index" => {
                Formatter::new(map).to_string("version");
            }
            _ => {}
        }
    }
}
