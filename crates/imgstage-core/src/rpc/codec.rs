//! Codec - the JSON-RPC wire contract of the image store
//!
//! | operation          | method                     | params                 | result                 |
//! |--------------------|----------------------------|------------------------|------------------------|
//! | save               | `image.save_with_id`       | `[id, base64(bytes)]`  | none                   |
//! | load               | `image.load`               | `"id"`                 | `"base64(bytes)"`      |
//! | commit             | `image.commit`             | `"id"`                 | none                   |
//! | cleanup            | `image.cleanup`            | ttl in nanoseconds     | none                   |
//! | get_staging_images | `image.get_staging_images` | omitted                | `{"IDs":[..],"TS":..}` |
//!
//! Requests are `{"method":..,"params":..,"id":N}` (field order matters to
//! existing counterparts), responses `{"result":..,"error":"..","id":N}`.
//! Both the client and the server adapter go through this module.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::domain::{ErrorKind, ImageId, StagingSnapshot, StoreError, StoreResult, Timestamp};

pub const METHOD_SAVE: &str = "image.save_with_id";
pub const METHOD_LOAD: &str = "image.load";
pub const METHOD_COMMIT: &str = "image.commit";
pub const METHOD_CLEANUP: &str = "image.cleanup";
pub const METHOD_GET_STAGING_IMAGES: &str = "image.get_staging_images";

/// Remote error text prefix → error kind.
///
/// The server sends `StoreError::to_string()`; the client looks the text up
/// here. Text matching no prefix becomes `StoreError::Remote`.
pub const ERROR_TABLE: &[(&str, ErrorKind)] = &[
    ("image not found: ", ErrorKind::NotFound),
    ("image write failed: ", ErrorKind::Write),
    ("image read failed: ", ErrorKind::Read),
    ("cleanup canceled", ErrorKind::Canceled),
    ("rpc protocol error: ", ErrorKind::Protocol),
    ("image already staged: ", ErrorKind::AlreadyStaged),
    ("image already committed: ", ErrorKind::AlreadyCommitted),
    ("invalid image id: ", ErrorKind::InvalidId),
    ("rpc transport failed: ", ErrorKind::Transport),
];

/// Translate remote error text into the matching local error.
pub fn decode_error(text: &str) -> StoreError {
    ERROR_TABLE
        .iter()
        .find_map(|(prefix, kind)| {
            text.strip_prefix(prefix)
                .map(|detail| StoreError::from_parts(*kind, detail))
        })
        .unwrap_or_else(|| StoreError::Remote(text.to_string()))
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: u64,
}

/// Response envelope. No `result` and no `error` means void success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub id: u64,
}

impl Response {
    pub fn success(id: u64, result: Option<Value>) -> Self {
        Self {
            result,
            error: None,
            id,
        }
    }

    pub fn failure(id: u64, error: &StoreError) -> Self {
        Self {
            result: None,
            error: Some(error.to_string()),
            id,
        }
    }
}

/// One store operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Save { id: ImageId, data: Vec<u8> },
    Load(ImageId),
    Commit(ImageId),
    Cleanup(Duration),
    GetStagingImages,
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::Save { .. } => METHOD_SAVE,
            Call::Load(_) => METHOD_LOAD,
            Call::Commit(_) => METHOD_COMMIT,
            Call::Cleanup(_) => METHOD_CLEANUP,
            Call::GetStagingImages => METHOD_GET_STAGING_IMAGES,
        }
    }

    pub fn params(&self) -> Option<Value> {
        match self {
            Call::Save { id, data } => Some(Value::Array(vec![
                Value::String(id.to_string()),
                Value::String(BASE64.encode(data)),
            ])),
            Call::Load(id) | Call::Commit(id) => Some(Value::String(id.to_string())),
            Call::Cleanup(ttl) => Some(Value::from(encode_duration(*ttl))),
            Call::GetStagingImages => None,
        }
    }

    pub fn into_request(self, id: u64) -> Request {
        Request {
            method: self.method().to_string(),
            params: self.params(),
            id,
        }
    }

    /// Server side: decode method name and params back into a call.
    pub fn decode(method: &str, params: Option<Value>) -> StoreResult<Call> {
        match method {
            METHOD_SAVE => {
                let (id, encoded): (ImageId, String) = from_params(method, params)?;
                let data = BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| protocol(format!("{method}: image is not base64: {e}")))?;
                Ok(Call::Save { id, data })
            }
            METHOD_LOAD => Ok(Call::Load(from_params(method, params)?)),
            METHOD_COMMIT => Ok(Call::Commit(from_params(method, params)?)),
            METHOD_CLEANUP => {
                let nanos: i64 = from_params(method, params)?;
                Ok(Call::Cleanup(decode_duration(nanos)))
            }
            METHOD_GET_STAGING_IMAGES => Ok(Call::GetStagingImages),
            other => Err(StoreError::Remote(format!("unknown method: {other}"))),
        }
    }
}

fn protocol(msg: String) -> StoreError {
    StoreError::Protocol(msg)
}

fn from_params<T: serde::de::DeserializeOwned>(method: &str, params: Option<Value>) -> StoreResult<T> {
    let params = params.ok_or_else(|| protocol(format!("{method}: missing params")))?;
    serde_json::from_value(params).map_err(|e| protocol(format!("{method}: bad params: {e}")))
}

/// Durations travel as integer nanoseconds, saturating at `i64::MAX`.
pub fn encode_duration(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX)
}

/// Negative values mean "everything is older than that", i.e. zero.
pub fn decode_duration(nanos: i64) -> Duration {
    u64::try_from(nanos).map(Duration::from_nanos).unwrap_or(Duration::ZERO)
}

pub fn encode_load_result(data: &[u8]) -> Value {
    Value::String(BASE64.encode(data))
}

pub fn decode_load_result(result: Option<Value>) -> StoreResult<Vec<u8>> {
    let encoded = match result {
        Some(Value::String(encoded)) => encoded,
        other => {
            return Err(protocol(format!(
                "{METHOD_LOAD}: expected base64 string result, got {}",
                describe(other.as_ref())
            )));
        }
    };
    BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| protocol(format!("{METHOD_LOAD}: result is not base64: {e}")))
}

/// Wire shape of the staging listing (Go-style field names).
#[derive(Debug, Serialize, Deserialize)]
struct StagingImagesWire {
    #[serde(rename = "IDs", deserialize_with = "nullable_ids")]
    ids: Vec<ImageId>,
    #[serde(rename = "TS")]
    ts: Timestamp,
}

/// `IDs` must be present but may be `null` for an empty set.
fn nullable_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ImageId>, D::Error> {
    Ok(Option::<Vec<ImageId>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn encode_staging_result(snapshot: &StagingSnapshot) -> StoreResult<Value> {
    let wire = StagingImagesWire {
        ids: snapshot.ids.clone(),
        ts: snapshot.last_cleanup,
    };
    serde_json::to_value(wire).map_err(|e| protocol(format!("{METHOD_GET_STAGING_IMAGES}: {e}")))
}

pub fn decode_staging_result(result: Option<Value>) -> StoreResult<StagingSnapshot> {
    let result = result.ok_or_else(|| {
        protocol(format!("{METHOD_GET_STAGING_IMAGES}: missing result"))
    })?;
    let wire: StagingImagesWire = serde_json::from_value(result)
        .map_err(|e| protocol(format!("{METHOD_GET_STAGING_IMAGES}: bad result: {e}")))?;
    Ok(StagingSnapshot::new(wire.ids, wire.ts))
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "nothing",
        Some(Value::Bool(_)) => "a bool",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_request_bytes() {
        let req = Call::Save {
            id: ImageId::from("54321"),
            data: b"hello".to_vec(),
        }
        .into_request(1);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"method":"image.save_with_id","params":["54321","aGVsbG8="],"id":1}"#
        );
    }

    #[test]
    fn load_and_commit_take_a_bare_string() {
        let load = Call::Load(ImageId::from("54321")).into_request(1);
        assert_eq!(
            serde_json::to_string(&load).unwrap(),
            r#"{"method":"image.load","params":"54321","id":1}"#
        );
        let commit = Call::Commit(ImageId::from("gopher_id")).into_request(7);
        assert_eq!(
            serde_json::to_string(&commit).unwrap(),
            r#"{"method":"image.commit","params":"gopher_id","id":7}"#
        );
    }

    #[test]
    fn cleanup_sends_nanoseconds() {
        let req = Call::Cleanup(Duration::from_secs(60)).into_request(1);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"method":"image.cleanup","params":60000000000,"id":1}"#
        );
    }

    #[test]
    fn staging_request_omits_params() {
        let req = Call::GetStagingImages.into_request(1);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"method":"image.get_staging_images","id":1}"#
        );
    }

    #[test]
    fn void_success_is_just_the_id() {
        assert_eq!(
            serde_json::to_string(&Response::success(1, None)).unwrap(),
            r#"{"id":1}"#
        );
    }

    #[test]
    fn decode_requests_back_into_calls() {
        let save = Call::decode(METHOD_SAVE, Some(json!(["a", "aGVsbG8="]))).unwrap();
        assert_eq!(
            save,
            Call::Save {
                id: ImageId::from("a"),
                data: b"hello".to_vec()
            }
        );
        assert_eq!(
            Call::decode(METHOD_CLEANUP, Some(json!(60_000_000_000i64))).unwrap(),
            Call::Cleanup(Duration::from_secs(60))
        );
        assert_eq!(
            Call::decode(METHOD_GET_STAGING_IMAGES, None).unwrap(),
            Call::GetStagingImages
        );
    }

    #[test]
    fn bad_params_are_protocol_errors() {
        let cases = [
            (METHOD_SAVE, Some(json!("only-id"))),
            (METHOD_SAVE, Some(json!(["a", "not base64!"]))),
            (METHOD_LOAD, None),
            (METHOD_COMMIT, Some(json!(12))),
            (METHOD_CLEANUP, Some(json!("1m"))),
        ];
        for (method, params) in cases {
            let err = Call::decode(method, params).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol, "{method}");
        }
    }

    #[test]
    fn unknown_method_is_reported_verbatim() {
        let err = Call::decode("image.resize", None).unwrap_err();
        assert_eq!(err, StoreError::Remote("unknown method: image.resize".into()));
    }

    #[test]
    fn negative_ttl_decodes_as_zero() {
        assert_eq!(decode_duration(-5), Duration::ZERO);
        assert_eq!(encode_duration(Duration::MAX), i64::MAX);
    }

    #[test]
    fn staging_result_with_zero_timestamp() {
        let snapshot =
            decode_staging_result(Some(json!({"IDs": [], "TS": "0001-01-01T00:00:00Z"}))).unwrap();
        assert!(snapshot.ids.is_empty());
        assert!(snapshot.last_cleanup.is_zero());

        let encoded = encode_staging_result(&snapshot).unwrap();
        assert_eq!(encoded, json!({"IDs": [], "TS": "0001-01-01T00:00:00Z"}));
    }

    #[test]
    fn staging_result_tolerates_null_ids_but_not_missing_fields() {
        let snapshot =
            decode_staging_result(Some(json!({"IDs": null, "TS": "0001-01-01T00:00:00Z"}))).unwrap();
        assert!(snapshot.ids.is_empty());

        for bad in [json!({"TS": "0001-01-01T00:00:00Z"}), json!({"IDs": []}), json!("x")] {
            let err = decode_staging_result(Some(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol);
        }
        assert_eq!(decode_staging_result(None).unwrap_err().kind(), ErrorKind::Protocol);
    }

    #[test]
    fn load_result_must_be_a_base64_string() {
        assert_eq!(decode_load_result(Some(json!("aGVsbG8="))).unwrap(), b"hello");
        for bad in [None, Some(json!(null)), Some(json!(5)), Some(json!("%%%"))] {
            assert_eq!(decode_load_result(bad).unwrap_err().kind(), ErrorKind::Protocol);
        }
    }

    #[test]
    fn every_error_survives_the_text_roundtrip() {
        let id = ImageId::from("54321");
        let errors = [
            StoreError::NotFound(id.clone()),
            StoreError::Write("disk full".into()),
            StoreError::Read("eio".into()),
            StoreError::Canceled,
            StoreError::Protocol("bad".into()),
            StoreError::Remote("something odd".into()),
            StoreError::AlreadyStaged(id.clone()),
            StoreError::AlreadyCommitted(id.clone()),
            StoreError::InvalidId(ImageId::from("../x")),
            StoreError::Transport("connection refused".into()),
        ];
        for err in errors {
            assert_eq!(decode_error(&err.to_string()), err);
        }
    }

    #[test]
    fn table_prefixes_match_display() {
        for (prefix, kind) in ERROR_TABLE {
            let rendered = StoreError::from_parts(*kind, "x").to_string();
            assert!(rendered.starts_with(prefix), "{kind:?}: {rendered}");
        }
    }

    #[test]
    fn unrecognized_text_is_remote() {
        assert_eq!(
            decode_error("can't load image"),
            StoreError::Remote("can't load image".into())
        );
    }
}
