use std::collections::HashMap;
use std::io::Read;

use base64::Engine;
use flate2::read::ZlibDecoder;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("failed to decompress payload: {0}")]
    Decompress(std::io::Error),
    #[error("failed to parse payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("small file {path} is not valid base64: {error}")]
    Base64 {
        path: String,
        error: base64::DecodeError,
    },
}

/// One census document as reported by a client, decoded from the wire.
///
/// Every section is optional; absent sections produce no rows. `device_name`
/// is the only required key.
#[derive(Debug, Deserialize)]
pub struct Submission {
    pub device_name: String,
    pub system_properties: Option<HashMap<String, String>>,
    pub sysctl: Option<HashMap<String, String>>,
    pub environment_variables: Option<HashMap<String, String>>,
    pub features: Option<Vec<String>>,
    pub system_shared_libraries: Option<Vec<String>>,
    pub permissions: Option<Vec<PermissionEntry>>,
    pub file_permissions: Option<Vec<FilePermissionEntry>>,
    pub providers: Option<Vec<ProviderEntry>>,
    /// path -> base64-encoded contents
    pub small_files: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionEntry {
    pub name: String,
    #[serde(rename = "packageName")]
    pub package_name: String,
    // Observed clients send the snake_case spelling for this one field.
    #[serde(
        rename = "protectionLevel",
        alias = "protection_level",
        deserialize_with = "int_from_number_or_string"
    )]
    pub protection_level: i32,
    #[serde(deserialize_with = "int_from_number_or_string")]
    pub flags: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePermissionEntry {
    pub path: String,
    pub link_path: Option<String>,
    pub mode: i32,
    pub size: i64,
    pub uid: i32,
    pub gid: i32,
    pub selinux_context: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    pub authority: String,
    pub init_order: i32,
    pub multiprocess: bool,
    pub grant_uri_permissions: bool,
    pub read_permission: Option<String>,
    pub write_permission: Option<String>,
    /// JSON-encoded array, stored as received.
    pub path_permissions: Option<String>,
    /// JSON-encoded array, stored as received.
    pub uri_permission_patterns: Option<String>,
    pub flags: Option<i32>,
}

impl Submission {
    /// Decode one stored payload: zlib-inflate, then parse into the typed
    /// document. Validation happens here, once, at the ingestion boundary.
    pub fn from_compressed(data: &[u8]) -> Result<Self, SubmissionError> {
        let mut decoder = ZlibDecoder::new(data);
        let mut json = String::new();
        decoder
            .read_to_string(&mut json)
            .map_err(SubmissionError::Decompress)?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Base64-decode the captured file snapshots into raw bytes.
    pub fn decoded_small_files(&self) -> Result<Vec<(String, Vec<u8>)>, SubmissionError> {
        let files = match &self.small_files {
            Some(files) => files,
            None => return Ok(Vec::new()),
        };

        files
            .iter()
            .map(|(path, contents)| {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(contents)
                    .map_err(|error| SubmissionError::Base64 {
                        path: path.clone(),
                        error,
                    })?;
                Ok((path.clone(), decoded))
            })
            .collect()
    }
}

/// Some clients report integer fields as JSON strings; accept both.
fn int_from_number_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => i32::try_from(value).map_err(serde::de::Error::custom),
        NumberOrString::String(value) => value
            .trim()
            .parse::<i32>()
            .map_err(serde::de::Error::custom),
    }
}
