//! MCP tool-call result content.
//!
//! Clients downstream of the gateway only render `text` entries, so file
//! results travel as a text entry whose body is a pretty-printed JSON file
//! descriptor. That encoding lives in [`ContentEntry`]'s serializer and
//! nowhere else.

use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};

/// Metadata for a downloadable file produced by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub download_url: String,
    pub filename: String,
    pub mime_type: String,
    pub expires_in: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileDescriptor<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    download_url: &'a str,
    filename: &'a str,
    mime_type: &'a str,
    expires_in: &'a str,
}

impl FileContent {
    /// The JSON text a file entry is rendered as.
    pub fn descriptor_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&FileDescriptor {
            kind: "file",
            download_url: &self.download_url,
            filename: &self.filename,
            mime_type: &self.mime_type,
            expires_in: &self.expires_in,
        })
    }
}

/// One entry of a tool result's `content` array.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEntry {
    Text(String),
    File(FileContent),
}

impl Serialize for ContentEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let descriptor;
        let text = match self {
            ContentEntry::Text(text) => text.as_str(),
            ContentEntry::File(file) => {
                descriptor = file.descriptor_json().map_err(S::Error::custom)?;
                descriptor.as_str()
            }
        };

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "text")?;
        map.serialize_entry("text", text)?;
        map.end()
    }
}

/// Tool call response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentEntry>,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentEntry::Text(text.into())],
        }
    }

    pub fn file(download_url: &str, filename: &str, mime_type: &str, expires_in: &str) -> Self {
        Self {
            content: vec![ContentEntry::File(FileContent {
                download_url: download_url.to_string(),
                filename: filename.to_string(),
                mime_type: mime_type.to_string(),
                expires_in: expires_in.to_string(),
            })],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_text_content() {
        let value = serde_json::to_value(ToolCallResult::text("hello")).unwrap();
        assert_eq!(value, json!({"content": [{"type": "text", "text": "hello"}]}));
    }

    #[test]
    fn test_file_content_is_text_with_json_body() {
        let result = ToolCallResult::file("http://x/f", "a.png", "image/png", "1h");
        assert_eq!(result.content.len(), 1);

        let value = serde_json::to_value(&result).unwrap();
        let entry = &value["content"][0];
        assert_eq!(entry["type"], "text");

        let text = entry["text"].as_str().unwrap();
        assert!(text.contains('\n'), "descriptor should be pretty-printed");

        let descriptor: Value = serde_json::from_str(text).unwrap();
        assert_eq!(descriptor["downloadUrl"], "http://x/f");
        assert_eq!(descriptor["filename"], "a.png");
        assert_eq!(descriptor["mimeType"], "image/png");
        assert_eq!(descriptor["expiresIn"], "1h");
    }

    #[test]
    fn test_result_has_no_is_error_flag() {
        let value = serde_json::to_value(ToolCallResult::text("boom")).unwrap();
        assert!(value.get("isError").is_none());
    }
}
