//! Google Drive API request and response types
//!
//! Data structures for the Drive API v3 `files` resource.

use bridge_traits::storage::{RemoteFile, SHORTCUT_MIME_TYPE};
use serde::{Deserialize, Serialize};

/// Google Drive API file resource, restricted to the fields we request.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes, sent as a decimal string. Absent for folders and
    /// Google-native documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default)]
    pub parents: Vec<String>,
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        RemoteFile {
            size: file.size.as_deref().and_then(|s| s.parse().ok()),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            parent_ids: file.parents,
        }
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body of a files.create call that makes a shortcut.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShortcutRequest {
    pub name: String,
    pub mime_type: &'static str,
    pub shortcut_details: ShortcutDetails,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: String,
}

impl CreateShortcutRequest {
    pub fn new(target_id: &str, container_id: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            mime_type: SHORTCUT_MIME_TYPE,
            shortcut_details: ShortcutDetails {
                target_id: target_id.to_string(),
            },
            parents: vec![container_id.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_request_shape() {
        let body = serde_json::to_value(CreateShortcutRequest::new("T", "X", "a.txt")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "a.txt",
                "mimeType": "application/vnd.google-apps.shortcut",
                "shortcutDetails": { "targetId": "T" },
                "parents": ["X"]
            })
        );
    }

    #[test]
    fn test_drive_file_into_remote_file() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id":"f1","name":"song.mp3","mimeType":"audio/mpeg","size":"1024","parents":["p"]}"#,
        )
        .unwrap();
        let remote = RemoteFile::from(file);

        assert_eq!(remote.size, Some(1024));
        assert_eq!(remote.parent_ids, vec!["p".to_string()]);
        assert!(!remote.is_folder());
    }

    #[test]
    fn test_list_response_without_files() {
        let list: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
