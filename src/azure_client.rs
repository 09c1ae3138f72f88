// src/azure_client.rs
//
// REST client bound to one blob container. Three operations back the whole
// pipeline: list-by-prefix, mint-read-grant, and stream-read-by-url; any
// object store exposing those is a valid substitute.

use quick_xml::de::from_str as xml_from_str;
use serde::Deserialize;
use url::Url;

use crate::config::Settings;
use crate::error::HarvestError;
use crate::sas::{Permissions, SasProvider, Scope};

/// A single remotely stored file, as discovered by the lister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Slash-separated path relative to the container root.
    pub path: String,
    /// Inferred from the path's extension.
    pub kind: ObjectKind,
}

/// What the pipeline does with an object is decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Columnar data carrying embedded payloads (`.parquet`).
    Parquet,
    /// Zip-style container (`.zip`).
    Zip,
    /// Tar+gzip container (`.tgz`, `.tar.gz`).
    TarGz,
    /// Delimited text, kept as-is (`.csv`).
    Csv,
    /// Spreadsheet, kept as-is (`.xlsx`, `.xls`).
    Spreadsheet,
    /// Anything else; skipped.
    Unsupported,
}

impl ObjectKind {
    pub fn from_path(path: &str) -> ObjectKind {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".parquet") {
            ObjectKind::Parquet
        } else if lower.ends_with(".zip") {
            ObjectKind::Zip
        } else if lower.ends_with(".tgz") || lower.ends_with(".tar.gz") {
            ObjectKind::TarGz
        } else if lower.ends_with(".csv") {
            ObjectKind::Csv
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            ObjectKind::Spreadsheet
        } else {
            ObjectKind::Unsupported
        }
    }

    /// True for container formats the unpacker understands.
    pub fn is_archive(&self) -> bool {
        matches!(self, ObjectKind::Zip | ObjectKind::TarGz)
    }
}

/// How requests get authorized: a signer minting fresh grants per operation,
/// or one externally supplied token used verbatim.
#[derive(Debug)]
enum Auth {
    Signer(SasProvider),
    Token(String),
}

/// High-level client bound to one container.
#[derive(Debug)]
pub struct AzureBlob {
    account_url: String, // e.g. https://{account}.blob.core.windows.net
    pub container: String,
    auth: Auth,
    http: reqwest::Client,
}

impl AzureBlob {
    /// Public Azure endpoint for an account name.
    fn account_url_from_account(account: &str) -> String {
        format!("https://{}.blob.core.windows.net", account)
    }

    /// Azurite helper, e.g. http://127.0.0.1:10000/{account}
    #[allow(dead_code)]
    pub fn azurite_url(host: &str, port: u16, account: &str) -> String {
        format!("http://{}:{}/{}", host, port, account)
    }

    /// Build from settings: endpoint override wins over the public endpoint,
    /// an external token wins over the signing key.
    pub fn from_settings(settings: &Settings) -> Result<Self, HarvestError> {
        let account_url = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| Self::account_url_from_account(&settings.account));

        let auth = if let Some(token) = &settings.sas_token {
            Auth::Token(token.trim_start_matches('?').to_string())
        } else if let Some(key) = &settings.account_key {
            Auth::Signer(SasProvider::new(&settings.account, &settings.container, key)?)
        } else {
            return Err(HarvestError::MissingCredentials {
                key_env: crate::constants::ENV_AZURE_ACCOUNT_KEY,
                token_env: crate::constants::ENV_AZURE_SAS_TOKEN,
            });
        };

        Ok(AzureBlob {
            account_url,
            container: settings.container.clone(),
            auth,
            http: reqwest::Client::new(),
        })
    }

    fn container_token(&self) -> String {
        match &self.auth {
            Auth::Token(t) => t.clone(),
            Auth::Signer(p) => p.grant(Scope::Container, Permissions::READ_LIST, None).token,
        }
    }

    fn blob_token(&self, blob: &str) -> String {
        match &self.auth {
            Auth::Token(t) => t.clone(),
            Auth::Signer(p) => p.grant(Scope::Blob(blob), Permissions::READ, None).token,
        }
    }

    /// Grant-bearing URL for one blob, path segments encoded.
    pub fn blob_url(&self, blob: &str) -> Result<Url, HarvestError> {
        let mut url = Url::parse(&self.account_url).map_err(|e| {
            HarvestError::InvalidConfig(format!("bad endpoint '{}': {e}", self.account_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| HarvestError::InvalidConfig(format!("endpoint '{}' cannot carry a path", self.account_url)))?
            .pop_if_empty()
            .push(&self.container)
            .extend(blob.split('/'));
        url.set_query(Some(&self.blob_token(blob)));
        Ok(url)
    }

    fn list_url(&self, prefix: &str, marker: Option<&str>) -> Result<Url, HarvestError> {
        let mut url = Url::parse(&self.account_url).map_err(|e| {
            HarvestError::InvalidConfig(format!("bad endpoint '{}': {e}", self.account_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| HarvestError::InvalidConfig(format!("endpoint '{}' cannot carry a path", self.account_url)))?
            .pop_if_empty()
            .push(&self.container);
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("restype", "container").append_pair("comp", "list");
            if !prefix.is_empty() {
                q.append_pair("prefix", prefix);
            }
            if let Some(m) = marker {
                q.append_pair("marker", m);
            }
        }
        let full_query = match url.query() {
            Some(q) => format!("{q}&{}", self.container_token()),
            None => self.container_token(),
        };
        url.set_query(Some(&full_query));
        Ok(url)
    }

    /// Flat list with name-prefix filtering, following continuation markers
    /// until the enumeration is exhausted. Ordering is whatever the store
    /// returns; callers must not depend on it.
    pub async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, HarvestError> {
        let fail = |reason: String| HarvestError::ListingFailed {
            prefix: prefix.to_string(),
            reason,
        };

        let mut out = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let url = self.list_url(prefix, marker.as_deref())?;
            let resp = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| fail(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(fail(format!("status {}", resp.status())));
            }
            let body = resp.text().await.map_err(|e| fail(e.to_string()))?;
            let page: ListBlobsResponse =
                xml_from_str(&body).map_err(|e| fail(format!("bad listing response: {e}")))?;

            for entry in page.blobs.items {
                let kind = ObjectKind::from_path(&entry.name);
                out.push(RemoteObject { path: entry.name, kind });
            }

            match page.next_marker.filter(|m| !m.is_empty()) {
                Some(m) => marker = Some(m),
                None => break,
            }
        }
        Ok(out)
    }

    /// Open a streaming GET for one object. Returns the checked response;
    /// the downloader drains it to disk in bounded chunks.
    pub async fn get_stream(&self, blob: &str) -> Result<reqwest::Response, HarvestError> {
        let url = self.blob_url(blob)?;
        let resp = self.http.get(url).send().await.map_err(|e| {
            HarvestError::DownloadFailed { object: blob.to_string(), reason: e.to_string() }
        })?;
        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(HarvestError::AuthorizationExpired {
                object: blob.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(HarvestError::DownloadFailed {
                object: blob.to_string(),
                reason: format!("status {status}"),
            });
        }
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Listing response (XML)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListBlobsResponse {
    #[serde(rename = "Blobs", default)]
    blobs: BlobList,
    #[serde(rename = "NextMarker")]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    #[serde(rename = "Name")]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(ObjectKind::from_path("a/b/data.parquet"), ObjectKind::Parquet);
        assert_eq!(ObjectKind::from_path("ml/batch.ZIP"), ObjectKind::Zip);
        assert_eq!(ObjectKind::from_path("ml/inner.tgz"), ObjectKind::TarGz);
        assert_eq!(ObjectKind::from_path("ml/inner.tar.gz"), ObjectKind::TarGz);
        assert_eq!(ObjectKind::from_path("nlp/notes.csv"), ObjectKind::Csv);
        assert_eq!(ObjectKind::from_path("nlp/book.xlsx"), ObjectKind::Spreadsheet);
        assert_eq!(ObjectKind::from_path("misc/readme.txt"), ObjectKind::Unsupported);
        assert!(ObjectKind::from_path("x.zip").is_archive());
        assert!(!ObjectKind::from_path("x.parquet").is_archive());
    }

    #[test]
    fn listing_response_parses() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="data">
  <Blobs>
    <Blob><Name>raw/part-0.parquet</Name></Blob>
    <Blob><Name>raw/part-1.parquet</Name></Blob>
  </Blobs>
  <NextMarker>abc123</NextMarker>
</EnumerationResults>"#;
        let page: ListBlobsResponse = xml_from_str(xml).unwrap();
        assert_eq!(page.blobs.items.len(), 2);
        assert_eq!(page.blobs.items[0].name, "raw/part-0.parquet");
        assert_eq!(page.next_marker.as_deref(), Some("abc123"));
    }

    #[test]
    fn listing_response_handles_empty_page() {
        let xml = r#"<EnumerationResults><Blobs/><NextMarker/></EnumerationResults>"#;
        let page: ListBlobsResponse = xml_from_str(xml).unwrap();
        assert!(page.blobs.items.is_empty());
        assert!(page.next_marker.as_deref().unwrap_or("").is_empty());
    }
}
