//! Cloudflare rules-list client.
//!
//! Mirrors local allowlist mutations onto the account's rules list. The list
//! id is resolved lazily (explicit id, then exact name match, then the first
//! list) and cached for the client's lifetime, as is the last full item
//! listing; any mutation invalidates the item cache. No retries here: retry
//! policy belongs to the transport.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::config::{RemoteSettings, SecureString};
use crate::error::Error;
use crate::transport::{HttpTransport, ReqwestTransport};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";
const PAGE_SIZE: u32 = 1000;

/// One item on the remote rules list. The API reports the address under
/// `ip` for IP lists but `value` in some responses; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl RemoteItem {
    /// The item's address, whichever field carries it.
    pub fn address(&self) -> Option<&str> {
        self.ip.as_deref().or(self.value.as_deref())
    }

    pub fn comment_or_empty(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }
}

/// Operations the sync coordinator needs from a remote rules list.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RulesList: Send + Sync {
    /// All items, paging through the remote API unless the cache is warm
    /// and `use_cache` is set.
    async fn list_items(&mut self, use_cache: bool) -> Result<Vec<RemoteItem>, Error>;

    /// Linear scan of `list_items` by address.
    async fn find_by_ip(&mut self, ip: &str) -> Result<Option<RemoteItem>, Error>;

    /// Create an item. Invalidates the item cache.
    async fn add(&mut self, ip: &str, comment: &str) -> Result<(), Error>;

    /// Update an item's comment by address; creates the item when absent.
    /// Invalidates the item cache.
    async fn update_comment(&mut self, ip: &str, comment: &str) -> Result<(), Error>;

    /// Delete an item by address; a no-op when absent.
    /// Invalidates the item cache.
    async fn delete(&mut self, ip: &str) -> Result<(), Error>;

    /// Add when absent, else update the comment.
    async fn upsert(&mut self, ip: &str, comment: &str) -> Result<(), Error>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListInfo {
    id: String,
    name: Option<String>,
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<Envelope<T>, Error> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|_| Error::Remote("invalid JSON response".to_string()))?;

    if !envelope.success {
        let message = envelope
            .errors
            .iter()
            .find_map(|e| e.message.clone())
            .unwrap_or_else(|| "no error message".to_string());
        return Err(Error::Remote(message));
    }

    Ok(envelope)
}

/// Client for the Cloudflare rules-list API.
///
/// Configuration is read once at construction and immutable thereafter.
pub struct CloudflareListClient {
    transport: Box<dyn HttpTransport>,
    api_token: SecureString,
    account_id: String,
    list_id: Option<String>,
    list_name: Option<String>,
    items_cache: Option<Vec<RemoteItem>>,
}

impl CloudflareListClient {
    pub fn new(
        transport: Box<dyn HttpTransport>,
        api_token: SecureString,
        account_id: String,
        list_id: Option<String>,
        list_name: Option<String>,
    ) -> Self {
        Self {
            transport,
            api_token,
            account_id,
            list_id,
            list_name,
            items_cache: None,
        }
    }

    /// Build a client over a real reqwest transport.
    pub fn from_settings(settings: RemoteSettings) -> Result<Self, Error> {
        let transport = Box::new(ReqwestTransport::new()?);
        Ok(Self::new(
            transport,
            settings.api_token,
            settings.account_id,
            settings.list_id,
            settings.list_name,
        ))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        query: Option<String>,
        body: Option<serde_json::Value>,
    ) -> Result<Envelope<T>, Error> {
        let mut url = format!("{}/{}", API_BASE, path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(&query);
        }

        let headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_token.as_str()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];

        let body = body.map(|b| b.to_string());
        let response = self.transport.request(method, &url, &headers, body).await?;
        decode(&response.body)
    }

    /// Resolve the target list id: explicit id, then exact name match, then
    /// the first list on the account. Cached once resolved.
    async fn resolve_list_id(&mut self) -> Result<String, Error> {
        if let Some(id) = &self.list_id {
            return Ok(id.clone());
        }

        let path = format!("accounts/{}/rules/lists", self.account_id);
        let envelope: Envelope<Vec<ListInfo>> = self.request("GET", &path, None, None).await?;
        let lists = envelope.result.unwrap_or_default();
        if lists.is_empty() {
            return Err(Error::NoLists);
        }

        let id = match &self.list_name {
            Some(name) => lists
                .iter()
                .find(|l| l.name.as_deref() == Some(name.as_str()))
                .map(|l| l.id.clone())
                .ok_or_else(|| Error::ListNotFound(name.clone()))?,
            None => lists[0].id.clone(),
        };

        debug!("Resolved rules list id: {}", id);
        self.list_id = Some(id.clone());
        Ok(id)
    }

    async fn items_path(&mut self) -> Result<String, Error> {
        let list_id = self.resolve_list_id().await?;
        Ok(format!(
            "accounts/{}/rules/lists/{}/items",
            self.account_id, list_id
        ))
    }
}

#[async_trait]
impl RulesList for CloudflareListClient {
    async fn list_items(&mut self, use_cache: bool) -> Result<Vec<RemoteItem>, Error> {
        if use_cache {
            if let Some(cache) = &self.items_cache {
                return Ok(cache.clone());
            }
        }

        let path = self.items_path().await?;
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let query = match &cursor {
                Some(c) => format!("per_page={}&cursor={}", PAGE_SIZE, c),
                None => format!("per_page={}", PAGE_SIZE),
            };

            let envelope: Envelope<Vec<RemoteItem>> =
                self.request("GET", &path, Some(query), None).await?;
            all.extend(envelope.result.unwrap_or_default());

            match envelope
                .result_info
                .and_then(|info| info.cursors)
                .and_then(|c| c.after)
            {
                Some(after) if !after.is_empty() => cursor = Some(after),
                _ => break,
            }
        }

        debug!("Fetched {} remote list items", all.len());
        self.items_cache = Some(all.clone());
        Ok(all)
    }

    async fn find_by_ip(&mut self, ip: &str) -> Result<Option<RemoteItem>, Error> {
        let items = self.list_items(true).await?;
        Ok(items.into_iter().find(|item| item.address() == Some(ip)))
    }

    async fn add(&mut self, ip: &str, comment: &str) -> Result<(), Error> {
        let path = self.items_path().await?;
        let body = json!({ "items": [ { "ip": ip, "comment": comment } ] });
        self.request::<serde_json::Value>("POST", &path, None, Some(body))
            .await?;
        self.items_cache = None;
        Ok(())
    }

    async fn update_comment(&mut self, ip: &str, comment: &str) -> Result<(), Error> {
        let Some(item) = self.find_by_ip(ip).await? else {
            return self.add(ip, comment).await;
        };

        let path = self.items_path().await?;
        let body = json!({ "items": [ { "id": item.id, "comment": comment } ] });
        self.request::<serde_json::Value>("PUT", &path, None, Some(body))
            .await?;
        self.items_cache = None;
        Ok(())
    }

    async fn delete(&mut self, ip: &str) -> Result<(), Error> {
        let Some(item) = self.find_by_ip(ip).await? else {
            return Ok(());
        };

        let path = self.items_path().await?;
        let body = json!({ "items": [ { "id": item.id } ] });
        self.request::<serde_json::Value>("DELETE", &path, None, Some(body))
            .await?;
        self.items_cache = None;
        Ok(())
    }

    async fn upsert(&mut self, ip: &str, comment: &str) -> Result<(), Error> {
        if self.find_by_ip(ip).await?.is_none() {
            self.add(ip, comment).await
        } else {
            self.update_comment(ip, comment).await
        }
    }
}
