use tokio::sync::RwLock;

/// Best-effort event delivery to an externally configured webhook URL.
///
/// The target is unset at startup and configured once by the management bot
/// via POST /webhook. Delivery runs detached and all failures are swallowed;
/// a lost notification must never fail or slow down the request it logs.
pub struct WebhookService {
    client: reqwest::Client,
    url: RwLock<Option<String>>,
}

impl WebhookService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: RwLock::new(None),
        }
    }

    pub async fn set_url(&self, url: String) {
        tracing::info!("Webhook target configured");
        *self.url.write().await = Some(url);
    }

    pub async fn notify(&self, message: String) {
        let Some(url) = self.url.read().await.clone() else {
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let body = serde_json::json!({ "content": message });
            if let Err(e) = client.post(&url).json(&body).send().await {
                tracing::debug!("Webhook delivery failed: {}", e);
            }
        });
    }
}

impl Default for WebhookService {
    fn default() -> Self {
        Self::new()
    }
}
