use caltrack_core::error::{Result, TrackerError};
use caltrack_core::models::Settings;
use caltrack_core::resolver::{FoodResolver, ResolvedFood};

const LOOKUP_URL: &str = "https://cal-track-api.vercel.app/api/cal-track";

/// HTTP client for the cal-track lookup API.
pub struct CalTrackClient {
    client: reqwest::Client,
    custom_keys: Option<(String, String)>,
}

impl CalTrackClient {
    /// Build a client, forwarding the user's own API keys only when custom
    /// keys are enabled and both are present.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "caltrack-cli/{} (calorie tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            custom_keys: settings
                .resolver_keys()
                .map(|(g, s)| (g.to_string(), s.to_string())),
        }
    }
}

impl FoodResolver for CalTrackClient {
    async fn resolve(&self, name: &str) -> Result<ResolvedFood> {
        tracing::debug!(food = name, custom_keys = self.custom_keys.is_some(), "dispatching lookup");
        let mut request = self.client.get(LOOKUP_URL).query(&[("food", name)]);
        if let Some((gemini, scira)) = &self.custom_keys {
            request = request.query(&[("geminiKey", gemini.as_str()), ("sciraKey", scira.as_str())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TrackerError::Resolution(format!("failed to reach lookup API: {e}")))?;

        // Any non-success status is treated uniformly as "food not found".
        if !resp.status().is_success() {
            return Err(TrackerError::Resolution("food not found".to_string()));
        }

        resp.json::<ResolvedFood>()
            .await
            .map_err(|e| TrackerError::Resolution(format!("invalid lookup response: {e}")))
    }
}
