use super::ports::{AuthError, IntrospectionClaims, ProviderClient, TokenPayload};
use async_trait::async_trait;
use config::GoogleOAuthConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(60);

const OAUTH_SCOPE: &str = "openid email profile";

/// Google token-endpoint client. Every method makes exactly one HTTP
/// attempt: a code exchange is not idempotent, so failures surface to
/// the caller instead of being retried.
pub struct GoogleOAuthClient {
    http: Client,
    config: GoogleOAuthConfig,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .build()
            .map_err(|e| AuthError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenPayload, AuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("Token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {status}: {body}");
            return Err(AuthError::ExchangeFailed(format!(
                "provider returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("malformed token response: {e}")))
    }
}

#[async_trait]
impl ProviderClient for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::ConfigError(format!("Invalid authorization URL: {e}")))?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPayload, AuthError> {
        debug!("Exchanging authorization code for tokens");

        self.token_grant(&[
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError> {
        debug!("Exchanging refresh token for a new access token");

        self.token_grant(&[
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn introspect(&self, access_token: &str) -> Result<IntrospectionClaims, AuthError> {
        let response = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| {
                AuthError::NetworkError(format!("Introspection endpoint unreachable: {e}"))
            })?;

        // Anything but 200 means the token is invalid or expired
        if response.status() != reqwest::StatusCode::OK {
            debug!(
                "Introspection returned status {}, treating as unauthorized",
                response.status()
            );
            return Err(AuthError::Unauthorized);
        }

        response.json().await.map_err(|e| {
            AuthError::InternalError(format!("malformed introspection response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "client-x".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/login/callback".to_string(),
            auth_url: config::GOOGLE_AUTH_URL.to_string(),
            token_url: config::GOOGLE_TOKEN_URL.to_string(),
            tokeninfo_url: config::GOOGLE_TOKENINFO_URL.to_string(),
        }
    }

    #[test]
    fn authorization_url_carries_all_parameters() {
        let client = GoogleOAuthClient::new(test_config()).unwrap();

        let url = client.authorization_url("state-123").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(params.contains(&("client_id".into(), "client-x".into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "http://localhost:8000/auth/login/callback".into()
        )));
        assert!(params.contains(&("response_type".into(), "code".into())));
        assert!(params.contains(&("scope".into(), "openid email profile".into())));
        assert!(params.contains(&("state".into(), "state-123".into())));
        assert!(params.contains(&("access_type".into(), "offline".into())));
        assert!(params.contains(&("prompt".into(), "consent".into())));
    }

    #[test]
    fn authorization_url_encodes_scope() {
        let client = GoogleOAuthClient::new(test_config()).unwrap();

        let url = client.authorization_url("s").unwrap();
        assert!(url.contains("scope=openid+email+profile") || url.contains("scope=openid%20email%20profile"));
    }
}
