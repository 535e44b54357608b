//! Twitter API v2 client with OAuth 1.0a user-context signing.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha1::Sha1;

use super::{DeliveryError, PlatformClient, SentMessage, check_status};
use crate::destinations::{Credentials, Platform};

const API_BASE: &str = "https://api.twitter.com";

type HmacSha1 = Hmac<Sha1>;

/// Posts tweets on behalf of an authorized account.
#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    base_url: String,
}

impl TwitterClient {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PlatformClient for TwitterClient {
    async fn send(
        &self,
        credentials: &Credentials,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, DeliveryError> {
        let Credentials::Twitter {
            consumer_key,
            consumer_secret,
            access_token,
            access_secret,
        } = credentials
        else {
            return Err(DeliveryError::WrongCredentials {
                platform: Platform::Twitter,
                given: credentials.platform(),
            });
        };

        let url = format!("{}/2/tweets", self.base_url);
        let oauth = OAuthParams {
            consumer_key,
            token: access_token,
            nonce: nonce(),
            timestamp: Utc::now().timestamp(),
        };
        let authorization = oauth.header("POST", &url, consumer_secret, access_secret)?;

        let mut body = json!({ "text": text });
        if let Some(tweet_id) = reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": tweet_id });
        }

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;
        let response = check_status(Platform::Twitter, response).await?;

        #[derive(Deserialize)]
        struct Tweet {
            id: String,
        }

        #[derive(Deserialize)]
        struct Created {
            data: Tweet,
        }

        let created: Created = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
        Ok(SentMessage {
            id: created.data.id,
        })
    }
}

struct OAuthParams<'a> {
    consumer_key: &'a str,
    token: &'a str,
    nonce: String,
    timestamp: i64,
}

impl OAuthParams<'_> {
    fn params(&self) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".into(), self.consumer_key.into()),
            ("oauth_nonce".into(), self.nonce.clone()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), self.timestamp.to_string()),
            ("oauth_token".into(), self.token.into()),
            ("oauth_version".into(), "1.0".into()),
        ]
    }

    /// `Authorization` header for a request whose body is not form-encoded.
    fn header(
        &self,
        method: &str,
        url: &str,
        consumer_secret: &str,
        token_secret: &str,
    ) -> Result<String, DeliveryError> {
        let mut params = self.params();
        let base = signature_base(method, url, &params);
        let signature = sign(&base, consumer_secret, token_secret)?;
        params.push(("oauth_signature".into(), signature));

        let fields: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn signature_base(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&joined)
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String, DeliveryError> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| DeliveryError::InvalidResponse(format!("signing key rejected: {e}")))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
