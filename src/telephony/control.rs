//! The telephony control plane: an HTTP-like RPC surface for placing
//! calls and moving a live call into a conference.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CoreError;

/// Result of placing an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub call_id: String,
}

/// A status callback delivered as form-encoded `event`, `conference_sid`,
/// `participant_label`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConferenceStatusEvent {
    pub event: String,
    pub conference_sid: String,
    pub participant_label: String,
}

/// The boundary contract with the external telephony provider.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Place an outbound call; `callback_url` carries whatever query
    /// string context the telephony service should echo back on the
    /// media-stream `start` frame.
    async fn place_call(
        &self,
        from: &str,
        to: &str,
        callback_url: &str,
    ) -> Result<PlacedCall, CoreError>;

    /// Replace the live call's TwiML-equivalent instructions, used to
    /// move a call into a conference.
    async fn update_call(&self, call_id: &str, twiml: &str) -> Result<(), CoreError>;

    /// Create a named conference and dial a participant into it.
    async fn create_conference(
        &self,
        conference_name: &str,
        dial_to: &str,
        status_callback: &str,
    ) -> Result<(), CoreError>;
}

/// `reqwest`-backed implementation of [`ControlPlane`] for providers
/// exposing a Twilio-shaped REST API.
pub struct HttpControlPlane {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>, account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn place_call(
        &self,
        from: &str,
        to: &str,
        callback_url: &str,
    ) -> Result<PlacedCall, CoreError> {
        #[derive(Deserialize)]
        struct CallResponse {
            sid: String,
        }

        let url = format!(
            "{}/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from), ("To", to), ("Url", callback_url)])
            .send()
            .await
            .map_err(|e| CoreError::Telephony(format!("place_call request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(CoreError::Telephony(format!(
                "place_call returned status {}",
                resp.status()
            )));
        }

        let body: CallResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Telephony(format!("place_call response decode failed: {e}")))?;
        Ok(PlacedCall { call_id: body.sid })
    }

    async fn update_call(&self, call_id: &str, twiml: &str) -> Result<(), CoreError> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_id
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Twiml", twiml)])
            .send()
            .await
            .map_err(|e| CoreError::Telephony(format!("update_call request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(CoreError::Telephony(format!(
                "update_call returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn create_conference(
        &self,
        conference_name: &str,
        dial_to: &str,
        status_callback: &str,
    ) -> Result<(), CoreError> {
        let url = format!(
            "{}/Accounts/{}/Conferences.json",
            self.base_url, self.account_sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("FriendlyName", conference_name),
                ("DialTo", dial_to),
                ("StatusCallback", status_callback),
            ])
            .send()
            .await
            .map_err(|e| CoreError::Telephony(format!("create_conference request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(CoreError::Telephony(format!(
                "create_conference returned status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn place_call_parses_sid_from_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/Accounts/.*/Calls\.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sid": "CA123"
            })))
            .mount(&server)
            .await;

        let cp = HttpControlPlane::new(server.uri(), "AC_test", "token");
        let placed = cp
            .place_call("+15551234", "+15555678", "https://example.com/cb")
            .await
            .expect("place_call succeeds");
        assert_eq!(placed.call_id, "CA123");
    }

    #[tokio::test]
    async fn place_call_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/Accounts/.*/Calls\.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cp = HttpControlPlane::new(server.uri(), "AC_test", "token");
        let result = cp.place_call("+15551234", "+15555678", "https://example.com/cb").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_call_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/Accounts/.*/Calls/.*\.json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let cp = HttpControlPlane::new(server.uri(), "AC_test", "token");
        let result = cp.update_call("CA123", "<Response/>").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn create_conference_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/Accounts/.*/Conferences\.json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let cp = HttpControlPlane::new(server.uri(), "AC_test", "token");
        let result = cp
            .create_conference("conf-1", "+15559999", "https://example.com/status")
            .await;
        assert!(result.is_ok());
    }
}
