// Minimal Twilio Programmable Messaging client used to deliver one-time codes by SMS.

use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client};
use tracing::{debug, error};

use crate::models::{ApiError, MessageResponse};

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format (e.g. `+15005550006`).
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// URL of the Messages resource for the configured account.
    pub fn messages_url(&self) -> String {
        format!(
            "{base}/Accounts/{sid}/Messages.json",
            base = API_BASE,
            sid = self.options.account_sid
        )
    }

    /// Form body for a text message from the configured sender.
    pub fn message_form<'a>(&'a self, to: &'a str, body: &'a str) -> HashMap<&'static str, &'a str> {
        let mut form_body = HashMap::new();
        form_body.insert("To", to);
        form_body.insert("From", self.options.from_number.as_str());
        form_body.insert("Body", body);
        form_body
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> Result<MessageResponse, &'static str> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&self.message_form(to, body))
            .send()
            .await;

        match res {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    let error_body = response.text().await.unwrap_or_default();
                    match serde_json::from_str::<ApiError>(&error_body) {
                        Ok(api_error) => error!(
                            status = %status,
                            code = ?api_error.code,
                            message = %api_error.message,
                            "Twilio rejected message"
                        ),
                        Err(_) => error!(status = %status, body = %error_body, "Twilio returned an error"),
                    }
                    return Err("Twilio returned an error");
                }

                match response.json::<MessageResponse>().await {
                    Ok(data) => {
                        debug!(sid = %data.sid, status = %data.status, "Twilio accepted message");
                        Ok(data)
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to parse Twilio response");
                        Err("Error parsing message response")
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Request to Twilio failed");
                Err("Error sending message")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TwilioService {
        TwilioService::new(TwilioOptions {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15005550006".to_string(),
        })
    }

    #[test]
    fn test_messages_url_includes_account() {
        assert_eq!(
            service().messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_message_form_uses_configured_sender() {
        let twilio = service();
        let form = twilio.message_form("+919876543210", "hello");
        assert_eq!(form.get("To"), Some(&"+919876543210"));
        assert_eq!(form.get("From"), Some(&"+15005550006"));
        assert_eq!(form.get("Body"), Some(&"hello"));
    }

    #[test]
    fn test_message_response_tolerates_missing_optionals() {
        let parsed: MessageResponse =
            serde_json::from_str(r#"{"sid":"SM1","status":"queued"}"#).unwrap();
        assert_eq!(parsed.sid, "SM1");
        assert!(parsed.error_code.is_none());
    }
}
