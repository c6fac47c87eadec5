use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::domain::message::MessageFormat;
use crate::mail::api::{self, ApiLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse, Profile};
use crate::mail::batch;
use crate::mail::error::{MailError, MailResult};

/// The authorized channel to the remote mailbox. Every call is blocking and
/// the store never has two in flight.
pub trait MailTransport {
    /// Connection-establishment call.
    fn profile(&self) -> MailResult<Profile>;

    fn list_labels(&self) -> MailResult<Vec<ApiLabel>>;

    fn list_messages(
        &self,
        label_ids: &[String],
        max_results: u32,
        page_token: Option<&str>,
    ) -> MailResult<ListMessagesResponse>;

    /// One round trip. The outer error means the batch itself failed; each
    /// inner result is one sub-request, in completion order.
    fn batch_get(
        &self,
        ids: &[String],
        format: MessageFormat,
    ) -> MailResult<Vec<(String, MailResult<GmailMessage>)>>;

    fn get_message(&self, id: &str, format: MessageFormat) -> MailResult<GmailMessage>;

    fn modify(&self, id: &str, add: &[String], remove: &[String]) -> MailResult<()>;

    fn trash(&self, id: &str) -> MailResult<()>;
}

/// Supplies a currently valid bearer token.
pub trait AccessToken {
    fn access_token(&self) -> anyhow::Result<String>;
}

/// Token sources report unreachable endpoints as `MailError::Connection` so
/// the connect loop retries them; anything else means the credentials are bad.
fn token_error(e: anyhow::Error) -> MailError {
    match e.downcast::<MailError>() {
        Ok(err) => err,
        Err(e) => MailError::api(401, format!("no access token: {e:#}")),
    }
}

pub struct HttpTransport {
    client: Client,
    tokens: Box<dyn AccessToken>,
    base_url: String,
    batch_url: String,
}

impl HttpTransport {
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";
    const BATCH_URL: &'static str = "https://gmail.googleapis.com/batch/gmail/v1";

    pub fn new(tokens: Box<dyn AccessToken>, timeout: Option<Duration>) -> MailResult<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            tokens,
            base_url: Self::BASE_URL.to_string(),
            batch_url: Self::BATCH_URL.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send(&self, req: RequestBuilder) -> MailResult<Response> {
        let token = self.tokens.access_token().map_err(token_error)?;

        let resp = req.bearer_auth(token).send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(MailError::api(status.as_u16(), api::error_message(&body)))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> MailResult<T> {
        let resp = self.send(self.client.get(self.url(path)).query(query))?;
        Ok(resp.json::<T>()?)
    }
}

impl MailTransport for HttpTransport {
    fn profile(&self) -> MailResult<Profile> {
        self.get_json("profile", &[])
    }

    fn list_labels(&self) -> MailResult<Vec<ApiLabel>> {
        let resp: ListLabelsResponse = self.get_json("labels", &[])?;
        Ok(resp.labels.unwrap_or_default())
    }

    fn list_messages(
        &self,
        label_ids: &[String],
        max_results: u32,
        page_token: Option<&str>,
    ) -> MailResult<ListMessagesResponse> {
        let mut query: Vec<(&str, String)> = label_ids
            .iter()
            .map(|l| ("labelIds", l.clone()))
            .collect();
        query.push(("maxResults", max_results.to_string()));
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.get_json("messages", &query)
    }

    fn batch_get(
        &self,
        ids: &[String],
        format: MessageFormat,
    ) -> MailResult<Vec<(String, MailResult<GmailMessage>)>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let boundary = batch::new_boundary();
        let body = batch::encode_request(&boundary, ids, format);
        let req = self
            .client
            .post(&self.batch_url)
            .header(CONTENT_TYPE, format!("multipart/mixed; boundary={boundary}"))
            .body(body);

        let resp = self.send(req)?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| MailError::Batch("response without Content-Type".into()))?;
        let bytes = resp.bytes()?;

        let parts = batch::decode_response(&content_type, &bytes)?;
        Ok(batch::correlate(ids, parts))
    }

    fn get_message(&self, id: &str, format: MessageFormat) -> MailResult<GmailMessage> {
        self.get_json(
            &format!("messages/{id}"),
            &[("format", format.as_str().to_string())],
        )
    }

    fn modify(&self, id: &str, add: &[String], remove: &[String]) -> MailResult<()> {
        let body = api::ModifyRequest {
            add_label_ids: add,
            remove_label_ids: remove,
        };
        self.send(
            self.client
                .post(self.url(&format!("messages/{id}/modify")))
                .json(&body),
        )?;
        Ok(())
    }

    fn trash(&self, id: &str) -> MailResult<()> {
        self.send(self.client.post(self.url(&format!("messages/{id}/trash"))))?;
        Ok(())
    }
}
