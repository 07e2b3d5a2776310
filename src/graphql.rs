use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::GraphqlError;

pub const DEFAULT_GRAPHQL_URL: &str = "https://learn.reboot01.com/api/graphql-engine/v1/graphql";

/// Sends one query document with variables and returns the `data` member.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, query: &str, variables: Value, token: &str)
        -> Result<Value, GraphqlError>;
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<ErrorMessage>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub message: Option<String>,
}

impl GraphqlResponse {
    /// Only the first error is surfaced.
    pub fn into_data(self) -> Result<Value, GraphqlError> {
        if let Some(first) = self.errors.as_ref().and_then(|errors| errors.first()) {
            let message = first
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("GraphQL error");
            return Err(GraphqlError::Response(message.to_string()));
        }
        Ok(self.data.unwrap_or(Value::Null))
    }
}

pub fn decode<T: DeserializeOwned>(data: Value) -> Result<T, GraphqlError> {
    serde_json::from_value(data).map_err(|e| GraphqlError::Decode(e.to_string()))
}

/// Operation name of a query document, used for log lines.
pub fn operation_name(query: &str) -> &str {
    query
        .split_once("query")
        .map(|(_, rest)| rest.trim_start())
        .and_then(|rest| {
            rest.split(|c: char| c == '(' || c == '{' || c.is_whitespace())
                .next()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or("anonymous")
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        query: &str,
        variables: Value,
        token: &str,
    ) -> Result<Value, GraphqlError> {
        debug!(operation = operation_name(query), url = %self.url, "graphql request");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .map_err(|e| GraphqlError::Network(e.to_string()))?;

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| GraphqlError::Decode(e.to_string()))?;

        body.into_data()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_error_message_wins() {
        let response: GraphqlResponse = serde_json::from_value(json!({
            "errors": [ { "message": "first" }, { "message": "second" } ],
            "data": { "user": [] }
        }))
        .unwrap();
        assert_eq!(
            response.into_data(),
            Err(GraphqlError::Response("first".to_string()))
        );
    }

    #[test]
    fn blank_error_message_gets_generic_text() {
        let response: GraphqlResponse =
            serde_json::from_value(json!({ "errors": [ {} ] })).unwrap();
        assert_eq!(
            response.into_data(),
            Err(GraphqlError::Response("GraphQL error".to_string()))
        );
    }

    #[test]
    fn data_is_returned_when_no_errors() {
        let response: GraphqlResponse =
            serde_json::from_value(json!({ "data": { "user": [ { "login": "a" } ] } })).unwrap();
        assert_eq!(response.into_data().unwrap(), json!({ "user": [ { "login": "a" } ] }));
    }

    #[test]
    fn operation_names_are_extracted() {
        assert_eq!(operation_name("\nquery ProfileData {\n user { id } }"), "ProfileData");
        assert_eq!(
            operation_name("query ObjectsByIds($ids: [Int!]) { object { id } }"),
            "ObjectsByIds"
        );
        assert_eq!(operation_name("{ user { id } }"), "anonymous");
    }

    mod http {
        use super::*;
        use crate::error::DashboardError;
        use crate::fetcher::fetch_core_data;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const QUERY: &str = "query ObjectsByIds($ids: [Int!]) { object { id } }";

        async fn transport_for(server: &MockServer) -> HttpTransport {
            HttpTransport::new(format!("{}/graphql", server.uri()), Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn posts_query_and_variables_with_bearer_token() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/graphql"))
                .and(header("authorization", "Bearer tok-123"))
                .and(body_json(json!({ "query": QUERY, "variables": { "ids": [1, 2] } })))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "data": { "object": [ { "id": 1 } ] } })),
                )
                .expect(1)
                .mount(&server)
                .await;

            let data = transport_for(&server)
                .await
                .execute(QUERY, json!({ "ids": [1, 2] }), "tok-123")
                .await
                .unwrap();
            assert_eq!(data, json!({ "object": [ { "id": 1 } ] }));
        }

        #[tokio::test]
        async fn only_the_first_error_reaches_the_caller() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "errors": [ { "message": "first" }, { "message": "second" } ]
                })))
                .mount(&server)
                .await;

            let err = fetch_core_data(&transport_for(&server).await, "t")
                .await
                .unwrap_err();
            assert!(matches!(
                &err,
                DashboardError::Schema(GraphqlError::Response(message)) if message == "first"
            ));
            assert_eq!(err.to_string(), "first");
        }

        #[tokio::test]
        async fn non_json_body_is_a_decode_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
                .mount(&server)
                .await;

            let err = transport_for(&server)
                .await
                .execute(QUERY, json!({}), "t")
                .await
                .unwrap_err();
            assert!(matches!(err, GraphqlError::Decode(_)), "{err:?}");
        }
    }
}
