//! Integration mapping between the routing surface and handlers.
//!
//! # Data Flow
//! ```text
//! (IntegrationMode, HandlerRef, HttpMethod)
//!     → build_integration
//!     → MethodIntegration
//!         - Integration      (request side: header rewrites, passthrough)
//!         - MethodResponse[] (response side: declared status + headers)
//! ```
//!
//! # Design Decisions
//! - Mode is chosen per deployment, never per route
//! - Pass-through declares nothing: the handler response is returned verbatim
//! - Form-encoded relays the handler's own `Content-Type`; the surface never invents one

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provision::HandlerRef;
use crate::routing::HttpMethod;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const SUCCESS_STATUS: u16 = 200;
/// Bodies with no matching request template go to the handler unchanged.
pub const WHEN_NO_MATCH: &str = "WHEN_NO_MATCH";

/// Request/response transform applied to every method of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// Raw request in, raw response out.
    #[default]
    PassThrough,
    /// Form-encoded requests, handler-declared response content type.
    FormEncoded,
}

/// Request side of a method integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    /// Handler the method invokes.
    pub handler: String,
    pub mode: IntegrationMode,
    /// Target parameter → source expression (`'literal'` or a request/response path).
    pub request_parameters: BTreeMap<String, String>,
    pub passthrough: Option<&'static str>,
    pub responses: Vec<IntegrationResponse>,
}

/// Mapping applied to a handler response before it reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationResponse {
    pub status_code: u16,
    pub response_parameters: BTreeMap<String, String>,
}

/// Declared response contract of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub status_code: u16,
    /// Header names the handler must set.
    pub headers: Vec<String>,
    pub models: BTreeMap<String, String>,
}

/// Integration plus declared responses for one realized method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodIntegration {
    pub integration: Integration,
    pub method_responses: Vec<MethodResponse>,
}

/// A handler response that does not satisfy the declared contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("expected status {expected}, handler returned {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("handler response is missing header '{0}'")]
    MissingHeader(String),
}

impl MethodResponse {
    /// `method.response.header.<name>` → required flag, as the surface declares them.
    pub fn response_parameters(&self) -> BTreeMap<String, bool> {
        self.headers
            .iter()
            .map(|h| (method_response_header(h), true))
            .collect()
    }

    /// Check a handler response at the edge.
    pub fn verify(&self, status: u16, headers: &[(&str, &str)]) -> Result<(), ContractViolation> {
        if status != self.status_code {
            return Err(ContractViolation::StatusMismatch {
                expected: self.status_code,
                actual: status,
            });
        }
        for required in &self.headers {
            if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(required)) {
                return Err(ContractViolation::MissingHeader(required.clone()));
            }
        }
        Ok(())
    }
}

fn method_response_header(name: &str) -> String {
    format!("method.response.header.{name}")
}

fn integration_request_header(name: &str) -> String {
    format!("integration.request.header.{name}")
}

fn integration_response_header(name: &str) -> String {
    format!("integration.response.header.{name}")
}

/// Build the integration for one method of `handler` under `mode`.
pub fn build_integration(mode: IntegrationMode, handler: &HandlerRef, method: HttpMethod) -> MethodIntegration {
    tracing::trace!(handler = %handler.name, %method, ?mode, "Building integration");
    match mode {
        IntegrationMode::PassThrough => MethodIntegration {
            integration: Integration {
                handler: handler.name.clone(),
                mode,
                request_parameters: BTreeMap::new(),
                passthrough: None,
                responses: Vec::new(),
            },
            method_responses: Vec::new(),
        },
        IntegrationMode::FormEncoded => {
            let request_parameters = BTreeMap::from([(
                integration_request_header(CONTENT_TYPE_HEADER),
                format!("'{FORM_CONTENT_TYPE}'"),
            )]);
            let response = IntegrationResponse {
                status_code: SUCCESS_STATUS,
                response_parameters: BTreeMap::from([(
                    method_response_header(CONTENT_TYPE_HEADER),
                    integration_response_header(CONTENT_TYPE_HEADER),
                )]),
            };
            let method_response = MethodResponse {
                status_code: SUCCESS_STATUS,
                headers: vec![CONTENT_TYPE_HEADER.to_string()],
                models: BTreeMap::from([("application/json".to_string(), "Empty".to_string())]),
            };
            MethodIntegration {
                integration: Integration {
                    handler: handler.name.clone(),
                    mode,
                    request_parameters,
                    passthrough: Some(WHEN_NO_MATCH),
                    responses: vec![response],
                },
                method_responses: vec![method_response],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_declares_nothing() {
        let built = build_integration(IntegrationMode::PassThrough, &HandlerRef::new("h"), HttpMethod::Get);
        assert!(built.integration.request_parameters.is_empty());
        assert!(built.integration.passthrough.is_none());
        assert!(built.method_responses.is_empty());
    }

    #[test]
    fn test_form_encoded_rewrites_content_type() {
        let built = build_integration(IntegrationMode::FormEncoded, &HandlerRef::new("h"), HttpMethod::Put);
        assert_eq!(
            built.integration.request_parameters["integration.request.header.Content-Type"],
            "'application/x-www-form-urlencoded'"
        );
        assert_eq!(built.integration.passthrough, Some(WHEN_NO_MATCH));
        assert_eq!(
            built.integration.responses[0].response_parameters["method.response.header.Content-Type"],
            "integration.response.header.Content-Type"
        );

        let declared = &built.method_responses[0];
        assert_eq!(declared.status_code, 200);
        assert_eq!(
            declared.response_parameters(),
            BTreeMap::from([("method.response.header.Content-Type".to_string(), true)])
        );
        assert_eq!(declared.models["application/json"], "Empty");
    }

    #[test]
    fn test_contract_verification() {
        let built = build_integration(IntegrationMode::FormEncoded, &HandlerRef::new("h"), HttpMethod::Get);
        let contract = &built.method_responses[0];

        assert!(contract.verify(200, &[("content-type", "image/png")]).is_ok());
        assert_eq!(
            contract.verify(200, &[("x-other", "1")]),
            Err(ContractViolation::MissingHeader("Content-Type".into()))
        );
        assert_eq!(
            contract.verify(500, &[("Content-Type", "text/plain")]),
            Err(ContractViolation::StatusMismatch { expected: 200, actual: 500 })
        );
    }
}
