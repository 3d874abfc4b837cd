//! Identity header injection
//!
//! The object store isolates tenants by a numeric identity carried on every
//! request. The header is added after signing so that presigned URLs stay
//! independent of it.

use aws_sdk_s3::config::interceptors::BeforeTransmitInterceptorContextMut;
use aws_sdk_s3::config::{ConfigBag, Intercept, RuntimeComponents};
use aws_sdk_s3::error::BoxError;

use nimbus_core::Credential;
use nimbus_core::credential::IDENTITY_HEADER;

/// Adds the caller's identity header to every outgoing request
#[derive(Debug, Clone)]
pub struct IdentityHeader {
    value: String,
}

impl IdentityHeader {
    pub fn new(credential: &Credential) -> Self {
        Self {
            value: credential.identity_header_value(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Intercept for IdentityHeader {
    fn name(&self) -> &'static str {
        "IdentityHeader"
    }

    fn modify_before_transmit(
        &self,
        context: &mut BeforeTransmitInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        context
            .request_mut()
            .headers_mut()
            .insert(IDENTITY_HEADER, self.value.clone());
        Ok(())
    }
}
