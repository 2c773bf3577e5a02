//! Tower layer that stamps every request with a [`GeneratedId`].
//!
//! For each call the middleware resolves the caller's user ID, computes one
//! ID with the configured strategy, writes it to the request header and the
//! request extensions, optionally logs it, then calls the inner service
//! exactly once. A successful response gets the same header when mirroring
//! is enabled; an error from the inner service is returned untouched.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderValue, Request, Response};
use tower::{Layer, Service};

use super::context::{RequestContext, RequestIdentity};
use super::generator::{
    deterministic_id, random_id, system_clock, Clock, IdInputs, IdSource, UuidSource,
    DEFAULT_ID_LENGTH, MAX_ID_LENGTH, SHORT_ID_WARN_LENGTH,
};
use super::spec::IdentitySpec;
use crate::config::model::Strategy;

/// Computes and attaches request identities.
pub struct Identifier {
    spec: IdentitySpec,
    source: Arc<dyn IdSource>,
    clock: Clock,
}

impl std::fmt::Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identifier")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Identifier {
    #[must_use]
    pub fn new(mut spec: IdentitySpec) -> Self {
        // Specs built in code bypass config validation.
        if let Some(len) = spec.id_length.filter(|len| !(1..=MAX_ID_LENGTH).contains(len)) {
            tracing::warn!(
                id_length = len,
                default = DEFAULT_ID_LENGTH,
                "id_length out of range, using the default"
            );
            spec.id_length = None;
        }

        if spec.strategy == Strategy::Random {
            if let Some(len) = spec.id_length.filter(|len| *len < SHORT_ID_WARN_LENGTH) {
                tracing::warn!(
                    id_length = len,
                    "short random request IDs collide after tens of thousands of requests"
                );
            }
        }

        Self {
            spec,
            source: Arc::new(UuidSource),
            clock: system_clock,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn IdSource>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn spec(&self) -> &IdentitySpec {
        &self.spec
    }

    /// Stamp `req` and return the identity that was attached.
    pub fn identify<B>(&self, req: &mut Request<B>) -> RequestIdentity {
        let timestamp_ns = (self.clock)();

        let (identity, url, remote_addr) = {
            let ctx = RequestContext::from_request(req);
            let user_id = ctx.user_id(self.spec.user_id_header.as_ref());
            let url = ctx.url();

            let id = match self.spec.strategy {
                Strategy::Deterministic => deterministic_id(&IdInputs {
                    timestamp_ns,
                    remote_addr: &ctx.remote_addr,
                    user_id,
                    method: ctx.method.as_str(),
                    url: &url,
                }),
                Strategy::Random => random_id(
                    &*self.source,
                    self.spec.id_length,
                    self.spec.prefix.as_deref(),
                ),
            };

            let identity = RequestIdentity {
                id,
                user_id: user_id.into(),
            };
            (identity, url, ctx.remote_addr)
        };

        match HeaderValue::from_str(identity.id.as_str()) {
            Ok(value) => {
                req.headers_mut().insert(self.spec.header.clone(), value);
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %identity.id,
                    error = %e,
                    "request ID is not a valid header value, header not set"
                );
            }
        }
        req.extensions_mut().insert(identity.clone());

        if self.spec.log_enabled {
            tracing::info!(
                timestamp_ns = %timestamp_ns,
                remote_addr = %remote_addr,
                user_id = %identity.user_id,
                method = %req.method(),
                url = %url,
                request_id = %identity.id,
                "request identified"
            );
        }

        identity
    }
}

/// Tower layer for request identity stamping.
#[derive(Clone, Debug)]
pub struct IdentityLayer {
    identifier: Arc<Identifier>,
}

impl IdentityLayer {
    #[must_use]
    pub fn new(spec: IdentitySpec) -> Self {
        Self::from_identifier(Identifier::new(spec))
    }

    #[must_use]
    pub fn from_identifier(identifier: Identifier) -> Self {
        Self {
            identifier: Arc::new(identifier),
        }
    }
}

impl<S> Layer<S> for IdentityLayer {
    type Service = IdentityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityMiddleware {
            inner,
            identifier: Arc::clone(&self.identifier),
        }
    }
}

/// Request identity middleware service.
#[derive(Clone, Debug)]
pub struct IdentityMiddleware<S> {
    inner: S,
    identifier: Arc<Identifier>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for IdentityMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let identity = self.identifier.identify(&mut req);

        let spec = self.identifier.spec();
        let mirror = if spec.mirror_response {
            req.headers()
                .get(&spec.header)
                .cloned()
                .map(|value| (spec.header.clone(), value))
        } else {
            None
        };

        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut response = inner.call(req).await?;
            if let Some((name, value)) = mirror {
                response.headers_mut().insert(name, value);
            }
            tracing::trace!(request_id = %identity.id, "response stamped");
            Ok(response)
        })
    }
}
