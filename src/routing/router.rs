//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the registered routes in registration order
//! - Run the pre-routing handler, then CORS preflight, then routes
//! - Return the first match's result or an explicit `NotFound`
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - O(n) scan; first registration wins when two routes normalize alike
//! - Explicit NotFound rather than a silent default

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::{BoxError, RespError};
use crate::http::cors::CorsNegotiator;
use crate::http::response::RouteResponse;
use crate::routing::route::Route;

/// Future returned by a pre-routing handler.
pub type PreRouteFuture = BoxFuture<'static, Result<Option<RouteResponse>, BoxError>>;

/// Global handler that runs before routing. Returning a response takes
/// over the request.
pub trait PreRoute: Send + Sync + 'static {
    fn call(&self, ctx: Arc<RequestContext>) -> PreRouteFuture;
}

impl<F, Fut> PreRoute for F
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<RouteResponse>, BoxError>> + Send + 'static,
{
    fn call(&self, ctx: Arc<RequestContext>) -> PreRouteFuture {
        Box::pin(self(ctx))
    }
}

/// Ordered route table plus the optional pre-routing and CORS stages.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    pre_route: Option<Arc<dyn PreRoute>>,
    cors: Option<CorsNegotiator>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            pre_route: None,
            cors: None,
        }
    }

    pub fn with_pre_route(mut self, pre_route: impl PreRoute) -> Self {
        self.pre_route = Some(Arc::new(pre_route));
        self
    }

    /// Enable preflight negotiation for the given allow-list.
    pub fn with_cors(mut self, cors: CorsNegotiator) -> Self {
        self.cors = Some(cors);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn cors(&self) -> Option<&CorsNegotiator> {
        self.cors.as_ref()
    }

    /// First route matching the context, in registration order.
    pub fn find(&self, ctx: &RequestContext) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(ctx))
    }

    /// Route the request and execute the matched handler.
    pub async fn dispatch(&self, ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
        if let Some(pre_route) = &self.pre_route {
            if let Some(resp) = pre_route.call(Arc::clone(&ctx)).await? {
                tracing::debug!(path = %ctx.pathname(), "Pre-routing handler took over request");
                return Ok(resp);
            }
        }

        if let Some(cors) = &self.cors {
            if CorsNegotiator::is_preflight(&ctx)? {
                return Ok(cors.negotiate(&ctx)?);
            }
        }

        match self.find(&ctx) {
            Some(route) => {
                tracing::debug!(
                    method = %ctx.method(),
                    path = %ctx.pathname(),
                    route = ?route.path(),
                    "Route matched"
                );
                route.exec(ctx).await
            }
            None => Err(RespError::not_found().into()),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("pre_route", &self.pre_route.is_some())
            .field("cors", &self.cors)
            .finish()
    }
}
