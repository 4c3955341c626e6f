//! Route definitions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::context::RequestContext;
use crate::error::BoxError;
use crate::http::response::RouteResponse;
use crate::routing::matcher::PathMatch;

/// Future returned by a handler.
pub type HandlerFuture = BoxFuture<'static, Result<RouteResponse, BoxError>>;

/// Something that turns a request context into a response.
///
/// Implemented for any `Fn(Arc<RequestContext>) -> impl Future` so plain
/// async functions can be registered directly.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RouteResponse, BoxError>> + Send + 'static,
{
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// A registered `(method, path, handler)` triple.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: PathMatch,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// Route for an exact path. The path is normalized here.
    pub fn new(method: Method, path: &str, handler: impl Handler) -> Self {
        Self {
            method,
            path: PathMatch::exact(path),
            handler: Arc::new(handler),
        }
    }

    /// Route matching every path for `method`.
    pub fn any_path(method: Method, handler: impl Handler) -> Self {
        Self {
            method,
            path: PathMatch::Any,
            handler: Arc::new(handler),
        }
    }

    pub fn get(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn put(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::PUT, path, handler)
    }

    pub fn patch(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::PATCH, path, handler)
    }

    pub fn delete(path: &str, handler: impl Handler) -> Self {
        Self::new(Method::DELETE, path, handler)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &PathMatch {
        &self.path
    }

    /// True iff the method matches and the path matches.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        ctx.method() == self.method && self.path.matches(ctx.pathname())
    }

    pub fn exec(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        self.handler.call(ctx)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok(_ctx: Arc<RequestContext>) -> Result<RouteResponse, BoxError> {
        Ok(RouteResponse::text("ok"))
    }

    #[test]
    fn test_route_matches_method_and_path() {
        let route = Route::get("/x/", ok);
        assert_eq!(route.path(), &PathMatch::Exact("/x".into()));

        assert!(route.matches(&RequestContext::stub("/x").build()));
        assert!(route.matches(&RequestContext::stub("/x/").build()));
        assert!(!route.matches(&RequestContext::stub("/y").build()));
        assert!(!route.matches(&RequestContext::stub("/x").method(Method::POST).build()));
    }

    #[test]
    fn test_any_path_route_matches_on_method_only() {
        let route = Route::any_path(Method::GET, ok);
        assert!(route.matches(&RequestContext::stub("/anything/at/all").build()));
        assert!(!route.matches(&RequestContext::stub("/").method(Method::DELETE).build()));
    }

    #[tokio::test]
    async fn test_exec_runs_handler() {
        let route = Route::post("/echo", |ctx: Arc<RequestContext>| async move {
            let body = ctx.read_body_as_text().await?;
            Ok::<_, BoxError>(RouteResponse::text(body))
        });
        let ctx = Arc::new(RequestContext::stub("/echo").method(Method::POST).body("hi").build());
        let resp = route.exec(ctx).await.unwrap();
        assert_eq!(resp.body.map(|b| b.preview()), Some(r#""hi""#.to_string()));
    }
}
