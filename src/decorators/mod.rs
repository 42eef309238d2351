//! User-supplied hooks that let an embedder customize the aggregated
//! document's `info` block and `servers` list per request.
//!
//! These mirror [`crate::proxy::ConfigProvider`]: a trait seam the bundled
//! demo binary leaves unset (falling back to the default merge behavior),
//! that a real embedder wires up to its own request-scoped data.

use openapiv3::{Info, Server};

/// The request-derived data decorators act on: the scheme/host the client
/// used to reach the aggregation handler.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
}

/// `configureInfo`: transforms the merged `info` block before it's served.
pub trait InfoDecorator: Send + Sync {
    fn decorate(&self, info: Info, ctx: &RequestContext) -> Info;
}

/// `configureServers`: overrides the merged `servers` list entirely.
pub trait ServersDecorator: Send + Sync {
    fn build(&self, ctx: &RequestContext) -> Vec<Server>;
}

/// The behavior `configureServers` describes as its own default: a single
/// server built from the request's scheme and host. Not wired in
/// automatically — an embedder opts in by setting it as
/// `AggregationOptions::servers_decorator`.
pub struct RequestDerivedServersDecorator;

impl ServersDecorator for RequestDerivedServersDecorator {
    fn build(&self, ctx: &RequestContext) -> Vec<Server> {
        vec![Server {
            url: format!("{}://{}", ctx.scheme, ctx.host),
            description: None,
            variables: Default::default(),
            extensions: Default::default(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_derived_servers_decorator_builds_single_server_from_context() {
        let ctx = RequestContext { scheme: "https".to_string(), host: "gateway.example.com".to_string() };
        let servers = RequestDerivedServersDecorator.build(&ctx);
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].url, "https://gateway.example.com");
    }
}
