//! Route registration and lookup.
//!
//! # Responsibilities
//! - Register endpoint and prefix templates with their handlers
//! - Strip the mount prefix and split request paths
//! - Return a three-way outcome: matched, method not allowed, not found
//!
//! # Design Decisions
//! - The trie is created on first registration; an empty router finds nothing
//! - Templates are validated when registered, never at request time
//! - Router-wide settings take `&mut self`, so they are fixed before the
//!   router is shared

use std::sync::OnceLock;

use crate::routing::handler::{Handler, Middleware};
use crate::routing::key::{parse_template, split_path, TemplateError};
use crate::routing::node::NodeId;
use crate::routing::params::Params;
use crate::routing::service::RouterService;
use crate::routing::trie::Trie;
use crate::routing::CATCH_ALL_METHOD;

/// A resolved request.
#[derive(Debug, Clone)]
pub struct Route<H, M> {
    pub handler: H,
    /// Canonical form of the matched template.
    pub pattern: String,
    pub params: Params,
    /// Methods bound explicitly on the template (catch-all excluded).
    pub methods: Vec<String>,
    pub method_middleware: Vec<M>,
    pub endpoint_middleware: Vec<M>,
}

/// Result of looking up a request.
#[derive(Debug, Clone)]
pub enum RouteOutcome<H, M> {
    /// No template fits the path.
    NotFound,
    /// A template fits the path but has no handler for the method.
    MethodNotAllowed {
        pattern: String,
        params: Params,
        methods: Vec<String>,
    },
    Matched(Route<H, M>),
}

impl<H, M> RouteOutcome<H, M> {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::NotFound => "not_found",
            RouteOutcome::MethodNotAllowed { .. } => "method_not_allowed",
            RouteOutcome::Matched(_) => "matched",
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match self {
            RouteOutcome::NotFound => None,
            RouteOutcome::MethodNotAllowed { pattern, .. } => Some(pattern),
            RouteOutcome::Matched(route) => Some(&route.pattern),
        }
    }

    fn with_mount(mut self, mount: &str) -> Self {
        let mount = mount.trim_end_matches('/');
        if mount.is_empty() {
            return self;
        }
        match &mut self {
            RouteOutcome::NotFound => {}
            RouteOutcome::MethodNotAllowed { pattern, .. } => pattern.insert_str(0, mount),
            RouteOutcome::Matched(route) => route.pattern.insert_str(0, mount),
        }
        self
    }
}

/// Maps request paths and methods to handlers.
#[derive(Debug, Default)]
pub struct Router {
    prefix: String,
    trie: OnceLock<Trie<Handler, Middleware>>,
    middleware: Vec<Middleware>,
    not_found: Option<Handler>,
    method_not_allowed: Option<Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    fn trie(&self) -> &Trie<Handler, Middleware> {
        self.trie.get_or_init(Trie::new)
    }

    /// Register a template that must match the whole request path.
    ///
    /// `{name}` segments match any single segment and bind it as a parameter.
    pub fn endpoint(&self, template: &str) -> Result<Endpoint<'_>, TemplateError> {
        self.register(template, false)
    }

    /// Register a template that also matches any path continuing past it.
    pub fn prefix(&self, template: &str) -> Result<Endpoint<'_>, TemplateError> {
        self.register(template, true)
    }

    fn register(&self, template: &str, prefix: bool) -> Result<Endpoint<'_>, TemplateError> {
        let keys = parse_template(template, prefix)?;
        let terminator = self.trie().insert(&keys);
        tracing::debug!(template = %template, prefix, "Registered template");
        Ok(Endpoint {
            trie: self.trie(),
            terminator,
        })
    }

    /// Path prefix removed from every request before matching, for routers
    /// mounted below another service.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn path_prefix(&self) -> &str {
        &self.prefix
    }

    /// Add middleware wrapping every request, outermost of all layers.
    pub fn middleware(&mut self, middleware: Middleware) {
        self.middleware.push(middleware);
    }

    pub fn router_middleware(&self) -> &[Middleware] {
        &self.middleware
    }

    pub fn set_not_found(&mut self, handler: Handler) {
        self.not_found = Some(handler);
    }

    pub fn set_method_not_allowed(&mut self, handler: Handler) {
        self.method_not_allowed = Some(handler);
    }

    pub(crate) fn not_found_handler(&self) -> Handler {
        self.not_found
            .clone()
            .unwrap_or_else(crate::routing::handler::default_not_found)
    }

    pub(crate) fn method_not_allowed_handler(&self) -> Handler {
        self.method_not_allowed
            .clone()
            .unwrap_or_else(crate::routing::handler::default_method_not_allowed)
    }

    /// Look up the route for `method` and `path`.
    pub fn route(&self, method: &str, path: &str) -> RouteOutcome<Handler, Middleware> {
        let Some(trie) = self.trie.get() else {
            return RouteOutcome::NotFound;
        };
        let path = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        let segments = split_path(path);
        trie.route(&segments, method).with_mount(&self.prefix)
    }

    /// Indented dump of the registered templates.
    pub fn describe(&self) -> String {
        self.trie.get().map(Trie::describe).unwrap_or_default()
    }

    /// Turn the router into a cloneable tower service.
    pub fn into_service(self) -> RouterService {
        RouterService::new(self)
    }
}

/// A registered template; bind handlers and middleware to it.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    trie: &'a Trie<Handler, Middleware>,
    terminator: NodeId,
}

impl<'a> Endpoint<'a> {
    /// Handle every method not bound explicitly with [`Endpoint::methods`].
    pub fn handler(self, handler: Handler) -> Self {
        self.trie.set_handler(self.terminator, CATCH_ALL_METHOD, handler);
        self
    }

    /// Middleware wrapping every handler of this template.
    pub fn middleware(self, middleware: Middleware) -> Self {
        self.trie.add_endpoint_middleware(self.terminator, middleware);
        self
    }

    /// Select methods to bind a handler to.
    pub fn methods<I, S>(self, methods: I) -> Methods<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Methods {
            endpoint: self,
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Canonical form of the template.
    pub fn pattern(&self) -> String {
        self.trie.pattern(self.terminator)
    }
}

/// A set of methods on a registered template.
#[derive(Debug, Clone)]
pub struct Methods<'a> {
    endpoint: Endpoint<'a>,
    methods: Vec<String>,
}

impl<'a> Methods<'a> {
    /// Bind `handler` to each selected method.
    pub fn handler(self, handler: Handler) -> Endpoint<'a> {
        for method in &self.methods {
            self.endpoint
                .trie
                .set_handler(self.endpoint.terminator, method, handler.clone());
        }
        self.endpoint
    }

    /// Middleware wrapping only the handlers of the selected methods.
    pub fn middleware(self, middleware: Middleware) -> Self {
        for method in &self.methods {
            self.endpoint.trie.add_method_middleware(
                self.endpoint.terminator,
                method,
                middleware.clone(),
            );
        }
        self
    }
}
