use stoker_http::{Output, Request};
use tracing::warn;

use crate::error::WorkerError;

pub type HandlerFn = Box<dyn Fn(&mut Request, &mut Output) + Send + Sync>;
pub type RoutePredicate = Box<dyn Fn(&Request) -> bool + Send + Sync>;
pub type Hook = Box<dyn Fn() + Send + Sync>;

/// One registered handler. Tagged endpoints take part in ordered dispatch;
/// a fallback is only eligible when no tagged endpoint exists.
pub struct Endpoint {
    pub id: String,
    pub priority: i64,
    pub tagged: bool,
    routes: Vec<RoutePredicate>,
    handler: HandlerFn,
}

impl Endpoint {
    /// A handler with predicates runs only if at least one accepts.
    pub(crate) fn accepts(&self, request: &Request) -> bool {
        self.routes.is_empty() || self.routes.iter().any(|predicate| predicate(request))
    }

    pub(crate) fn invoke(&self, request: &mut Request, output: &mut Output) {
        (self.handler)(request, output);
    }
}

/// Route predicate comparing the normalized uri to a literal path.
pub fn on_path(path: &str) -> RoutePredicate {
    let path = path.to_string();
    Box::new(move |request| request.uri == path)
}

#[derive(Default)]
pub struct Registry {
    endpoints: Vec<Endpoint>,
    startup_hooks: Vec<Hook>,
    shutdown_hooks: Vec<Hook>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: &str,
        priority: i64,
        routes: Vec<RoutePredicate>,
        handler: impl Fn(&mut Request, &mut Output) + Send + Sync + 'static,
    ) {
        self.endpoints.push(Endpoint {
            id: id.to_string(),
            priority,
            tagged: true,
            routes,
            handler: Box::new(handler),
        });
    }

    pub fn register_request_only(
        &mut self,
        id: &str,
        priority: i64,
        routes: Vec<RoutePredicate>,
        handler: impl Fn(&mut Request) + Send + Sync + 'static,
    ) {
        self.register(id, priority, routes, move |request, _output| handler(request));
    }

    pub fn register_response_only(
        &mut self,
        id: &str,
        priority: i64,
        routes: Vec<RoutePredicate>,
        handler: impl Fn(&mut Output) + Send + Sync + 'static,
    ) {
        self.register(id, priority, routes, move |_request, output| handler(output));
    }

    /// An untagged catch-all, eligible only when no tagged endpoint exists.
    pub fn register_fallback(
        &mut self,
        id: &str,
        handler: impl Fn(&mut Request, &mut Output) + Send + Sync + 'static,
    ) {
        self.endpoints.push(Endpoint {
            id: id.to_string(),
            priority: 0,
            tagged: false,
            routes: Vec::new(),
            handler: Box::new(handler),
        });
    }

    pub fn on_startup(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.startup_hooks.push(Box::new(hook));
    }

    pub fn on_shutdown(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.shutdown_hooks.push(Box::new(hook));
    }

    /// Order endpoints by descending priority (ties keep declaration order)
    /// and check the fallback rules. Must run before serving.
    pub fn seal(&mut self) -> Result<(), WorkerError> {
        self.endpoints
            .sort_by_key(|endpoint| std::cmp::Reverse(endpoint.priority));

        let tagged = self.endpoints.iter().filter(|e| e.tagged).count();
        let fallback = self.endpoints.len() - tagged;

        if tagged == 0 {
            match fallback {
                0 => {
                    return Err(WorkerError::Registry(
                        "no handlers registered".to_string(),
                    ))
                }
                1 => {}
                _ => {
                    return Err(WorkerError::Registry(
                        "multiple fallback handlers need a tagged endpoint".to_string(),
                    ))
                }
            }
        } else if fallback > 0 {
            warn!("fallback handlers are ignored while tagged endpoints exist");
        }
        Ok(())
    }

    pub(crate) fn tagged(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|endpoint| endpoint.tagged)
    }

    pub(crate) fn has_tagged(&self) -> bool {
        self.endpoints.iter().any(|endpoint| endpoint.tagged)
    }

    pub(crate) fn fallback(&self) -> Option<&Endpoint> {
        self.endpoints.iter().find(|endpoint| !endpoint.tagged)
    }

    pub fn run_startup(&self) {
        for hook in &self.startup_hooks {
            hook();
        }
    }

    pub fn run_shutdown(&self) {
        for hook in &self.shutdown_hooks {
            hook();
        }
    }
}
