use crate::handler::BoxedHandler;
use hyper::Method;
use smallvec::SmallVec;
use std::fmt;

/// Handle to a registered route, used to chain further constraints.
pub struct Route {
    path: String,
    methods: SmallVec<[Method; 2]>,
    pub(crate) handler: BoxedHandler,
    pub(crate) error: Option<String>,
}

impl Route {
    pub(crate) fn new(path: String, handler: BoxedHandler) -> Self {
        Self {
            path,
            methods: SmallVec::new(),
            handler,
            error: None,
        }
    }

    /// Restricts the route to the given methods. Without any, every method matches.
    pub fn methods(&mut self, methods: impl IntoIterator<Item = Method>) -> &mut Self {
        for method in methods {
            if !self.methods.contains(&method) {
                self.methods.push(method);
            }
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why the pattern could not be registered, if it could not.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `HEAD` is answered by `GET` routes.
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("error", &self.error)
            .finish()
    }
}

macro_rules! generate_methods {
    (
        methods: [$($name:ident => $method:ident),* $(,)?]
    ) => {
        impl Route {
            $(
                pub fn $name(&mut self) -> &mut Self {
                    self.methods([Method::$method])
                }
            )*
        }
    };
}

generate_methods! {
    methods: [
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
    ]
}
