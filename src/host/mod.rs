// Host collaborators
//
// The core drives these but never looks inside them:
// - Dom: element creation, markup, placement and listener binding
// - Template: data context in, markup out
// - Store: asynchronous CRUD returning one eventual result
// - Router: asks the scheduler to show a panel somewhere else in the tree

mod dom;
mod store;
mod template;

pub use dom::{Dom, DomEvent, Listener, ListenerId, MemoryDom, NodeId};
pub use store::{MemoryStore, Store};
pub use template::{Placeholders, Template};

/// Navigation seam used by leaf panels. The core does no URL parsing;
/// `view` is a panel path such as `content.deck` or a bare panel name.
pub trait Router {
    fn navigate_to(&self, view: &str);
}

/// Router that records requests instead of acting on them
#[derive(Debug, Clone, Default)]
pub struct RecordingRouter {
    requests: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

impl RecordingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Router for RecordingRouter {
    fn navigate_to(&self, view: &str) {
        tracing::debug!(view, "navigation recorded");
        self.requests.borrow_mut().push(view.to_string());
    }
}
