//! Registry of script-visible classes and their bound methods.

use std::collections::HashMap;

use crate::object::{HostClass, MethodInfo};

#[derive(Debug, Default)]
pub struct ClassDb {
    classes: HashMap<&'static str, &'static [MethodInfo]>,
}

impl ClassDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class<T: HostClass>(&mut self) {
        tracing::debug!(class = T::NAME, methods = T::METHODS.len(), "host: register class");
        self.classes.insert(T::NAME, T::METHODS);
    }

    /// Returns false if the class was not registered.
    pub fn unregister_class(&mut self, name: &str) -> bool {
        self.classes.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Looks up a bound method. `None` if either class or method is unknown.
    pub fn method(&self, class: &str, method: &str) -> Option<&MethodInfo> {
        self.classes.get(class)?.iter().find(|m| m.name == method)
    }

    pub fn methods(&self, class: &str) -> Option<&'static [MethodInfo]> {
        self.classes.get(class).copied()
    }
}
