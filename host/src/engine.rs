//! Method dispatch, object ownership and named singletons.

use std::collections::HashMap;

use crate::class_db::ClassDb;
use crate::error::CallError;
use crate::object::{ObjectDb, ObjectId};
use crate::variant::Variant;

/// The embedding engine's view of this plugin: registered classes, live
/// objects and singletons.
#[derive(Debug, Default)]
pub struct Engine {
    classes: ClassDb,
    objects: ObjectDb,
    singletons: HashMap<String, ObjectId>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &ClassDb {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassDb {
        &mut self.classes
    }

    pub fn objects(&self) -> &ObjectDb {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectDb {
        &mut self.objects
    }

    pub fn register_singleton(&mut self, name: &str, id: ObjectId) -> Result<(), CallError> {
        if self.singletons.contains_key(name) {
            return Err(CallError::SingletonExists(name.to_string()));
        }
        self.singletons.insert(name.to_string(), id);
        Ok(())
    }

    pub fn unregister_singleton(&mut self, name: &str) -> Option<ObjectId> {
        self.singletons.remove(name)
    }

    pub fn get_singleton(&self, name: &str) -> Option<ObjectId> {
        self.singletons.get(name).copied()
    }

    /// Calls `method` on object `id`.
    ///
    /// Dispatch problems (unknown object, unregistered class, unbound method,
    /// wrong arity) are errors. Failures inside a method are reported by the
    /// method itself, usually as a logged message and a `Nil` result.
    pub fn call(&mut self, id: ObjectId, method: &str, args: &[Variant]) -> Result<Variant, CallError> {
        let class = self
            .objects
            .get(id)
            .ok_or(CallError::InvalidObject(id))?
            .class_name();
        if !self.classes.is_registered(class) {
            return Err(CallError::ClassNotRegistered(class.to_string()));
        }
        let info = self
            .classes
            .method(class, method)
            .ok_or_else(|| CallError::InvalidMethod {
                class: class.to_string(),
                method: method.to_string(),
            })?;
        if info.arg_count != args.len() {
            return Err(CallError::ArgumentCount {
                method: method.to_string(),
                expected: info.arg_count,
                got: args.len(),
            });
        }

        let mut object = self.objects.take(id).ok_or(CallError::InvalidObject(id))?;
        let result = object.call(method, args, &mut self.objects);
        self.objects.restore(id, object);
        result
    }

    /// Calls `method` on the singleton registered as `name`.
    pub fn call_singleton(&mut self, name: &str, method: &str, args: &[Variant]) -> Result<Variant, CallError> {
        let id = self
            .get_singleton(name)
            .ok_or_else(|| CallError::NoSingleton(name.to_string()))?;
        self.call(id, method, args)
    }
}
