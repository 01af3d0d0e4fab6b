//! Host objects and the table that owns them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::error::CallError;
use crate::variant::Variant;

/// Handle to an object owned by an [`ObjectDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Object#{}>", self.0)
    }
}

/// A method a class exposes to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: &'static str,
    pub arg_count: usize,
}

impl MethodInfo {
    pub const fn new(name: &'static str, arg_count: usize) -> Self {
        Self { name, arg_count }
    }
}

/// Static description of a script-visible class.
pub trait HostClass {
    const NAME: &'static str;
    const METHODS: &'static [MethodInfo];
}

/// An object scripts can call methods on.
pub trait HostObject: Any + Send {
    fn class_name(&self) -> &'static str;

    /// Invokes a bound method.
    ///
    /// [`Engine::call`](crate::Engine::call) checks arity first; direct
    /// callers get [`CallError::ArgumentCount`] for missing arguments.
    ///
    /// `objects` is the table this object lives in; it is temporarily
    /// detached from it for the duration of the call.
    fn call(&mut self, method: &str, args: &[Variant], objects: &mut ObjectDb) -> Result<Variant, CallError>;

    fn as_any(&self) -> &dyn Any;
}

/// Returns argument `index` of `method`, or `ArgumentCount` when absent.
pub(crate) fn arg<'a>(method: &str, args: &'a [Variant], index: usize) -> Result<&'a Variant, CallError> {
    args.get(index).ok_or_else(|| CallError::ArgumentCount {
        method: method.to_string(),
        expected: index + 1,
        got: args.len(),
    })
}

/// Owns every live host object.
#[derive(Default)]
pub struct ObjectDb {
    objects: HashMap<ObjectId, Box<dyn HostObject>>,
    next_id: u64,
}

impl ObjectDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: Box<dyn HostObject>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.insert(id, object);
        id
    }

    /// Drops the object. Returns false if it did not exist.
    pub fn free(&mut self, id: ObjectId) -> bool {
        self.objects.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&dyn HostObject> {
        self.objects.get(&id).map(|o| o.as_ref())
    }

    pub fn downcast_ref<T: HostObject>(&self, id: ObjectId) -> Option<&T> {
        self.get(id).and_then(|o| o.as_any().downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn take(&mut self, id: ObjectId) -> Option<Box<dyn HostObject>> {
        self.objects.remove(&id)
    }

    pub(crate) fn restore(&mut self, id: ObjectId, object: Box<dyn HostObject>) {
        self.objects.insert(id, object);
    }
}

impl fmt::Debug for ObjectDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.objects.iter().map(|(id, o)| (*id, o.class_name())).collect();
        ids.sort();
        f.debug_struct("ObjectDb").field("objects", &ids).finish()
    }
}
