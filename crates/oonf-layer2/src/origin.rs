use std::sync::Arc;

/// A priority-tagged writer identity (spec.md §4.4). Two origins are the
/// same origin iff they're the same `Arc` allocation — registering twice
/// under the same name intentionally yields two distinct origins, matching
/// `origin_add` being a fresh registration, not a lookup-or-create.
#[derive(Debug)]
pub struct Origin {
    pub name: String,
    pub priority: i32,
    /// Proactively-measured origins (e.g. a driver sampling the radio) vs
    /// passively-observed ones (e.g. DAT's own back-computed estimate).
    pub proactive: bool,
}

#[derive(Clone, Debug)]
pub struct OriginHandle(pub(crate) Arc<Origin>);

impl OriginHandle {
    pub fn new(name: impl Into<String>, priority: i32, proactive: bool) -> Self {
        Self(Arc::new(Origin {
            name: name.into(),
            priority,
            proactive,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn priority(&self) -> i32 {
        self.0.priority
    }

    pub fn is_proactive(&self) -> bool {
        self.0.proactive
    }

    pub fn same_origin(&self, other: &OriginHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for OriginHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_origin(other)
    }
}
impl Eq for OriginHandle {}
