//! The object envelope: metadata, value, optional native resource handle.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::{TypeTag, Value};

/// Unique identifier for objects and transactions.
pub type ObjectId = u64;

/// Shared-ownership handle to a native resource (open file, watch
/// registration, ...). Released when the last referencing object is
/// dropped. Handles never point back at objects, so no cycles can form.
pub type NativeHandle = Arc<dyn Any + Send + Sync>;

/// Process-wide identifier source.
///
/// Seeded once from the high-resolution clock, then incremented atomically
/// per call. Two ids minted in sequence are strictly increasing even under
/// rapid concurrent creation — the seed only anchors the series to wall
/// time for log correlation.
static ID_SOURCE: OnceLock<AtomicU64> = OnceLock::new();

/// Mint the next object identifier.
pub fn next_object_id() -> ObjectId {
    let source = ID_SOURCE.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1);
        AtomicU64::new(seed)
    });
    source.fetch_add(1, Ordering::Relaxed)
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Metadata envelope stamped onto every object at construction.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Monotonically increasing identifier.
    pub id: ObjectId,
    /// Type tag; agrees with the value's active variant unless it is one
    /// of the sentinel tags (error, exit, object).
    pub tag: TypeTag,
    /// Payload size in bytes.
    pub size: usize,
    /// Creation timestamp, microseconds since epoch.
    pub created_at: u64,
    /// Last-modified timestamp, microseconds since epoch.
    pub modified_at: u64,
    /// Permission annotation (advisory, consumed by the gate).
    pub permissions: String,
}

/// The uniform tagged result produced by every execution path.
///
/// Objects are value types: they move or clone between layers. The only
/// shared-ownership relationship in the system is the optional native
/// handle.
#[derive(Clone)]
pub struct Object {
    pub meta: ObjectMeta,
    pub value: Value,
    pub native: Option<NativeHandle>,
}

impl Object {
    /// Construct an object with an explicit tag.
    ///
    /// The tag must either agree with the value's variant or be a
    /// sentinel; disagreement is a construction bug, so this is checked
    /// in debug builds.
    pub fn new(tag: TypeTag, value: Value) -> Self {
        debug_assert!(
            tag == value.tag() || tag.is_sentinel(),
            "tag {tag} disagrees with value variant {}",
            value.tag()
        );
        let now = now_micros();
        Self {
            meta: ObjectMeta {
                id: next_object_id(),
                tag,
                size: value.byte_size(),
                created_at: now,
                modified_at: now,
                permissions: String::new(),
            },
            value,
            native: None,
        }
    }

    /// Construct from a value, deriving the tag from its variant.
    pub fn from_value(value: Value) -> Self {
        Self::new(value.tag(), value)
    }

    /// A null-tagged object.
    pub fn null() -> Self {
        Self::from_value(Value::Null)
    }

    /// A string-tagged object.
    pub fn text(s: impl Into<String>) -> Self {
        Self::from_value(Value::Text(s.into()))
    }

    /// The uniform error constructor: error tag, descriptive text value.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(TypeTag::Error, Value::Text(message.into()))
    }

    /// The uniform exit signal.
    pub fn exit() -> Self {
        Self::new(TypeTag::Exit, Value::Text("Goodbye!".into()))
    }

    /// Attach a shared native resource handle.
    pub fn with_native(mut self, handle: NativeHandle) -> Self {
        self.native = Some(handle);
        self
    }

    pub fn is_error(&self) -> bool {
        self.meta.tag == TypeTag::Error
    }

    pub fn is_exit(&self) -> bool {
        self.meta.tag == TypeTag::Exit
    }

    /// The error message, if this is an error object.
    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.value.as_text()
        } else {
            None
        }
    }

    /// Replace the value, refreshing size and modified-at.
    pub fn set_value(&mut self, value: Value) {
        debug_assert!(
            self.meta.tag == value.tag() || self.meta.tag.is_sentinel(),
            "set_value would break tag agreement"
        );
        self.meta.size = value.byte_size();
        self.meta.modified_at = now_micros();
        self.value = value;
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("meta", &self.meta)
            .field("value", &self.value)
            .field("native", &self.native.as_ref().map(|_| "<handle>"))
            .finish()
    }
}
