use serde::Serialize;
use std::fmt;

/// One of the named operations a cache client exposes.
///
/// The set is closed: these are exactly the operations the proxy intercepts.
/// Serialized and displayed as the snake_case operation name, which is also
/// the key used in the per-operation tally of the panel.
///
/// # Variants
///
/// * `Get` / `GetMany` - **read** operations, classified as hit or miss
/// * `Add` / `Set` / `SetMany` - writes
/// * `Delete` / `DeleteMany` / `Clear` - removals (`Clear` is never recorded)
/// * `Incr` / `Decr` - counter updates
/// * `HasKey` - membership check (not classified, its name does not start with `get`)
///
/// # Examples
///
/// ```
/// use cache_panel_core::Operation;
///
/// assert_eq!(Operation::GetMany.name(), "get_many");
/// assert!(Operation::GetMany.is_read());
/// assert!(!Operation::HasKey.is_read());
/// assert_eq!(Operation::from_name("delete_many"), Some(Operation::DeleteMany));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Get,
    Set,
    Delete,
    GetMany,
    SetMany,
    DeleteMany,
    Incr,
    Decr,
    HasKey,
    Clear,
}

impl Operation {
    /// Every intercepted operation, in declaration order.
    pub const ALL: [Operation; 11] = [
        Operation::Add,
        Operation::Get,
        Operation::Set,
        Operation::Delete,
        Operation::GetMany,
        Operation::SetMany,
        Operation::DeleteMany,
        Operation::Incr,
        Operation::Decr,
        Operation::HasKey,
        Operation::Clear,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Get => "get",
            Operation::Set => "set",
            Operation::Delete => "delete",
            Operation::GetMany => "get_many",
            Operation::SetMany => "set_many",
            Operation::DeleteMany => "delete_many",
            Operation::Incr => "incr",
            Operation::Decr => "decr",
            Operation::HasKey => "has_key",
            Operation::Clear => "clear",
        }
    }

    /// Read operations are the ones whose name starts with `get`.
    pub fn is_read(self) -> bool {
        self.name().starts_with("get")
    }

    /// `clear` delegates straight to the backend without a ledger entry.
    pub fn is_recorded(self) -> bool {
        self != Operation::Clear
    }

    /// Looks an operation up by its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
