//! Declared field mapping per entity kind.

/// The declared mapping between one entity kind and its remote table.
///
/// A schema is declared once per entity kind (as a `'static` constant)
/// and reused for every instance. It names the remote table, the remote
/// identity key, and the complete set of synchronized field names. Sync
/// state and local identity are control fields and must not appear in
/// `fields`; the mapper never copies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    /// Name of the remote table.
    pub table: &'static str,
    /// Record key carrying the server-assigned identity.
    pub remote_id_key: &'static str,
    /// Names of the synchronized fields, excluding the identity key.
    pub fields: &'static [&'static str],
}

impl TableSchema {
    /// Returns true if `name` is a synchronized field of this kind.
    #[must_use]
    pub fn synchronizes(&self, name: &str) -> bool {
        self.fields.iter().any(|field| *field == name)
    }

    /// Returns true if `name` is the remote identity key.
    #[must_use]
    pub fn is_remote_id(&self, name: &str) -> bool {
        self.remote_id_key == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: TableSchema = TableSchema {
        table: "tasks",
        remote_id_key: "id",
        fields: &["title", "done"],
    };

    #[test]
    fn synchronized_fields() {
        assert!(SCHEMA.synchronizes("title"));
        assert!(SCHEMA.synchronizes("done"));
        assert!(!SCHEMA.synchronizes("id"));
        assert!(!SCHEMA.synchronizes("sync_state"));
    }

    #[test]
    fn identity_key() {
        assert!(SCHEMA.is_remote_id("id"));
        assert!(!SCHEMA.is_remote_id("title"));
    }
}
