//! Bidirectional field mapping between records and entities.
//!
//! Both directions are pure and total: side effects are confined to the
//! passed-in target, and neither direction reads or writes sync state or
//! local identity (those are excluded from the schema's field set by
//! contract).

use crate::entity::{RemoteId, TableEntity};
use crate::record::{FieldValue, Record};

/// Copies every key of `record` onto the matching field of `entity`,
/// overwriting existing values.
///
/// The remote identity key is routed to [`TableEntity::set_remote_id`];
/// keys outside the schema are ignored, so a server that grows new
/// columns does not break older clients.
pub fn merge_record_into_entity<T: TableEntity>(record: &Record, entity: &mut T) {
    let schema = T::schema();
    for (key, value) in record {
        if schema.is_remote_id(key) {
            if let Some(id) = value.as_identity() {
                entity.set_remote_id(Some(RemoteId::new(id)));
            }
        } else if schema.synchronizes(key) {
            entity.set_field(key, value.clone());
        }
    }
}

/// Copies every synchronized field of `entity` into `record`, creating
/// keys as needed.
///
/// The remote identity key is included when the entity has one, so an
/// update or delete carries the join key the remote service expects.
pub fn merge_entity_into_record<T: TableEntity>(entity: &T, record: &mut Record) {
    let schema = T::schema();
    for name in schema.fields {
        if let Some(value) = entity.field(name) {
            record.insert(*name, value);
        }
    }
    if let Some(id) = entity.remote_id() {
        record.insert(schema.remote_id_key, FieldValue::Text(id.as_str().to_string()));
    }
}
