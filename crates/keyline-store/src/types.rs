use serde::{Deserialize, Serialize};

/// Store-assigned version number of a mutation.
pub type Revision = i64;

/// A stored key and its value, with etcd-style version metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    /// Revision of the mutation that created the key.
    pub create_revision: Revision,
    /// Revision of the last mutation of the key.
    pub mod_revision: Revision,
    /// Number of writes since the key was created, starting at 1.
    pub version: i64,
}

/// Response to a put.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    /// Store revision after the write.
    pub revision: Revision,
    /// The value the write replaced, if any.
    pub prev_kv: Option<KeyValue>,
}

/// Response to a delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Store revision after the delete.
    pub revision: Revision,
    /// Number of keys removed (0 or 1).
    pub deleted: i64,
}
