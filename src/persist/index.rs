//! Secondary index declarations shared by every backend.

use serde_json::Value;

use crate::path::get_path;

/// An index over one or more dotted body paths.
///
/// Documents where any indexed path is missing or `null` are left out of the
/// index, so a unique index never rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSpec {
    fields: Vec<String>,
    unique: bool,
}

impl IndexSpec {
    /// Index over `fields`, in order.
    pub fn new<I, S>(fields: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique,
        }
    }

    /// Indexed paths.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether two documents may share a key.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Storage name of this index on `collection`, e.g. `doc_users_email`.
    pub fn qualified_name(&self, collection: &str) -> String {
        format!("doc_{}_{}", ident(collection), ident(&self.fields.join("_")))
    }

    /// Comparable key of `doc`, `None` when the document is not indexed.
    pub fn key(&self, doc: &Value) -> Option<String> {
        let mut parts = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match get_path(doc, field) {
                None | Some(Value::Null) => return None,
                Some(value) => parts.push(value.clone()),
            }
        }
        Some(Value::Array(parts).to_string())
    }
}

fn ident(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_skip_missing_and_null_paths() {
        let index = IndexSpec::new(["email", "org.id"], true);
        assert_eq!(index.qualified_name("user-accounts"), "doc_user_accounts_email_org_id");
        assert_eq!(
            index.key(&json!({"email": "a@b", "org": {"id": 7}})),
            Some(r#"["a@b",7]"#.to_string())
        );
        assert_eq!(index.key(&json!({"email": "a@b"})), None);
        assert_eq!(index.key(&json!({"email": null, "org": {"id": 7}})), None);
    }
}
