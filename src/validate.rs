//! Small predicates for [`crate::document::Document::validate`] impls.

use crate::document::Document;
use crate::runtime::Collection;
use crate::types::DocId;

/// True when `value` differs from its type's zero value.
pub fn validate_required<T: Default + PartialEq>(value: &T) -> bool {
    *value != T::default()
}

/// True when `value` is one of `options`.
pub fn validate_inclusion_in<S: AsRef<str>>(value: &str, options: &[S]) -> bool {
    options.iter().any(|option| option.as_ref() == value)
}

/// True when a document with `id` exists in `collection`. Storage errors
/// count as missing.
pub async fn validate_id_ref<T: Document>(id: &DocId, collection: &Collection<T>) -> bool {
    collection.exists(id).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_zero_values() {
        assert!(!validate_required(&String::new()));
        assert!(validate_required(&"x".to_string()));
        assert!(!validate_required(&0u32));
        assert!(!validate_required(&None::<DocId>));
        assert!(validate_required(&Some(DocId::from("a"))));
    }

    #[test]
    fn inclusion() {
        assert!(validate_inclusion_in("b", &["a", "b"]));
        assert!(!validate_inclusion_in("c", &["a", "b"]));
        assert!(!validate_inclusion_in("a", &[] as &[&str]));
    }
}
