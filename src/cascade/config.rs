use serde_json::{Map, Value};

use crate::persist::Filter;
use crate::record::Snapshot;
use crate::types::{Arity, DocId, ID_FIELD};

use super::{CascadeError, nested_map_from};

/// One propagation rule declared by a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// Collection holding the embedded copies.
    pub target_collection: String,
    /// Source paths, by external name, copied into the target.
    pub source_fields: Vec<String>,
    /// Property on the target holding the copy; top-level merge when unset.
    pub through_property: Option<String>,
    /// Single copy or array of copies.
    pub arity: Arity,
    /// Targets currently related to the source.
    pub match_filter: Filter,
    /// Previously related targets whose copy must be removed.
    pub prior_match_filter: Option<Filter>,
    /// Whether each written target re-runs its own cascades.
    pub nested: bool,
}

impl CascadeConfig {
    /// A single embedded copy on targets matching `match_filter`.
    pub fn to_one(target_collection: impl Into<String>, match_filter: Filter) -> Self {
        Self {
            target_collection: target_collection.into(),
            source_fields: Vec::new(),
            through_property: None,
            arity: Arity::ToOne,
            match_filter,
            prior_match_filter: None,
            nested: false,
        }
    }

    /// An array of copies under `through`, keyed by source id.
    pub fn to_many(
        target_collection: impl Into<String>,
        through: impl Into<String>,
        match_filter: Filter,
    ) -> Self {
        Self {
            arity: Arity::ToMany,
            through_property: Some(through.into()),
            ..Self::to_one(target_collection, match_filter)
        }
    }

    /// Sets the copied source paths.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Nests the copy under `property` on the target.
    pub fn through(mut self, property: impl Into<String>) -> Self {
        self.through_property = Some(property.into());
        self
    }

    /// Sets the filter for previously related targets, if any.
    pub fn with_prior(mut self, prior: Option<Filter>) -> Self {
        self.prior_match_filter = prior;
        self
    }

    /// Marks targets as cascade sources themselves.
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    /// Checks the config can be executed.
    pub fn validate(&self) -> Result<(), CascadeError> {
        let invalid = |reason| CascadeError::InvalidConfig {
            target: self.target_collection.clone(),
            reason,
        };
        if self.target_collection.is_empty() {
            return Err(invalid("empty target collection"));
        }
        if self.source_fields.is_empty() {
            return Err(invalid("no source fields"));
        }
        if self.arity == Arity::ToMany && self.through_property.is_none() {
            return Err(invalid("to-many cascade needs a through property"));
        }
        if self.through_property.is_none() && self.source_fields.iter().any(|f| f == ID_FIELD) {
            return Err(invalid("top-level copy would overwrite the target id"));
        }
        Ok(())
    }
}

/// A config bound to the source state it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    /// Rule being executed.
    pub config: CascadeConfig,
    /// Source document id.
    pub source_id: DocId,
    /// Copy of the source fields.
    pub payload: Map<String, Value>,
    /// The same fields read off the source type's zero value.
    pub cleared: Map<String, Value>,
}

impl CascadePlan {
    /// Extracts the payload from `source` and the cleared shape from `zero`.
    pub fn prepare(
        config: CascadeConfig,
        source: &Snapshot,
        source_id: &DocId,
        zero: &Snapshot,
    ) -> Result<Self, CascadeError> {
        config.validate()?;
        let payload = nested_map_from(source, &config.source_fields)?;
        let cleared = nested_map_from(zero, &config.source_fields)?;
        Ok(Self {
            config,
            source_id: source_id.clone(),
            payload,
            cleared,
        })
    }

    /// `$set` document writing `body` as this plan's embedded copy.
    pub(crate) fn set_document(&self, body: &Map<String, Value>) -> Map<String, Value> {
        match &self.config.through_property {
            Some(through) => {
                let mut set = Map::new();
                set.insert(through.clone(), Value::Object(body.clone()));
                set
            }
            None => body.clone(),
        }
    }
}
