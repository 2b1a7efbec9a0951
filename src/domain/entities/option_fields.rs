use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::{Validate, ValidateLength, ValidationErrors};

/// Tri-state field for PATCH bodies.
///
/// - key absent → `Unchanged` (requires `#[serde(default)]` on the container)
/// - `null` → `SetToNull`
/// - any value → `SetToValue`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OptionField<T> {
    #[default]
    Unchanged,
    SetToNull,
    SetToValue(T),
}

impl<'de, T> Deserialize<'de> for OptionField<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => OptionField::SetToValue(value),
            None => OptionField::SetToNull,
        })
    }
}

impl<T: Serialize> Serialize for OptionField<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            OptionField::SetToValue(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

// ---------------------- Validation support ----------------------

impl<T> ValidateLength<u64> for OptionField<T>
where
    T: ValidateLength<u64>
{
    fn length(&self) -> Option<u64> {
        match self {
            OptionField::SetToValue(value) => value.length(),
            _ => None,
        }
    }
    fn validate_length(&self, min: Option<u64>, max: Option<u64>, equal: Option<u64>) -> bool {
        match self {
            OptionField::SetToValue(value) => value.validate_length(min, max, equal),
            _ => true,
        }
    }
}

impl<T: Validate> Validate for OptionField<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            OptionField::SetToValue(value) => value.validate(),
            _ => Ok(()),
        }
    }
}

// ---------------------- Helpers ----------------------

impl<T> OptionField<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn is_set_to_null(&self) -> bool {
        matches!(self, Self::SetToNull)
    }

    /// Inner value when `SetToValue`.
    pub fn flatten_ref(&self) -> Option<&T> {
        match self {
            OptionField::SetToValue(v) => Some(v),
            _ => None
        }
    }

    /// Resolves a nullable column: `Unchanged` keeps `current`.
    pub fn apply_nullable(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            OptionField::Unchanged => current,
            OptionField::SetToNull => None,
            OptionField::SetToValue(v) => Some(v.clone()),
        }
    }

    /// Resolves a non-null column: only `SetToValue` replaces `current`.
    pub fn apply(&self, current: T) -> T
    where
        T: Clone,
    {
        match self {
            OptionField::SetToValue(v) => v.clone(),
            _ => current,
        }
    }
}

impl OptionField<String> {
    pub fn flatten_str(&self) -> Option<&str> {
        self.flatten_ref().map(|s| s.as_str())
    }
}

impl OptionField<bool> {
    pub fn flatten_bool(&self) -> Option<bool> {
        self.flatten_ref().copied()
    }
}

impl<T> From<Option<Option<T>>> for OptionField<T> {
    fn from(opt: Option<Option<T>>) -> Self {
        match opt {
            None => OptionField::Unchanged,
            Some(None) => OptionField::SetToNull,
            Some(Some(v)) => OptionField::SetToValue(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Patch {
        title: OptionField<String>,
        website: OptionField<String>,
        order: OptionField<i32>,
    }

    #[test]
    fn absent_null_and_value_are_distinguished() {
        let patch: Patch = serde_json::from_str(r#"{"website": null, "order": 3}"#).unwrap();
        assert!(patch.title.is_unchanged());
        assert!(patch.website.is_set_to_null());
        assert_eq!(patch.order, OptionField::SetToValue(3));
    }

    #[test]
    fn apply_helpers_resolve_against_current_values() {
        let keep: OptionField<String> = OptionField::Unchanged;
        let clear: OptionField<String> = OptionField::SetToNull;
        let set = OptionField::SetToValue("new".to_string());

        assert_eq!(keep.apply_nullable(Some("old".into())), Some("old".into()));
        assert_eq!(clear.apply_nullable(Some("old".into())), None);
        assert_eq!(set.apply("old".into()), "new");
        assert_eq!(clear.apply("old".into()), "old");
    }
}
