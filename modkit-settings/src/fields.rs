//! Field schemas for observable settings types.
//!
//! The engine cannot discover the members of an arbitrary type at runtime;
//! settings types instead publish their settable members as a table of
//! accessor triples, normally generated with [`settings_fields!`]:
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use modkit_settings::settings_fields;
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Lighting {
//!     brightness: i32,
//!     palettes: Vec<String>,
//! }
//!
//! settings_fields!(Lighting {
//!     brightness: Scalar,
//!     palettes: List,
//! });
//! ```
//!
//! A type with no settable members is valid; binding it installs no hooks.

use serde_json::Value;

use crate::error::SettingsError;

/// How a settable member behaves under observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain value member; changes report the member's name.
    Scalar,
    /// A mutable ordered collection. Element-level operations report an
    /// empty property name; assigning the whole member reports its name.
    List,
}

/// Accessor triple for one settable member of `T`.
///
/// Values cross the accessor boundary as JSON, which keeps the table
/// monomorphic and lets callers address members by name.
pub struct FieldAccessor<T> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<(), SettingsError>,
}

/// Types whose settable members are published as an accessor table.
pub trait SettingsFields: Sized + Send + 'static {
    /// Type name used for feature sections and hook owner signatures.
    fn type_name() -> &'static str;

    /// The accessor table, in declaration order.
    fn fields() -> &'static [FieldAccessor<Self>];

    /// Look up one accessor by member name.
    fn field(name: &str) -> Option<&'static FieldAccessor<Self>> {
        Self::fields().iter().find(|field| field.name == name)
    }
}

/// Serialize the declared members of `settings` into a JSON object.
pub fn encode_fields<T: SettingsFields>(settings: &T) -> Value {
    let mut map = serde_json::Map::new();
    for field in T::fields() {
        map.insert(field.name.to_string(), (field.get)(settings));
    }
    Value::Object(map)
}

#[doc(hidden)]
pub fn encode_field<V: serde::Serialize>(value: &V) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[doc(hidden)]
pub fn decode_field<T, V>(field: &'static str, value: Value) -> Result<V, SettingsError>
where
    T: SettingsFields,
    V: serde::de::DeserializeOwned,
{
    serde_json::from_value(value).map_err(|source| SettingsError::FieldDecode {
        type_name: T::type_name(),
        field,
        source,
    })
}

/// Generate a [`SettingsFields`] implementation from a member list.
///
/// Member types must implement `serde::Serialize` and
/// `serde::Deserialize`; `Vec` members should be declared `List` so
/// element-level operations are observable.
#[macro_export]
macro_rules! settings_fields {
    ($ty:ident { $($field:ident : $kind:ident),* $(,)? }) => {
        impl $crate::fields::SettingsFields for $ty {
            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn fields() -> &'static [$crate::fields::FieldAccessor<Self>] {
                const FIELDS: &[$crate::fields::FieldAccessor<$ty>] = &[
                    $($crate::fields::FieldAccessor {
                        name: stringify!($field),
                        kind: $crate::fields::FieldKind::$kind,
                        get: |settings: &$ty| $crate::fields::encode_field(&settings.$field),
                        set: |settings: &mut $ty, value| {
                            match $crate::fields::decode_field::<$ty, _>(stringify!($field), value) {
                                Ok(parsed) => {
                                    settings.$field = parsed;
                                    Ok(())
                                }
                                Err(err) => Err(err),
                            }
                        },
                    },)*
                ];
                FIELDS
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Lighting {
        brightness: i32,
        palettes: Vec<String>,
    }

    settings_fields!(Lighting {
        brightness: Scalar,
        palettes: List,
    });

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Empty {}

    settings_fields!(Empty {});

    #[test]
    fn table_reflects_declaration_order() {
        let fields = Lighting::fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "brightness");
        assert_eq!(fields[0].kind, FieldKind::Scalar);
        assert_eq!(fields[1].name, "palettes");
        assert_eq!(fields[1].kind, FieldKind::List);
    }

    #[test]
    fn accessors_round_trip_values() {
        let mut lighting = Lighting::default();
        let brightness = Lighting::field("brightness").expect("field");
        (brightness.set)(&mut lighting, json!(80)).expect("set");
        assert_eq!(lighting.brightness, 80);
        assert_eq!((brightness.get)(&lighting), json!(80));
    }

    #[test]
    fn decode_failures_name_the_field() {
        let mut lighting = Lighting::default();
        let brightness = Lighting::field("brightness").expect("field");
        let err = (brightness.set)(&mut lighting, json!("not a number")).expect_err("type error");
        assert!(matches!(
            err,
            SettingsError::FieldDecode {
                field: "brightness",
                ..
            }
        ));
    }

    #[test]
    fn empty_schema_is_valid() {
        assert!(Empty::fields().is_empty());
        assert!(Empty::field("anything").is_none());
    }

    #[test]
    fn encode_fields_builds_the_section_image() {
        let lighting = Lighting {
            brightness: 50,
            palettes: vec!["warm".to_string()],
        };
        assert_eq!(
            encode_fields(&lighting),
            json!({"brightness": 50, "palettes": ["warm"]})
        );
    }
}
