//! Discovery of the settings accepted by a plugin.
//!
//! `#[derive(Deserialize)]` passes the list of the field names of a struct to
//! [`Deserializer::deserialize_struct`]. [`struct_fields`] runs the deserialization
//! with a deserializer that records this list and stops immediately.
use serde::de::{self, Deserialize, Deserializer, Visitor};

/// Returns the names of the fields of `T`, as they appear in the configuration
/// (i.e. after `#[serde(rename)]`).
///
/// Returns an empty slice if `T` does not deserialize from a struct.
///
/// # Example
/// ```
/// use serde::Deserialize;
/// use tally::plugin::fields::struct_fields;
///
/// #[derive(Deserialize)]
/// struct Settings {
///     servers: Vec<String>,
///     #[serde(rename = "unix_sockets")]
///     sockets: Vec<String>,
/// }
///
/// assert_eq!(struct_fields::<Settings>(), &["servers", "unix_sockets"]);
/// ```
pub fn struct_fields<'de, T: Deserialize<'de>>() -> &'static [&'static str] {
    let mut fields = None;
    let _ = T::deserialize(FieldNames(&mut fields));
    fields.unwrap_or_default()
}

struct FieldNames<'a>(&'a mut Option<&'static [&'static str]>);

impl<'de> Deserializer<'de> for FieldNames<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.0 = Some(fields);
        Err(de::Error::custom("field names recorded"))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
