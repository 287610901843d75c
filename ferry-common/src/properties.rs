//! Loading of `key=value` configuration files.
//!
//! Both the broker and the mail-provider settings live in Java-style
//! `.properties` files. A file is read into a [`Properties`] map, which can
//! then be deserialised into any `serde` type. Values are text on disk, so the
//! deserializer parses numbers and flags from their textual form.
//!
//! The file syntax is that of `java.util.Properties`: ISO-8859-1 text with
//! `=`, `:` or whitespace separators, `#`/`!` comments, `\` line continuations
//! and escapes such as `\\`, `\=` and `\uXXXX`.

use std::{collections::BTreeMap, io::Read, path::Path};

use serde::{
    de::{
        self, DeserializeOwned, IntoDeserializer, Unexpected, Visitor,
        value::{Error as ValueError, MapDeserializer},
    },
    forward_to_deserialize_any,
};

use crate::error::{ConfigError, Result};

/// An ordered set of configuration entries read from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    origin: String,
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid properties file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path.display().to_string(), contents.as_slice())
    }

    /// Parse properties from `input`, remembering `origin` for error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on a malformed escape or a read failure.
    pub fn parse<S: Into<String>, R: Read>(origin: S, input: R) -> Result<Self> {
        let origin = origin.into();

        match java_properties::read(input) {
            Ok(entries) => Ok(Self {
                origin,
                entries: entries.into_iter().collect(),
            }),
            Err(source) => Err(ConfigError::Parse { origin, source }),
        }
    }

    /// Where these entries were read from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Interpret these entries as a `T`.
    ///
    /// Keys that `T` does not declare are ignored, so several typed views can
    /// be taken over the same file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a required key is missing or a
    /// value cannot be parsed into the field's type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let deserializer: MapDeserializer<'_, _, ValueError> = MapDeserializer::new(
            self.entries
                .iter()
                .map(|(key, value)| (key.as_str(), ValueDeserializer(value.as_str()))),
        );

        T::deserialize(deserializer).map_err(|source| ConfigError::Invalid {
            origin: self.origin.clone(),
            source,
        })
    }
}

/// Deserializes one textual property value.
struct ValueDeserializer<'de>(&'de str);

impl<'de> IntoDeserializer<'de, ValueError> for ValueDeserializer<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {$(
        fn $method<V: Visitor<'de>>(
            self,
            visitor: V,
        ) -> std::result::Result<V::Value, Self::Error> {
            let parsed = self.0.parse::<$ty>().map_err(|_| {
                de::Error::invalid_value(Unexpected::Str(self.0), &stringify!($ty))
            })?;
            visitor.$visit(parsed)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_borrowed_str(self.0)
    }

    fn deserialize_bool<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        match self.0.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => visitor.visit_bool(true),
            "0" | "false" | "no" | "off" => visitor.visit_bool(false),
            _ => Err(de::Error::invalid_value(
                Unexpected::Str(self.0),
                &"a flag (0 or 1)",
            )),
        }
    }

    deserialize_number! {
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_enum(IntoDeserializer::<ValueError>::into_deserializer(self.0))
    }

    forward_to_deserialize_any! {
        i8 i16 i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}
