//! Rejects non-finite floats before they reach `serde_json`.
//!
//! `serde_json` writes NaN and infinities as `null`, which would silently
//! change a payload value. [`ensure_finite`] walks a value with a serializer
//! that produces nothing and fails on the first non-finite float.

use serde::ser::{self, Error as _, Serialize};

type Error = serde_json::Error;

/// Fails if `value` contains a NaN or infinite `f32`/`f64` anywhere.
pub(crate) fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> Result<(), Error> {
    value.serialize(FiniteFloats)
}

#[derive(Clone, Copy)]
struct FiniteFloats;

fn check(value: f64) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::custom(format!(
            "non-finite float {} cannot be represented in JSON",
            value
        )))
    }
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_f32(self, v: f32) -> Result<(), Error> {
        check(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), Error> {
        check(v)
    }

    fn serialize_bool(self, _: bool) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_char(self, _: char) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Error> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Error> {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result<(), Error> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(serde::Serialize)]
    struct Reading {
        samples: Vec<Option<f32>>,
    }

    #[test]
    fn test_accepts_finite_values() {
        assert!(ensure_finite(&1.5f64).is_ok());
        assert!(ensure_finite(&vec![0.0f64, -2.25, f64::MAX]).is_ok());
        assert!(ensure_finite(&"text").is_ok());
        assert!(ensure_finite(&u128::MAX).is_ok());
    }

    #[test]
    fn test_rejects_top_level_non_finite() {
        assert!(ensure_finite(&f64::NAN).is_err());
        assert!(ensure_finite(&f64::INFINITY).is_err());
        assert!(ensure_finite(&f64::NEG_INFINITY).is_err());
        assert!(ensure_finite(&f32::NAN).is_err());
    }

    #[test]
    fn test_rejects_nested_non_finite() {
        let reading = Reading {
            samples: vec![Some(1.0), None, Some(f32::INFINITY)],
        };
        assert!(ensure_finite(&reading).is_err());

        let mut map = BTreeMap::new();
        map.insert("a", vec![(1u8, f64::NAN)]);
        assert!(ensure_finite(&map).is_err());
    }
}
