//! Canonical group-key fingerprints.
//!
//! A key tuple is serialized with a small versioned encoding and hashed with
//! SHA-256. The encoding is the only thing that decides whether two tuples
//! land in the same group, so equal logical values must encode identically:
//!
//! ```text
//! version:u8  (tag:u8 payload)*
//!
//! 'n'                      null
//! 'b' u8                   boolean
//! 'i' i64 (LE)             integer, or a float with an exact integer value
//! 'f' u64 (LE bits)        other float; every NaN shares one bit pattern
//! 's' len:u64 (LE) bytes   string
//! 'x' len:u64 (LE) bytes   byte string
//! 'o' addr:u64 (LE)        object, by identity
//! ```

use sha2::{Digest, Sha256};
use std::fmt;
use tabula_core::Value;

/// Encoding version; bump when the layout changes.
pub const FINGERPRINT_VERSION: u8 = 1;

/// SHA-256 digest of an encoded key tuple.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(")?;
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}

/// Float with an exact `i64` value, if any.
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(b'n'),
        Value::Boolean(b) => {
            buf.push(b'b');
            buf.push(*b as u8);
        }
        Value::Int64(i) => {
            buf.push(b'i');
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float64(f) => match integral(*f) {
            Some(i) => {
                buf.push(b'i');
                buf.extend_from_slice(&i.to_le_bytes());
            }
            None => {
                let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                buf.push(b'f');
                buf.extend_from_slice(&bits.to_le_bytes());
            }
        },
        Value::String(s) => {
            buf.push(b's');
            buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.push(b'x');
            buf.extend_from_slice(&(b.len() as u64).to_le_bytes());
            buf.extend_from_slice(b);
        }
        Value::Object(o) => {
            buf.push(b'o');
            buf.extend_from_slice(&(o.addr() as u64).to_le_bytes());
        }
    }
}

/// Serializes a key tuple.
pub fn encode<'a>(values: impl IntoIterator<Item = &'a Value>) -> Vec<u8> {
    let mut buf = vec![FINGERPRINT_VERSION];
    for value in values {
        encode_value(&mut buf, value);
    }
    buf
}

/// Fingerprint of a key tuple.
pub fn fingerprint<'a>(values: impl IntoIterator<Item = &'a Value>) -> Fingerprint {
    let digest = Sha256::digest(encode(values));
    Fingerprint(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::ObjectRef;

    fn fp(values: &[Value]) -> Fingerprint {
        fingerprint(values)
    }

    #[test]
    fn test_integral_floats_match_ints() {
        assert_eq!(fp(&[Value::Int64(1)]), fp(&[Value::Float64(1.0)]));
        assert_eq!(fp(&[Value::Int64(0)]), fp(&[Value::Float64(-0.0)]));
        assert_ne!(fp(&[Value::Int64(1)]), fp(&[Value::Float64(1.5)]));
        assert_eq!(fp(&[Value::Float64(f64::NAN)]), fp(&[Value::Float64(-f64::NAN)]));
    }

    #[test]
    fn test_types_do_not_collide() {
        assert_ne!(fp(&[Value::Int64(1)]), fp(&[Value::from("1")]));
        assert_ne!(fp(&[Value::Boolean(true)]), fp(&[Value::Int64(1)]));
        assert_ne!(fp(&[Value::Null]), fp(&[Value::from("")]));
        assert_ne!(fp(&[Value::from("ab")]), fp(&[Value::Bytes(b"ab".to_vec())]));
    }

    #[test]
    fn test_length_prefix_separates_tuples() {
        assert_ne!(
            fp(&[Value::from("ab"), Value::from("c")]),
            fp(&[Value::from("a"), Value::from("bc")])
        );
    }

    #[test]
    fn test_objects_by_identity() {
        let obj = ObjectRef::new(5u8);
        let other = ObjectRef::new(5u8);
        assert_eq!(
            fp(&[Value::Object(obj.clone())]),
            fp(&[Value::Object(obj.clone())])
        );
        assert_ne!(fp(&[Value::Object(obj)]), fp(&[Value::Object(other)]));
    }

    #[test]
    fn test_encoding_is_versioned() {
        let encoded = encode(&[Value::Null]);
        assert_eq!(encoded, vec![FINGERPRINT_VERSION, b'n']);
    }
}
