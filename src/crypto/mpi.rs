//! Big-endian integer and elliptic-curve point helpers.
//!
//! Trimmed from a general multi-precision-integer type down to what
//! the 7F49 public-key template and ECDH point parsing actually need:
//! leading-zero stripping for RSA modulus/exponent encoding, and the
//! uncompressed Weierstrass point format (`04 || X || Y`) used by the
//! NIST curves.

use std::fmt;

/// A big-endian integer with its leading zero bytes stripped, as used
/// for an RSA modulus or public exponent inside a 7F49 template.
#[derive(Clone, PartialEq, Eq)]
pub struct Mpi {
    value: Box<[u8]>,
}

impl From<Vec<u8>> for Mpi {
    fn from(v: Vec<u8>) -> Self {
        Self::new(&v)
    }
}

impl Mpi {
    /// Creates a new `Mpi`, stripping leading zero bytes.
    pub fn new(value: &[u8]) -> Self {
        let first_nonzero = value.iter().position(|&b| b != 0).unwrap_or(value.len());
        Mpi {
            value: value[first_nonzero..].to_vec().into_boxed_slice(),
        }
    }

    /// The value's length in bits, i.e. the index of its highest set
    /// bit plus one.
    pub fn bits(&self) -> usize {
        self.value.len() * 8
            - self.value.first().map(|b| b.leading_zeros() as usize).unwrap_or(0)
    }

    /// The big-endian value, with no leading zero bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl fmt::Debug for Mpi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Mpi({} bits)", self.bits())
    }
}

/// An elliptic-curve point in the uncompressed Weierstrass encoding
/// (`04 || X || Y`, each coordinate padded to the curve's field size).
#[derive(Clone, PartialEq, Eq)]
pub struct EcPoint {
    encoded: Box<[u8]>,
    field_bytes: usize,
}

impl EcPoint {
    /// Builds an uncompressed point from its two coordinates and the
    /// curve's field size in bits.
    pub fn new_weierstrass(x: &[u8], y: &[u8], field_bits: usize) -> Self {
        let field_bytes = (field_bits + 7) / 8;
        let mut encoded = vec![0u8; 1 + 2 * field_bytes];
        encoded[0] = 0x04;
        encoded[1 + field_bytes - x.len()..1 + field_bytes].copy_from_slice(x);
        encoded[1 + 2 * field_bytes - y.len()..].copy_from_slice(y);
        EcPoint {
            encoded: encoded.into_boxed_slice(),
            field_bytes,
        }
    }

    /// Wraps an already-encoded point, validating its length against
    /// the expected field size.
    pub fn from_encoded(encoded: &[u8], field_bits: usize) -> crate::Result<Self> {
        let field_bytes = (field_bits + 7) / 8;
        if encoded.len() != 1 + 2 * field_bytes || encoded[0] != 0x04 {
            return Err(crate::Error::CryptoDataError);
        }
        Ok(EcPoint {
            encoded: encoded.to_vec().into_boxed_slice(),
            field_bytes,
        })
    }

    /// The point's wire encoding, `04 || X || Y`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Splits the point back into its two coordinates.
    pub fn coordinates(&self) -> (&[u8], &[u8]) {
        (
            &self.encoded[1..1 + self.field_bytes],
            &self.encoded[1 + self.field_bytes..],
        )
    }
}

impl fmt::Debug for EcPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EcPoint({} bytes)", self.encoded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpi_strips_leading_zeros() {
        let m = Mpi::new(&[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(m.value(), &[0x01, 0x02]);
        assert_eq!(m.bits(), 9);
    }

    #[test]
    fn mpi_all_zero_collapses_to_empty() {
        let m = Mpi::new(&[0x00, 0x00]);
        assert_eq!(m.value(), &[] as &[u8]);
        assert_eq!(m.bits(), 0);
    }

    #[test]
    fn ec_point_roundtrip_p256() {
        let x = [0x11u8; 32];
        let y = [0x22u8; 32];
        let p = EcPoint::new_weierstrass(&x, &y, 256);
        assert_eq!(p.as_bytes().len(), 65);
        assert_eq!(p.as_bytes()[0], 0x04);
        let (cx, cy) = p.coordinates();
        assert_eq!(cx, &x);
        assert_eq!(cy, &y);

        let decoded = EcPoint::from_encoded(p.as_bytes(), 256).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn ec_point_rejects_bad_prefix() {
        let mut buf = vec![0x04u8; 65];
        buf[0] = 0x02;
        assert!(EcPoint::from_encoded(&buf, 256).is_err());
    }

    #[test]
    fn ec_point_rejects_wrong_length() {
        assert!(EcPoint::from_encoded(&[0x04; 64], 256).is_err());
    }
}
