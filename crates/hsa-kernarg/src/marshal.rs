//! Conversion of host values into native kernel argument slots

use num_complex::{Complex32, Complex64};
use tracing::trace;

use crate::descriptor::ArrayDescriptor;
use crate::error::{MarshalError, Result};
use crate::slot::{NativeCell, NativeSlot};
use crate::types::{ArgType, ScalarType};
use crate::value::ArgValue;

/// Marshal one value against its declared formal type.
///
/// Reads `value` only. Array types allocate exactly one [`ArrayDescriptor`],
/// owned by the returned slot.
pub fn marshal(value: &ArgValue<'_>, ty: &ArgType) -> Result<NativeSlot> {
    match ty {
        ArgType::Array { dtype, ndim } => {
            let ArgValue::Array(array) = value else {
                return Err(MarshalError::type_mismatch(ty, value.kind()));
            };
            if array.ndim() != *ndim {
                return Err(MarshalError::ShapeRankMismatch {
                    declared: *ndim,
                    observed: array.ndim(),
                });
            }
            if array.dtype() != *dtype {
                return Err(MarshalError::type_mismatch(ty, value.kind()));
            }

            let descriptor = ArrayDescriptor::from_array(array);
            trace!(
                ndim = ndim,
                data = descriptor.data(),
                descriptor = descriptor.address(),
                "marshaled array argument"
            );
            Ok(NativeSlot::array(descriptor))
        }
        ArgType::Scalar(scalar) => scalar_cell(value, *scalar).map(NativeSlot::value),
        ArgType::Boolean | ArgType::Opaque(_) => Err(MarshalError::UnsupportedArgumentType(ty.to_string())),
    }
}

/// Marshal every value in declared order.
///
/// Stops at the first failure and reports its index; nothing is written
/// anywhere, so a failed call leaves no partial state behind.
pub fn marshal_all(values: &[ArgValue<'_>], types: &[ArgType]) -> std::result::Result<Vec<NativeSlot>, (usize, MarshalError)> {
    values
        .iter()
        .zip(types)
        .enumerate()
        .map(|(index, (value, ty))| marshal(value, ty).map_err(|err| (index, err)))
        .collect()
}

fn scalar_cell(value: &ArgValue<'_>, ty: ScalarType) -> Result<NativeCell> {
    let cell = match ty {
        ScalarType::I8 => NativeCell::I8(integer(value, ty)?),
        ScalarType::I16 => NativeCell::I16(integer(value, ty)?),
        ScalarType::I32 => NativeCell::I32(integer(value, ty)?),
        ScalarType::I64 => NativeCell::I64(integer(value, ty)?),
        ScalarType::U8 => NativeCell::U8(integer(value, ty)?),
        ScalarType::U16 => NativeCell::U16(integer(value, ty)?),
        ScalarType::U32 => NativeCell::U32(integer(value, ty)?),
        ScalarType::U64 => NativeCell::U64(integer(value, ty)?),
        ScalarType::F32 => NativeCell::F32(narrow(real(value, ty, exact_f32)?, ty)?),
        ScalarType::F64 => NativeCell::F64(real(value, ty, exact_f64)?),
        ScalarType::C64 => {
            let c = complex(value, ty, exact_f32)?;
            NativeCell::C64(Complex32::new(narrow(c.re, ty)?, narrow(c.im, ty)?))
        }
        ScalarType::C128 => NativeCell::C128(complex(value, ty, exact_f64)?),
    };
    Ok(cell)
}

fn integer<T>(value: &ArgValue<'_>, ty: ScalarType) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match *value {
        ArgValue::Int(v) => T::try_from(v).map_err(|_| MarshalError::out_of_range(ty, v)),
        ArgValue::UInt(v) => T::try_from(v).map_err(|_| MarshalError::out_of_range(ty, v)),
        _ => Err(MarshalError::type_mismatch(ty, value.kind())),
    }
}

/// Integers must survive the trip through the target float unchanged.
fn real(value: &ArgValue<'_>, ty: ScalarType, exact: fn(i128) -> Option<f64>) -> Result<f64> {
    match *value {
        ArgValue::Float(v) => Ok(v),
        ArgValue::Int(v) => exact(v.into()).ok_or_else(|| MarshalError::out_of_range(ty, v)),
        ArgValue::UInt(v) => exact(v.into()).ok_or_else(|| MarshalError::out_of_range(ty, v)),
        _ => Err(MarshalError::type_mismatch(ty, value.kind())),
    }
}

/// A bare real becomes `{ re, 0 }`; an existing pair is copied unchanged.
fn complex(value: &ArgValue<'_>, ty: ScalarType, exact: fn(i128) -> Option<f64>) -> Result<Complex64> {
    match *value {
        ArgValue::Complex(c) => Ok(c),
        ArgValue::Float(_) | ArgValue::Int(_) | ArgValue::UInt(_) => Ok(Complex64::new(real(value, ty, exact)?, 0.0)),
        _ => Err(MarshalError::type_mismatch(ty, value.kind())),
    }
}

fn exact_f64(v: i128) -> Option<f64> {
    let f = v as f64;
    (f as i128 == v).then_some(f)
}

fn exact_f32(v: i128) -> Option<f64> {
    let f = v as f32;
    (f as i128 == v).then_some(f64::from(f))
}

/// Finite values that overflow single precision are rejected; infinities and
/// NaN pass through.
fn narrow(v: f64, ty: ScalarType) -> Result<f32> {
    let f = v as f32;
    if v.is_finite() && !f.is_finite() {
        return Err(MarshalError::out_of_range(ty, v));
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::HostArray;

    #[test]
    fn test_integer_widths_are_exact() {
        let slot = marshal(&ArgValue::Int(-5), &ScalarType::I16.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::I16(-5));

        let slot = marshal(&ArgValue::Int(200), &ScalarType::U8.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::U8(200));

        let slot = marshal(&ArgValue::UInt(u64::MAX), &ScalarType::U64.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::U64(u64::MAX));
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = marshal(&ArgValue::Int(300), &ScalarType::I8.into()).unwrap_err();
        assert_eq!(err, MarshalError::out_of_range(ScalarType::I8, 300));

        let err = marshal(&ArgValue::Int(-1), &ScalarType::U32.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::U32, .. }));
    }

    #[test]
    fn test_reals() {
        let slot = marshal(&ArgValue::Float(0.5), &ScalarType::F32.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F32(0.5));

        let slot = marshal(&ArgValue::Int(3), &ScalarType::F64.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F64(3.0));

        let err = marshal(&ArgValue::Complex(Complex64::new(1.0, 1.0)), &ScalarType::F64.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ArgumentTypeMismatch { .. }));
    }

    #[test]
    fn test_single_precision_overflow() {
        let err = marshal(&ArgValue::Float(1e300), &ScalarType::F32.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::F32, .. }));

        let value = ArgValue::Complex(Complex64::new(1.0, -1e300));
        let err = marshal(&value, &ScalarType::C64.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::C64, .. }));

        let slot = marshal(&ArgValue::Float(f64::INFINITY), &ScalarType::F32.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F32(f32::INFINITY));

        let slot = marshal(&ArgValue::Float(1e300), &ScalarType::F64.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F64(1e300));
    }

    #[test]
    fn test_inexact_integers_rejected() {
        let err = marshal(&ArgValue::Int((1 << 53) + 1), &ScalarType::F64.into()).unwrap_err();
        assert_eq!(err, MarshalError::out_of_range(ScalarType::F64, (1i64 << 53) + 1));

        let err = marshal(&ArgValue::UInt(u64::MAX), &ScalarType::F64.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::F64, .. }));

        let err = marshal(&ArgValue::Int((1 << 24) + 1), &ScalarType::F32.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::F32, .. }));

        let err = marshal(&ArgValue::Int((1 << 24) + 1), &ScalarType::C64.into()).unwrap_err();
        assert!(matches!(err, MarshalError::ValueOutOfRange { ty: ScalarType::C64, .. }));

        let slot = marshal(&ArgValue::Int(1 << 53), &ScalarType::F64.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F64(9007199254740992.0));

        let slot = marshal(&ArgValue::Int(-(1 << 24)), &ScalarType::F32.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::F32(-16777216.0));
    }

    #[test]
    fn test_complex_from_bare_real() {
        let slot = marshal(&ArgValue::Float(3.0), &ScalarType::C64.into()).unwrap();
        assert_eq!(*slot.cell(), NativeCell::C64(Complex32::new(3.0, 0.0)));

        let slot = marshal(&ArgValue::Float(3.0), &ScalarType::C128.into()).unwrap();
        let bytes = slot.cell().as_bytes();
        assert_eq!(&bytes[..8], &3.0f64.to_ne_bytes());
        assert_eq!(&bytes[8..], &0.0f64.to_ne_bytes());
    }

    #[test]
    fn test_complex_from_pair() {
        let value = ArgValue::Complex(Complex64::new(1.0, 2.0));
        let slot = marshal(&value, &ScalarType::C128.into()).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&1.0f64.to_ne_bytes());
        expected.extend_from_slice(&2.0f64.to_ne_bytes());
        assert_eq!(slot.cell().as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_array_rank_mismatch() {
        let data = [0f32; 8];
        let value = ArgValue::Array(HostArray::from_slice(&data, &[2, 4]).unwrap());

        let err = marshal(&value, &ArgType::array(ScalarType::F32, 3)).unwrap_err();
        assert_eq!(
            err,
            MarshalError::ShapeRankMismatch {
                declared: 3,
                observed: 2
            }
        );
    }

    #[test]
    fn test_array_dtype_mismatch() {
        let data = [0f32; 8];
        let value = ArgValue::Array(HostArray::from_slice(&data, &[8]).unwrap());

        let err = marshal(&value, &ArgType::array(ScalarType::F64, 1)).unwrap_err();
        assert_eq!(err, MarshalError::type_mismatch("array(float64, 1d)", "array(float32, 1d)"));
    }

    #[test]
    fn test_array_slot_owns_descriptor() {
        let data = [1i32, 2, 3, 4];
        let value = ArgValue::Array(HostArray::from_slice(&data, &[4]).unwrap());
        let slot = marshal(&value, &ArgType::array(ScalarType::I32, 1)).unwrap();

        let desc = slot.descriptor().unwrap();
        assert_eq!(desc.data(), data.as_ptr() as usize as u64);
        assert_eq!(desc.shape(), &[4]);
        assert_eq!(*slot.cell(), NativeCell::Address(desc.address()));
    }

    #[test]
    fn test_unsupported_types() {
        let err = marshal(&ArgValue::Bool(true), &ArgType::Boolean).unwrap_err();
        assert_eq!(err, MarshalError::UnsupportedArgumentType("bool".into()));

        let err = marshal(&ArgValue::Int(0), &ArgType::Opaque("Record".into())).unwrap_err();
        assert_eq!(err, MarshalError::UnsupportedArgumentType("Record".into()));
    }

    #[test]
    fn test_marshal_all_reports_failing_index() {
        let data = [0f32; 4];
        let values = [
            ArgValue::Int(1),
            ArgValue::Array(HostArray::from_slice(&data, &[4]).unwrap()),
        ];
        let types = [ScalarType::I32.into(), ArgType::array(ScalarType::F32, 2)];

        let (index, err) = marshal_all(&values, &types).unwrap_err();
        assert_eq!(index, 1);
        assert!(matches!(err, MarshalError::ShapeRankMismatch { .. }));
    }
}
