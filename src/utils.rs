#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1, PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
use crate::dml::core::options::{TrimRule, Trimming};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Extract a 1-D float array into an owned `Array1<f64>`.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// Extract a treatment column as small categorical codes.
///
/// Accepts integer or float input; every entry must be a non-negative
/// integer below 256.
#[cfg(feature = "python-bindings")]
pub fn extract_treatment_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<u8>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<i64>>() {
        if let Ok(slice) = arr_ro.as_slice() {
            return codes_from_iter(slice.iter().map(|&v| v as f64), name);
        }
    }
    let values = extract_f64_vector(py, raw_data, name)?;
    codes_from_iter(values.iter().copied(), name)
}

#[cfg(feature = "python-bindings")]
fn codes_from_iter(values: impl Iterator<Item = f64>, name: &str) -> PyResult<Array1<u8>> {
    let mut codes = Vec::new();
    for (index, value) in values.enumerate() {
        if !value.is_finite() || value.fract() != 0.0 || !(0.0..256.0).contains(&value) {
            return Err(PyValueError::new_err(format!(
                "{name} must contain integer treatment codes in [0, 255]; index {index} is {value}"
            )));
        }
        codes.push(value as u8);
    }
    Ok(Array1::from(codes))
}

/// Extract a 2-D float matrix; `None` yields an `n × 0` matrix (no
/// intermediate covariates).
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(
    raw_data: Option<&Bound<'py, PyAny>>, n_rows: usize, name: &str,
) -> PyResult<Array2<f64>> {
    let raw = match raw_data {
        None => return Ok(Array2::zeros((n_rows, 0))),
        Some(raw) => raw,
    };
    if let Ok(arr_ro) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(arr_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(arr_ro.as_array().to_owned());
        }
    }
    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name} must be a 2-D numpy.ndarray, pandas.DataFrame, or sequence of float64 rows"
        ))
    })?;
    let n = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    let mut matrix = Array2::<f64>::zeros((n, width));
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(PyValueError::new_err(format!("{name} rows have inconsistent lengths")));
        }
        for (j, &value) in row.iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    Ok(matrix)
}

/// Parse a trimming policy from Python-friendly arguments.
#[cfg(feature = "python-bindings")]
pub fn extract_trimming(rule: Option<&str>, threshold: Option<f64>) -> PyResult<Trimming> {
    let rule = match rule.unwrap_or("clip").to_lowercase().as_str() {
        "clip" => TrimRule::Clip,
        "drop" | "drop_unit" => TrimRule::DropUnit,
        other => {
            return Err(PyValueError::new_err(format!(
                "invalid trimming rule {other:?} (expected 'clip' or 'drop')"
            )));
        }
    };
    let trimming = Trimming::new(rule, threshold.unwrap_or(0.01))?;
    Ok(trimming)
}
