use arrow::array::Float64Array;

/// Quantile with linear interpolation between closest ranks (position
/// `q * (n - 1)`), ignoring nulls and NaN. `None` on an empty input.
pub fn quantile(values: &Float64Array, q: f64) -> Option<f64> {
    let mut v: Vec<f64> = values.iter().flatten().filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(lerp(v[lo], v[hi], pos - lo as f64))
}

// Interpolate from the nearer end so equal neighbours give exact results.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates() {
        let v = Float64Array::from(vec![Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)]);
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        let q = quantile(&v, 0.999).unwrap();
        assert!((q - 3.997).abs() < 1e-12);
    }

    #[test]
    fn ties_at_the_top_are_exact() {
        let v = Float64Array::from(vec![10.0, 20.0, 30.0, 30.0]);
        assert_eq!(quantile(&v, 0.999), Some(30.0));
    }

    #[test]
    fn empty_is_none() {
        let v = Float64Array::from(vec![None::<f64>, None]);
        assert_eq!(quantile(&v, 0.5), None);
    }
}
