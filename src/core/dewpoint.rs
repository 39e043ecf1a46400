//! Dewpoint from air temperature and relative humidity.
//!
//! Magnus-Tetens approximation with the constants
//! `A = 17.27`, `B = 237.7 °C`, good to a few tenths of a degree over
//! ordinary surface conditions.

const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

pub fn f_to_c(temp_f: f64) -> f64 {
    (temp_f - 32.0) * 5.0 / 9.0
}

pub fn c_to_f(temp_c: f64) -> f64 {
    temp_c * 9.0 / 5.0 + 32.0
}

/// Dewpoint in °C. `None` when humidity is outside (0, 100] or inputs are not finite.
pub fn dew_point_c(temp_c: f64, rel_humidity: f64) -> Option<f64> {
    if !temp_c.is_finite() || !rel_humidity.is_finite() {
        return None;
    }
    if rel_humidity <= 0.0 || rel_humidity > 100.0 {
        return None;
    }

    let alpha = (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c) + (rel_humidity / 100.0).ln();
    Some((MAGNUS_B * alpha) / (MAGNUS_A - alpha))
}

/// Dewpoint in °F for an air temperature in °F.
pub fn dew_point_f(temp_f: f64, rel_humidity: f64) -> Option<f64> {
    dew_point_c(f_to_c(temp_f), rel_humidity).map(c_to_f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_saturated_air_dewpoint_equals_temperature() {
        for t in [-10.0, 32.0, 68.0, 95.0] {
            let dp = dew_point_f(t, 100.0).unwrap();
            assert!(close(dp, t, 1e-9), "t={} dp={}", t, dp);
        }
    }

    #[test]
    fn test_known_values() {
        // 20 °C at 50 % -> ~9.3 °C
        assert!(close(dew_point_c(20.0, 50.0).unwrap(), 9.26, 0.05));
        // 86 °F at 70 % -> ~75.0 °F
        assert!(close(dew_point_f(86.0, 70.0).unwrap(), 75.05, 0.05));
        // 50 °F at 30 % -> ~19.8 °F
        assert!(close(dew_point_f(50.0, 30.0).unwrap(), 19.80, 0.05));
    }

    #[test]
    fn test_dewpoint_never_exceeds_temperature() {
        let mut rh = 1.0;
        while rh <= 100.0 {
            let dp = dew_point_f(72.0, rh).unwrap();
            assert!(dp <= 72.0 + 1e-9);
            rh += 7.5;
        }
    }

    #[test]
    fn test_out_of_range_humidity() {
        assert_eq!(dew_point_f(70.0, 0.0), None);
        assert_eq!(dew_point_f(70.0, -5.0), None);
        assert_eq!(dew_point_f(70.0, 100.5), None);
        assert_eq!(dew_point_f(f64::NAN, 50.0), None);
    }

    #[test]
    fn test_unit_conversions() {
        assert!(close(f_to_c(212.0), 100.0, 1e-12));
        assert!(close(c_to_f(-40.0), -40.0, 1e-12));
    }
}
