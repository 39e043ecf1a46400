//! Sunrise / sunset from the NOAA solar equations
//! (<https://gml.noaa.gov/grad/solcalc/solareqns.PDF>), in the
//! "difference from solar noon" form used by the NOAA spreadsheets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// Sun events for the calendar day `date` at the given position.
///
/// `None` during polar day or night, when the sun never crosses the horizon.
pub fn sun_times(date: NaiveDate, latitude: f64, longitude: f64) -> Option<SunTimes> {
    let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };

    // fractional year in radians, evaluated at noon
    let gamma = (2.0 * PI) * (date.ordinal0() as f64) / days_in_year;

    // equation of time, minutes
    let eqtime = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    // solar declination, radians
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let zenith: f64 = 90.833f64.to_radians();
    let lat = latitude.to_radians();
    let cos_ha = zenith.cos() / (lat.cos() * decl.cos()) - lat.tan() * decl.tan();
    if !(-1.0..=1.0).contains(&cos_ha) {
        return None;
    }
    let ha = cos_ha.acos().to_degrees();

    // minutes past UTC midnight
    let snoon = 720.0 - 4.0 * longitude - eqtime;
    let rise = snoon - 4.0 * ha;
    let set = snoon + 4.0 * ha;

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    let at = |minutes: f64| midnight + Duration::seconds((minutes * 60.0).round() as i64);

    Some(SunTimes {
        sunrise: at(rise),
        sunset: at(set),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn within_minutes(actual: DateTime<Utc>, expected: DateTime<Utc>, minutes: i64) -> bool {
        (actual - expected).num_minutes().abs() <= minutes
    }

    #[test]
    fn test_summer_solstice_edwardsville() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let times = sun_times(date, 38.78296, -89.93201).unwrap();

        // 05:33 and 20:30 CDT
        let sunrise = Utc.with_ymd_and_hms(2024, 6, 21, 10, 33, 0).unwrap();
        let sunset = Utc.with_ymd_and_hms(2024, 6, 22, 1, 30, 0).unwrap();
        assert!(within_minutes(times.sunrise, sunrise, 4), "{}", times.sunrise);
        assert!(within_minutes(times.sunset, sunset, 4), "{}", times.sunset);
        assert!(times.sunrise < times.sunset);
    }

    #[test]
    fn test_days_are_longer_in_summer() {
        let summer = sun_times(NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(), 38.8, -89.9).unwrap();
        let winter = sun_times(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap(), 38.8, -89.9).unwrap();
        assert!(summer.sunset - summer.sunrise > winter.sunset - winter.sunrise);
    }

    #[test]
    fn test_polar_day_has_no_sunrise() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        assert_eq!(sun_times(date, 80.0, 15.0), None);
    }
}
