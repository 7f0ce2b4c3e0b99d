//! Helpers de fechas para el motor de dispatch
//!
//! Las semanas corren de lunes a domingo y los días preferidos se
//! codifican 0-6 con 0 = lunes. Todos los timestamps son UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// Lunes de la semana que contiene la fecha dada
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Índice de día de semana 0-6 (0 = lunes)
pub fn weekday_index(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_monday() as i16
}

/// Instante de inicio del turno: fecha del assignment + hora de inicio de la ruta
pub fn shift_start(date: NaiveDate, route_start: NaiveTime) -> DateTime<Utc> {
    date.and_time(route_start).and_utc()
}

/// Meses de antigüedad (meses de 30 días) entre dos instantes
pub fn tenure_months(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - since).num_days().max(0) as f64;
    days / 30.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        // 2026-08-06 es jueves
        let thursday = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        assert_eq!(week_start(thursday), monday);
        assert_eq!(week_start(monday), monday);
        // el domingo pertenece a la semana que abrió el lunes anterior
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 9).unwrap();
        assert_eq!(week_start(sunday), monday);
    }

    #[test]
    fn test_weekday_index_monday_zero() {
        let monday = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 9).unwrap();
        assert_eq!(weekday_index(monday), 0);
        assert_eq!(weekday_index(sunday), 6);
    }

    #[test]
    fn test_shift_start_combines_date_and_route_time() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let start = NaiveTime::from_hms_opt(7, 30, 0).unwrap();
        let ts = shift_start(date, start);
        assert_eq!(ts.to_rfc3339(), "2026-08-05T07:30:00+00:00");
    }

    #[test]
    fn test_tenure_months() {
        let since = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let now = DateTime::parse_from_rfc3339("2026-08-28T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let months = tenure_months(since, now);
        assert!(months > 7.9 && months < 8.1);
    }
}
