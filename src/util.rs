// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Keyword tables for string-valued modparams.

pub type LookupTable<T> = [(&'static str, T)];

pub fn lookup_ignore_case<T: Copy>(table: &LookupTable<T>, key: &str) -> Option<T> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    static SENSORS: &LookupTable<i32> = &[
        ("Pt100", 0),
        ("Ni100", 1),
        ("Pt1000", 2),
        ("Pt500", 3),
        ("Pt200", 4),
        ("Ni1000", 5),
        ("Ni1000-TK5000", 6),
        ("Ni120", 7),
        ("Ohm/16", 8),
        ("Ohm/64", 9),
    ];

    static SCALES: &LookupTable<f64> = &[("Ohm/16", 1.0 / 16.0), ("Ohm/64", 1.0 / 64.0)];

    #[test]
    fn ignoring_case() {
        assert_eq!(lookup_ignore_case(SENSORS, "Pt100"), Some(0));
        assert_eq!(lookup_ignore_case(SENSORS, "pt100"), Some(0));
        assert_eq!(lookup_ignore_case(SENSORS, "NI1000-tk5000"), Some(6));
        assert_eq!(lookup_ignore_case(SENSORS, "Pt101"), None);
        assert_eq!(lookup_ignore_case(SCALES, "ohm/64"), Some(1.0 / 64.0));
    }
}
