//! Unit conversion table.
//!
//! Units in the same group convert into each other through a fixed factor
//! relative to the group's canonical unit. Units outside the table only
//! combine with identical units.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
}

/// Amount of the canonical unit in one of `unit`.
fn canonical(unit: &str) -> Option<(Group, f64)> {
    let entry = match unit {
        "in" => (Group::Length, 1.0),
        "cm" => (Group::Length, 1.0 / 2.54),
        "mm" => (Group::Length, 1.0 / 25.4),
        "pc" => (Group::Length, 1.0 / 6.0),
        "pt" => (Group::Length, 1.0 / 72.0),
        "px" => (Group::Length, 1.0 / 96.0),
        "deg" => (Group::Angle, 1.0),
        "grad" => (Group::Angle, 0.9),
        "rad" => (Group::Angle, 180.0 / std::f64::consts::PI),
        "turn" => (Group::Angle, 360.0),
        "s" => (Group::Time, 1.0),
        "ms" => (Group::Time, 0.001),
        "Hz" => (Group::Frequency, 1.0),
        "kHz" => (Group::Frequency, 1000.0),
        "dpi" => (Group::Resolution, 1.0),
        "dpcm" => (Group::Resolution, 2.54),
        "dppx" => (Group::Resolution, 96.0),
        _ => return None,
    };
    Some(entry)
}

/// Whether `unit` appears in the conversion table.
pub fn is_convertible(unit: &str) -> bool {
    canonical(unit).is_some()
}

/// Factor to multiply a value in `from` by to express it in `to`.
///
/// Returns `None` when the units are in different groups or either is not
/// in the table (identical units always convert with factor `1`).
pub fn conversion_factor(from: &str, to: &str) -> Option<f64> {
    if from == to {
        return Some(1.0);
    }
    let (from_group, from_factor) = canonical(from)?;
    let (to_group, to_factor) = canonical(to)?;
    (from_group == to_group).then(|| from_factor / to_factor)
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_length_conversions() {
        let factor = conversion_factor("in", "px").unwrap();
        assert!(approx_eq!(f64, factor, 96.0, epsilon = 1e-9));
        let factor = conversion_factor("cm", "mm").unwrap();
        assert!(approx_eq!(f64, factor, 10.0, epsilon = 1e-9));
    }

    #[test]
    fn test_cross_group_is_not_convertible() {
        assert_eq!(conversion_factor("px", "s"), None);
        assert_eq!(conversion_factor("em", "px"), None);
        assert_eq!(conversion_factor("em", "em"), Some(1.0));
    }
}
