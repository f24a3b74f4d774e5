use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

/// Formats with one decimal, the way pie slices are labelled.
impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || !value.is_finite() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    /// Share of `part` in `whole`. An empty whole has no meaningful share.
    pub fn share(part: f64, whole: f64) -> Option<Percentage> {
        if whole <= 0. {
            return None;
        }
        Percentage::new_opt(part / whole * 100.)
    }
}

#[cfg(test)]
mod tests {
    use super::Percentage;

    #[test]
    fn test_share() {
        let p = Percentage::share(7., 21.).unwrap();
        assert_eq!(p.to_string(), "33.3%");
        assert!(Percentage::share(1., 0.).is_none());
        assert!(Percentage::share(-1., 3.).is_none());
    }
}
