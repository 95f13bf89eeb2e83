use std::{fmt::Display, ops::Deref};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.round())
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

    pub fn zero() -> Percentage {
        Percentage(0.)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `value` in `whole`. Nothing out of nothing is 0%.
pub fn minutes_percentage(value: f64, whole: f64) -> Percentage {
    if whole <= 0. {
        return Percentage::zero();
    }
    Percentage::new_opt(value / whole * 100.).unwrap_or_else(Percentage::zero)
}

#[cfg(test)]
mod tests {
    use super::minutes_percentage;

    #[test]
    fn percentage_of_whole() {
        assert_eq!(*minutes_percentage(1., 4.), 25.);
        assert_eq!(minutes_percentage(2., 3.).to_string(), "67%");
        assert_eq!(*minutes_percentage(5., 0.), 0.);
    }
}
