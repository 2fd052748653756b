//! The ordered set of celestial bodies a job may draw from.

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

/// Bodies used when nothing else is configured, in processing order.
pub const DEFAULT_OBJECTS: [&str; 6] = ["Earth", "Saturn", "Venus", "Mars", "Jupiter", "Moon"];

/// Ordered list of object names.
///
/// A job of size `n` always processes the first `n` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    objects: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            objects: DEFAULT_OBJECTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Catalog {
    /// Build a catalog from explicit names. Blank names are dropped; an empty
    /// result is rejected.
    pub fn new<I, S>(objects: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let objects: Vec<String> = objects
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if objects.is_empty() {
            return Err(DomainError::validation("catalog must contain at least one object"));
        }

        Ok(Self { objects })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    /// The first `n` objects.
    ///
    /// Out-of-range counts are rejected, never clamped: `n` must lie in
    /// `1..=len()`.
    pub fn select(&self, n: usize) -> DomainResult<&[String]> {
        if n == 0 || n > self.objects.len() {
            return Err(DomainError::validation(format!(
                "n must be between 1 and {}, got {n}",
                self.objects.len()
            )));
        }
        Ok(&self.objects[..n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_six_bodies_in_order() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.objects()[0], "Earth");
        assert_eq!(catalog.objects()[5], "Moon");
    }

    #[test]
    fn select_returns_prefix() {
        let catalog = Catalog::default();
        assert_eq!(catalog.select(2).unwrap(), ["Earth", "Saturn"]);
        assert_eq!(catalog.select(6).unwrap().len(), 6);
    }

    #[test]
    fn select_rejects_zero_and_overflow() {
        let catalog = Catalog::default();
        assert!(matches!(catalog.select(0), Err(DomainError::Validation(_))));
        assert!(matches!(catalog.select(7), Err(DomainError::Validation(_))));
    }

    #[test]
    fn new_trims_and_rejects_empty() {
        let catalog = Catalog::new([" Mars ", "", "Moon"]).unwrap();
        assert_eq!(catalog.objects(), ["Mars", "Moon"]);

        assert!(Catalog::new(Vec::<String>::new()).is_err());
        assert!(Catalog::new(["  "]).is_err());
    }
}
