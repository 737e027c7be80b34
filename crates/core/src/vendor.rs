//! Company-attribute filtering.

/// Company-attribute substrings that mark an assembly as part of the vendor
/// family. Matching is case-insensitive.
pub const VENDOR_FAMILY: [&str; 4] = ["IQVIA", "IMS", "Cegedim", "Quintile"];

/// Decides whether an assembly belongs to the tracked vendor family based on
/// the text of its company attribute.
///
/// A missing attribute, a missing constructor argument, or any failure while
/// reading attributes all count as "not ours"; the filter never errors.
#[derive(Debug, Clone)]
pub struct VendorFilter {
    needles: Vec<String>,
}

impl VendorFilter {
    /// Filter over the built-in [`VENDOR_FAMILY`] needles.
    pub fn vendor_family() -> Self {
        Self::new(VENDOR_FAMILY)
    }

    /// Filter over a caller-supplied needle set.
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = needles.into_iter().map(|n| n.as_ref().to_lowercase()).collect();
        Self { needles }
    }

    /// True iff the company text contains one of the needles,
    /// case-insensitively. `None` is never valid.
    pub fn is_valid(&self, company: Option<&str>) -> bool {
        let Some(text) = company else { return false };
        let text = text.to_lowercase();
        self.needles.iter().any(|needle| text.contains(needle.as_str()))
    }
}

impl Default for VendorFilter {
    fn default() -> Self {
        Self::vendor_family()
    }
}
