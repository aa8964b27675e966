use ipdriver_core::{DesignVector, Gradients};

/// The derivatives most recently computed, keyed by the design vector they
/// were computed at.
///
/// An entry is only ever returned for a vector equal to its key.
#[derive(Debug, Default)]
pub(super) struct GradientCache {
    entry: Option<Entry>,
}

#[derive(Debug)]
pub(super) struct Entry {
    key: DesignVector,
    pub(super) gradients: Gradients,

    /// Jacobian values packed in sparsity order.
    pub(super) packed: Vec<f64>,
}

impl GradientCache {
    /// Returns `true` if the cache holds derivatives for `x`.
    pub(super) fn holds(&self, x: &[f64]) -> bool {
        self.entry.as_ref().is_some_and(|entry| entry.key.matches(x))
    }

    /// Drops the entry unless it was computed at `x`.
    pub(super) fn retain_for(&mut self, x: &[f64]) {
        if !self.holds(x) {
            self.entry = None;
        }
    }

    /// Returns the entry for `x`, computing and storing it on a miss.
    ///
    /// The flag is `true` on a cache hit.
    pub(super) fn get_or_try_insert_with<E, F>(
        &mut self,
        x: &[f64],
        compute: F,
    ) -> Result<(&Entry, bool), E>
    where
        F: FnOnce() -> Result<(Gradients, Vec<f64>), E>,
    {
        // A failed computation must not leave a stale entry behind.
        let (entry, hit) = match self.entry.take() {
            Some(entry) if entry.key.matches(x) => (entry, true),
            _ => {
                let (gradients, packed) = compute()?;
                let entry = Entry {
                    key: DesignVector::from(x),
                    gradients,
                    packed,
                };
                (entry, false)
            }
        };
        Ok((&*self.entry.insert(entry), hit))
    }
}
