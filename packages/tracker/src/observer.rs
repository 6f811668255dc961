use crate::resource::ObservedLoadState;

/// Read-only view of the host's document windows.
///
/// Implemented by the automation harness. Methods take `&mut self` so that
/// implementations may cache snapshots or count polls.
pub trait ResourceObserver {
    /// Current load state of the window captioned `identity`.
    fn observe(&mut self, identity: &str) -> ObservedLoadState;

    /// Captions of every window the host currently exposes. Only used to
    /// recover entries whose caption changed since registration.
    fn observable_names(&mut self) -> Vec<String>;
}

impl<T: ResourceObserver + ?Sized> ResourceObserver for &mut T {
    fn observe(&mut self, identity: &str) -> ObservedLoadState {
        (**self).observe(identity)
    }

    fn observable_names(&mut self) -> Vec<String> {
        (**self).observable_names()
    }
}
