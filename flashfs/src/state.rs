//! Mount state of a session.

/// Whether the engine currently holds a mounted filesystem.
///
/// Sessions move `Unmounted -> Mounted -> Unmounted` and may be mounted again
/// afterwards.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountState {
    /// No filesystem is mounted.
    #[default]
    Unmounted,
    /// The engine holds a mounted filesystem.
    Mounted,
}

impl MountState {
    /// Check if the session is mounted.
    #[inline]
    pub const fn is_mounted(&self) -> bool {
        matches!(self, MountState::Mounted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_state_checks() {
        assert!(MountState::Mounted.is_mounted());
        assert!(!MountState::Unmounted.is_mounted());
    }

    #[test]
    fn test_mount_state_default() {
        assert_eq!(MountState::default(), MountState::Unmounted);
    }
}
