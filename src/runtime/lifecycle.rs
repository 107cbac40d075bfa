//! Per-instance lifecycle.
//!
//! ```text
//!                before_mount  after_mount
//! Uninitialized ─────────────► ───────────► Mounted ◄──────────┐
//!                                             │  before_update  │ after_update
//!                                             ├──────────► Updating
//!                                             │ before_unmount
//!                                             ▼
//!                                         Unmounting ──unmounted──► Unmounted
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Uninitialized,
    Mounted,
    Updating,
    Unmounting,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeMount,
    AfterMount,
    BeforeUpdate,
    AfterUpdate,
    BeforeUnmount,
    Unmounted,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{hook:?}` is not valid in state `{state:?}`")]
pub struct LifecycleError {
    pub state: LifeState,
    pub hook: Hook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    state: LifeState,
    mounting: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: LifeState::Uninitialized,
            mounting: false,
        }
    }

    pub const fn state(&self) -> LifeState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, LifeState::Mounted | LifeState::Updating)
    }

    pub fn apply(&mut self, hook: Hook) -> Result<LifeState, LifecycleError> {
        use LifeState::*;
        let next = match (self.state, hook) {
            (Uninitialized, Hook::BeforeMount) if !self.mounting => {
                self.mounting = true;
                Uninitialized
            }
            (Uninitialized, Hook::AfterMount) if self.mounting => {
                self.mounting = false;
                Mounted
            }
            (Mounted, Hook::BeforeUpdate) => Updating,
            (Updating, Hook::AfterUpdate) => Mounted,
            (Mounted | Updating, Hook::BeforeUnmount) => Unmounting,
            (Unmounting, Hook::Unmounted) => Unmounted,
            (state, hook) => return Err(LifecycleError { state, hook }),
        };
        self.state = next;
        Ok(next)
    }

    /// `before_mount` + `after_mount`
    pub fn mount(&mut self) -> Result<(), LifecycleError> {
        self.apply(Hook::BeforeMount)?;
        self.apply(Hook::AfterMount)?;
        Ok(())
    }

    /// `before_update` + `after_update`
    pub fn update(&mut self) -> Result<(), LifecycleError> {
        self.apply(Hook::BeforeUpdate)?;
        self.apply(Hook::AfterUpdate)?;
        Ok(())
    }

    /// `before_unmount` + completion
    pub fn unmount(&mut self) -> Result<(), LifecycleError> {
        self.apply(Hook::BeforeUnmount)?;
        self.apply(Hook::Unmounted)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut lc = Lifecycle::new();
        lc.mount().unwrap();
        assert_eq!(lc.state(), LifeState::Mounted);
        lc.update().unwrap();
        assert!(lc.is_live());
        lc.unmount().unwrap();
        assert_eq!(lc.state(), LifeState::Unmounted);
    }

    #[test]
    fn test_update_before_mount_rejected() {
        let mut lc = Lifecycle::new();
        assert_eq!(
            lc.apply(Hook::BeforeUpdate),
            Err(LifecycleError {
                state: LifeState::Uninitialized,
                hook: Hook::BeforeUpdate
            })
        );
    }

    #[test]
    fn test_after_mount_needs_before_mount() {
        let mut lc = Lifecycle::new();
        assert!(lc.apply(Hook::AfterMount).is_err());
        lc.apply(Hook::BeforeMount).unwrap();
        assert!(lc.apply(Hook::BeforeMount).is_err());
        assert_eq!(lc.apply(Hook::AfterMount), Ok(LifeState::Mounted));
    }

    #[test]
    fn test_unmount_during_update() {
        let mut lc = Lifecycle::new();
        lc.mount().unwrap();
        lc.apply(Hook::BeforeUpdate).unwrap();
        assert_eq!(lc.apply(Hook::BeforeUnmount), Ok(LifeState::Unmounting));
    }

    #[test]
    fn test_unmounted_is_terminal() {
        let mut lc = Lifecycle::new();
        lc.mount().unwrap();
        lc.unmount().unwrap();
        assert!(lc.mount().is_err());
        assert!(lc.update().is_err());
    }
}
