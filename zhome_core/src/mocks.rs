//! Helper collaborators for zhome_core

use zhome_traits::{BoxError, PreHomeScript};

/// A pre-home script that does nothing; the default when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScript;

impl PreHomeScript for NoopScript {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}
