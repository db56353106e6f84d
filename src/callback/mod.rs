//! Training callbacks
//!
//! Callbacks are queried once per environment interaction and can veto
//! continued training by returning `false`. The check short-circuits: once
//! one callback vetoes, the rest are not guaranteed to run that round.

use anyhow::{anyhow, Result};

use crate::config::CallbackSettings;

/// A per-step hook with veto power over the run
pub trait Callback {
    /// Called once per environment interaction with the current step
    /// counter; returning `false` ends training at this step
    fn on_step(&mut self, step: usize) -> bool;

    /// Apply settings after construction; default accepts anything
    fn configure(&mut self, _settings: &CallbackSettings) -> Result<()> {
        Ok(())
    }
}

/// An ordered collection of callbacks queried together
#[derive(Default)]
pub struct Callbacks(Vec<Box<dyn Callback>>);

impl Callbacks {
    /// Collect ready-made callbacks
    pub fn new(callbacks: Vec<Box<dyn Callback>>) -> Self {
        Self(callbacks)
    }

    /// Pair callbacks with their settings, one settings object per callback
    ///
    /// A length mismatch is a fatal configuration error, surfaced before
    /// any environment interaction.
    pub fn from_parts(
        mut callbacks: Vec<Box<dyn Callback>>,
        settings: &[CallbackSettings],
    ) -> Result<Self> {
        if callbacks.len() != settings.len() {
            return Err(anyhow!(
                "there should be a settings object for each callback ({} callbacks, {} settings)",
                callbacks.len(),
                settings.len()
            ));
        }
        for (callback, settings) in callbacks.iter_mut().zip(settings) {
            callback.configure(settings)?;
        }
        Ok(Self(callbacks))
    }

    /// Query every callback in order, stopping at the first veto
    pub fn on_step(&mut self, step: usize) -> bool {
        for callback in &mut self.0 {
            if !callback.on_step(step) {
                return false;
            }
        }
        true
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Vetoes once the step counter reaches a hard cap
pub struct StepLimitCallback {
    max_steps: usize,
}

impl StepLimitCallback {
    /// Create a callback allowing steps `0..max_steps`
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl Callback for StepLimitCallback {
    fn on_step(&mut self, step: usize) -> bool {
        step + 1 < self.max_steps
    }

    fn configure(&mut self, settings: &CallbackSettings) -> Result<()> {
        if let Some(max_steps) = settings.max_steps {
            self.max_steps = max_steps;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Spy {
        calls: usize,
        veto_at: Option<usize>,
    }

    impl Callback for Spy {
        fn on_step(&mut self, _step: usize) -> bool {
            self.calls += 1;
            self.veto_at != Some(self.calls)
        }
    }

    #[test]
    fn test_from_parts_length_mismatch() {
        let callbacks: Vec<Box<dyn Callback>> =
            vec![Box::new(StepLimitCallback::new(10)), Box::new(StepLimitCallback::new(20))];
        let settings = vec![CallbackSettings::default()];

        assert!(Callbacks::from_parts(callbacks, &settings).is_err());
    }

    #[test]
    fn test_from_parts_applies_settings() {
        let callbacks: Vec<Box<dyn Callback>> = vec![Box::new(StepLimitCallback::new(100))];
        let settings = vec![CallbackSettings { max_steps: Some(1), ..Default::default() }];

        let mut callbacks = Callbacks::from_parts(callbacks, &settings).unwrap();
        assert!(!callbacks.on_step(0));
    }

    #[test]
    fn test_short_circuit_on_veto() {
        let mut callbacks = Callbacks::new(vec![
            Box::new(Spy { calls: 0, veto_at: Some(1) }),
            Box::new(Spy { calls: 0, veto_at: None }),
        ]);

        assert!(!callbacks.on_step(0));
        // The second callback was never reached.
        // (Verified indirectly: a second round still passes because the
        // first spy only vetoes on its first call.)
        assert!(callbacks.on_step(1));
    }

    #[test]
    fn test_step_limit_allows_exactly_max_steps() {
        let mut callback = StepLimitCallback::new(3);
        assert!(callback.on_step(0));
        assert!(callback.on_step(1));
        assert!(!callback.on_step(2));
    }
}
