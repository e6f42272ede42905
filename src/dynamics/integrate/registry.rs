//! Registry pattern for looking up solvers by name
//!
//! Each solver is self-describing, providing its own name, aliases and
//! convergence order. The registry queries this metadata on registration to
//! build its lookup table. Solvers are zero-sized, so handing one out is just
//! a new `Box`.

use super::tableau::Solver;
use crate::error::{Error, Result};
use bevy::log::trace;
use std::collections::{BTreeSet, HashMap};

/// Maps canonical names and aliases to solver instances
#[derive(Clone, Debug, Default)]
pub struct SolverRegistry {
    solvers: HashMap<String, Box<dyn Solver>>,
}

impl SolverRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in embedded Runge-Kutta solvers
    pub fn with_standard_solvers(mut self) -> Self {
        use super::tableau::{Bosh3, Dopri5, Fehlberg45, HeunEuler};

        self.register(Box::new(Dopri5));
        self.register(Box::new(Bosh3));
        self.register(Box::new(HeunEuler));
        self.register(Box::new(Fehlberg45));

        self
    }

    /// Register a single solver, returning self for chaining
    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.register(solver);
        self
    }

    pub fn register(&mut self, solver: Box<dyn Solver>) {
        for alias in solver.aliases() {
            self.solvers.insert(alias.to_string(), solver.clone_box());
        }
        self.solvers.insert(solver.name().to_string(), solver);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Solver>> {
        trace!("Looking up solver '{}'", name);
        self.solvers
            .get(name)
            .map(|solver| solver.clone_box())
            .ok_or_else(|| {
                let aliases: Vec<String> = self
                    .list_aliases()
                    .into_iter()
                    .map(|(alias, _)| alias)
                    .collect();
                Error::UnknownSolver {
                    name: name.to_string(),
                    available: self.list_available().join(", "),
                    aliases: aliases.join(", "),
                }
            })
    }

    /// Canonical names, sorted
    pub fn list_available(&self) -> Vec<String> {
        self.solvers
            .values()
            .map(|solver| solver.name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// `(alias, canonical)` pairs, sorted by alias
    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .solvers
            .iter()
            .filter(|(key, solver)| key.as_str() != solver.name())
            .map(|(key, solver)| (key.clone(), solver.name().to_string()))
            .collect();
        aliases.sort();
        aliases
    }
}
