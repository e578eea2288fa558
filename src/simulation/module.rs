//! Device module contract and the insertion-ordered registry.

use crate::domain::{BuildingEnvelope, HouseState, ModuleConfig, ModuleKind};
use crate::error::{ModuleError, SimulationError};

/// One device's effect on the house for a single timestep.
///
/// Implementations mutate `state` in place. A missing or mismatched config
/// slice falls back to the device defaults.
pub trait SimulationModule: Send + Sync {
    fn name(&self) -> ModuleKind;

    fn simulate(
        &self,
        state: &mut HouseState,
        timestep_hours: f64,
        config: Option<&ModuleConfig>,
    ) -> Result<(), ModuleError>;
}

/// Reject NaN/inf before it spreads through the state
pub(crate) fn ensure_finite(
    module: ModuleKind,
    field: &'static str,
    value: f64,
) -> Result<f64, ModuleError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModuleError::NonFiniteInput {
            module,
            field,
            value,
        })
    }
}

/// Lumped thermal mass (kWh/K) of a usable envelope
pub(crate) fn thermal_proxy(
    module: ModuleKind,
    envelope: &BuildingEnvelope,
) -> Result<f64, ModuleError> {
    let floor_area = ensure_finite(module, "envelope.floor_area", envelope.floor_area)?;
    if floor_area <= 0.0 {
        return Err(ModuleError::InvalidEnvelope {
            module,
            reason: format!("floor area must be positive, got {floor_area}"),
        });
    }
    Ok(envelope.thermal_proxy_kwh_per_k())
}

pub struct RegisteredModule {
    pub name: ModuleKind,
    pub enabled: bool,
    module: Box<dyn SimulationModule>,
}

impl RegisteredModule {
    pub fn module(&self) -> &dyn SimulationModule {
        self.module.as_ref()
    }
}

impl std::fmt::Debug for RegisteredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModule")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Modules keyed by name, executed in registration order
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: Vec<RegisteredModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the module's own name
    pub fn register(&mut self, module: Box<dyn SimulationModule>) -> Result<(), SimulationError> {
        let name = module.name();
        self.register_as(name, module)
    }

    /// Register into an explicit slot. The slot must match the module's name
    /// by the time the registry is verified.
    pub fn register_as(
        &mut self,
        name: ModuleKind,
        module: Box<dyn SimulationModule>,
    ) -> Result<(), SimulationError> {
        if self.contains(name) {
            return Err(SimulationError::DuplicateModule(name));
        }
        self.entries.push(RegisteredModule {
            name,
            enabled: true,
            module,
        });
        Ok(())
    }

    pub fn contains(&self, name: ModuleKind) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn is_enabled(&self, name: ModuleKind) -> bool {
        self.entries.iter().any(|e| e.name == name && e.enabled)
    }

    pub fn set_enabled(&mut self, name: ModuleKind, enabled: bool) -> Result<(), SimulationError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or(SimulationError::UnknownModule(name))?;
        entry.enabled = enabled;
        Ok(())
    }

    /// Flip a module's flag, returning the new value
    pub fn toggle(&mut self, name: ModuleKind) -> Result<bool, SimulationError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or(SimulationError::UnknownModule(name))?;
        entry.enabled = !entry.enabled;
        Ok(entry.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.entries.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &RegisteredModule> {
        self.entries.iter().filter(|e| e.enabled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Every slot must hold the module it is named after
    pub fn verify(&self) -> Result<(), SimulationError> {
        for entry in &self.entries {
            let actual = entry.module.name();
            if actual != entry.name {
                return Err(SimulationError::RegistryCorrupted(format!(
                    "slot {} holds module {}",
                    entry.name, actual
                )));
            }
        }
        Ok(())
    }
}
