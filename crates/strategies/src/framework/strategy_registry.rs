//! Strategy registry
//!
//! Name-keyed lookup of the active strategies. Names are stored lower-case so
//! lookups are case-insensitive.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use quant_pilot_core::SignalSettings;

use super::StrategyKind;
use crate::error::StrategyError;

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: RwLock<BTreeMap<String, Arc<StrategyKind>>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the strategies named in `names`
    pub fn from_names(names: &[String], settings: &SignalSettings) -> Result<Self, StrategyError> {
        let registry = Self::new();
        for name in names {
            registry.register(StrategyKind::from_name(name, settings)?);
        }
        info!("strategy registry ready: {:?}", registry.list_strategies());
        Ok(registry)
    }

    // A panic while holding the lock cannot leave the map half-written, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<StrategyKind>>> {
        self.strategies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<StrategyKind>>> {
        self.strategies.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers `strategy`, replacing one with the same name
    pub fn register(&self, strategy: StrategyKind) {
        let name = strategy.name().to_string();
        let mut strategies = self.write();
        if strategies.contains_key(&name) {
            warn!("strategy {} already registered, replacing", name);
        }
        strategies.insert(name.clone(), Arc::new(strategy));
        info!("strategy registered: {}", name);
    }

    pub fn get(&self, name: &str) -> Result<Arc<StrategyKind>, StrategyError> {
        self.read()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| StrategyError::UnknownStrategy(name.to_string()))
    }

    /// Registered strategies in name order
    pub fn all(&self) -> Vec<Arc<StrategyKind>> {
        self.read().values().cloned().collect()
    }

    pub fn list_strategies(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(&name.to_lowercase())
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<StrategyKind>> {
        let removed = self.write().remove(&name.to_lowercase());
        if removed.is_some() {
            info!("strategy removed: {}", name);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup_case_insensitive() {
        let registry = StrategyRegistry::from_names(
            &["Momentum".to_string(), "mean_reversion".to_string()],
            &SignalSettings::default(),
        )
        .unwrap();

        assert_eq!(registry.count(), 2);
        assert!(registry.contains("MOMENTUM"));
        assert_eq!(registry.get("Mean_Reversion").unwrap().name(), "mean_reversion");
        assert_eq!(
            registry.list_strategies(),
            vec!["mean_reversion".to_string(), "momentum".to_string()]
        );
    }

    #[test]
    fn test_unknown_name_fails() {
        let result =
            StrategyRegistry::from_names(&["nwe".to_string()], &SignalSettings::default());
        assert!(matches!(result, Err(StrategyError::UnknownStrategy(_))));
        assert!(StrategyRegistry::new().get("momentum").is_err());
    }

    #[test]
    fn test_reregister_replaces_and_unregister() {
        let registry = StrategyRegistry::new();
        let settings = SignalSettings::default();
        registry.register(StrategyKind::from_name("momentum", &settings).unwrap());
        registry.register(StrategyKind::from_name("momentum", &settings).unwrap());
        assert_eq!(registry.count(), 1);

        assert!(registry.unregister("Momentum").is_some());
        assert!(registry.unregister("momentum").is_none());
        assert_eq!(registry.count(), 0);
    }
}
