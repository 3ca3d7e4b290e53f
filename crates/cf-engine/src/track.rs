//! Per-track automation set

use std::sync::Arc;

use cf_core::{CfError, CfResult, Endpoint, SamplePos};

use crate::automation::{Automation, AutomationId, AutomationParams};
use crate::config::EngineConfig;

/// Automations owned by one track.
///
/// Deleting an automation only hides it; its slot and storage are held until
/// [`dispose`](Self::dispose) so an undo can bring it back.
#[derive(Debug)]
pub struct TrackAutomations {
    automations: Vec<Arc<Automation>>,
    next_id: u32,
    config: EngineConfig,
}

impl TrackAutomations {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            automations: Vec::with_capacity(config.max_automations_per_track),
            next_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.automations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.automations.is_empty()
    }

    /// Add a new automation
    pub fn add(
        &mut self,
        label: impl Into<String>,
        params: AutomationParams,
    ) -> CfResult<Arc<Automation>> {
        let label = label.into();
        self.check_unbound(&label, None)?;
        self.check_capacity()?;
        let automation = Automation::new(self.allocate_id(), label, params, &self.config)?;
        Ok(self.push(automation))
    }

    /// Add an automation driven by a live endpoint
    pub fn add_for_endpoint(&mut self, endpoint: Arc<dyn Endpoint>) -> CfResult<Arc<Automation>> {
        self.check_unbound(endpoint.name(), Some(&endpoint))?;
        self.check_capacity()?;
        let automation = Automation::for_endpoint(self.allocate_id(), endpoint, &self.config)?;
        Ok(self.push(automation))
    }

    /// Automation bound to the parameter `label`, hidden ones included
    pub fn find_bound(&self, label: &str) -> Option<&Arc<Automation>> {
        self.automations.iter().find(|a| a.label() == label)
    }

    pub fn get(&self, id: AutomationId) -> Option<&Arc<Automation>> {
        self.automations.iter().find(|a| a.id() == id)
    }

    /// Hide an automation. Returns false if unknown or already hidden.
    pub fn remove(&self, id: AutomationId) -> bool {
        match self.get(id) {
            Some(a) if !a.is_removed() => {
                a.set_removed(true);
                log::debug!("Automation {:?} '{}' removed", id, a.label());
                true
            }
            _ => false,
        }
    }

    /// Bring back a hidden automation
    pub fn restore(&self, id: AutomationId) -> bool {
        match self.get(id) {
            Some(a) if a.is_removed() => {
                a.set_removed(false);
                log::debug!("Automation {:?} '{}' restored", id, a.label());
                true
            }
            _ => false,
        }
    }

    /// Drop an automation for good, freeing its slot
    pub fn dispose(&mut self, id: AutomationId) -> Option<Arc<Automation>> {
        let index = self.automations.iter().position(|a| a.id() == id)?;
        let automation = self.automations.remove(index);
        log::debug!("Automation {:?} '{}' disposed", id, automation.label());
        Some(automation)
    }

    /// Move the automation at `from` to `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.automations.len() || to >= self.automations.len() {
            return false;
        }
        let automation = self.automations.remove(from);
        self.automations.insert(to, automation);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Automation>> {
        self.automations.iter()
    }

    /// Automations not hidden by a delete
    pub fn active(&self) -> impl Iterator<Item = &Arc<Automation>> {
        self.automations.iter().filter(|a| !a.is_removed())
    }

    /// Play back every active automation at `position`.
    /// Returns how many endpoints were written.
    pub fn apply_all(&self, position: SamplePos) -> CfResult<usize> {
        let mut applied = 0;
        for automation in self.active() {
            if automation.apply(position)?.is_some() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// One automation per parameter. A hidden automation still owns its
    /// parameter until it is disposed.
    fn check_unbound(&self, label: &str, endpoint: Option<&Arc<dyn Endpoint>>) -> CfResult<()> {
        let taken = self.automations.iter().any(|a| {
            a.label() == label
                || matches!((a.endpoint(), endpoint), (Some(x), Some(y)) if Arc::ptr_eq(x, y))
        });
        if taken {
            log::warn!("Parameter '{}' already has an automation on this track", label);
            return Err(CfError::AlreadyBound(label.to_string()));
        }
        Ok(())
    }

    fn check_capacity(&self) -> CfResult<()> {
        let max = self.config.max_automations_per_track;
        if self.automations.len() >= max {
            log::warn!("Track automation limit reached ({} of {})", self.automations.len(), max);
            return Err(CfError::CapacityExceeded { max });
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> AutomationId {
        let id = AutomationId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, automation: Automation) -> Arc<Automation> {
        let automation = Arc::new(automation);
        self.automations.push(Arc::clone(&automation));
        automation
    }
}

impl Default for TrackAutomations {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
