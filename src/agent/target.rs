use ndarray::{Array2, ArrayView2};

use crate::error::Result;
use crate::network::{NetworkParameters, QNetwork};

/// Delayed copy of the online network used to compute TD targets.
///
/// Parameters only change through [`TargetNetwork::sync_from`]; the wrapped
/// network is never handed a gradient step.
pub struct TargetNetwork {
    network: Box<dyn QNetwork>,
    sync_count: u64,
}

impl TargetNetwork {
    /// Wrap `network` and make it an exact copy of `online`
    pub fn new(network: Box<dyn QNetwork>, online: &dyn QNetwork) -> Result<Self> {
        let mut target = TargetNetwork {
            network,
            sync_count: 0,
        };
        online.clone_parameters_into(target.network.as_mut())?;
        Ok(target)
    }

    /// Hard copy of every online parameter
    pub fn sync_from(&mut self, online: &dyn QNetwork) -> Result<()> {
        online.clone_parameters_into(self.network.as_mut())?;
        self.sync_count += 1;
        Ok(())
    }

    pub fn forward(&self, states: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.network.forward(states)
    }

    pub fn parameters(&self) -> NetworkParameters {
        self.network.parameters()
    }

    /// Restore parameters from a checkpoint without counting a sync
    pub(crate) fn restore(&mut self, parameters: &NetworkParameters, sync_count: u64) -> Result<()> {
        self.network.set_parameters(parameters)?;
        self.sync_count = sync_count;
        Ok(())
    }

    /// Number of syncs performed since construction
    pub fn sync_count(&self) -> u64 {
        self.sync_count
    }
}
